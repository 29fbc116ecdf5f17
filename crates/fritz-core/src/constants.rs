//! Protocol-level constants for the FRITZ!Box HTTP/XML remote-control protocol.
//!
//! This module collects the endpoint paths, session parameters and default
//! settings shared by the protocol and network crates. Keeping them in one
//! place guarantees that the login handshake, the request executor and the
//! keep-alive loop agree on the same values.
//!
//! # Wire Format
//!
//! Every exchange with the gateway is a single HTTPS GET:
//!
//! ```text
//! https://<host>:<port>/login_sid.lua?version=2[&username=<u>][&response=<r>][&sid=<s>][&logout=1]
//! https://<host>:<port>/webservices/homeautoswitch.lua?ain=<ain>&switchcmd=<cmd>&sid=<sid>
//! ```
//!
//! # Usage
//!
//! ```
//! use fritz_core::constants::*;
//!
//! assert_eq!(LOGIN_PATH, "/login_sid.lua");
//! assert_eq!(SESSION_ID_LENGTH, 16);
//! assert_eq!(SESSION_TIMEOUT.as_secs(), 585);
//! ```

use std::time::Duration;

// ============================================================================
// Endpoints
// ============================================================================

/// Login, session check and logout endpoint.
pub const LOGIN_PATH: &str = "/login_sid.lua";

/// Home-automation ("AHA") command endpoint.
pub const HOME_AUTO_PATH: &str = "/webservices/homeautoswitch.lua";

/// Value of the `version` query parameter sent to the login endpoint.
///
/// Version 2 makes PBKDF2-capable firmware (FRITZ!OS 7.24+) answer with an
/// iterated challenge. Older firmware ignores it and keeps sending MD5
/// challenges.
pub const LOGIN_VERSION: &str = "2";

// ============================================================================
// Query Parameters
// ============================================================================

pub const PARAM_VERSION: &str = "version";
pub const PARAM_USERNAME: &str = "username";
pub const PARAM_RESPONSE: &str = "response";
pub const PARAM_SID: &str = "sid";
pub const PARAM_LOGOUT: &str = "logout";
pub const PARAM_AIN: &str = "ain";
pub const PARAM_SWITCHCMD: &str = "switchcmd";

// ============================================================================
// Session Identifiers
// ============================================================================

/// Length of a session identifier in hex characters.
pub const SESSION_ID_LENGTH: usize = 16;

/// The distinguished "no session" identifier.
///
/// The gateway returns this value whenever a login fails or after a logout.
pub const INVALID_SESSION_ID: &str = "0000000000000000";

// ============================================================================
// Session Lifetime
// ============================================================================

/// Inactivity period after which the gateway drops a session.
pub const GATEWAY_SESSION_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// Margin subtracted from the gateway lifetime before renewing.
pub const SESSION_SAFETY_MARGIN: Duration = Duration::from_secs(15);

/// Idle time after which the keep-alive loop probes the gateway.
///
/// # Value: 585 seconds (10 minutes minus 15 seconds)
pub const SESSION_TIMEOUT: Duration =
    Duration::from_secs(GATEWAY_SESSION_LIFETIME.as_secs() - SESSION_SAFETY_MARGIN.as_secs());

/// Number of times a request is re-issued after an automatic re-login.
///
/// A gateway that keeps answering 403 after a fresh login would otherwise
/// cause an endless login/request cycle.
pub const MAX_REAUTH_RETRIES: usize = 1;

// ============================================================================
// Challenges
// ============================================================================

/// Prefix that marks a PBKDF2 (iterated) challenge.
pub const ITERATED_CHALLENGE_PREFIX: &str = "2$";

/// Number of `$`-separated fields in an iterated challenge.
///
/// ```text
/// 2$<iter1>$<salt1>$<iter2>$<salt2>
/// ```
pub const ITERATED_CHALLENGE_FIELDS: usize = 5;

/// Separator used inside iterated challenges and responses.
pub const CHALLENGE_SEPARATOR: char = '$';

/// Replacement for characters outside Latin-1 in the legacy MD5 response.
pub const LEGACY_REPLACEMENT_CHAR: char = '.';

// ============================================================================
// Credentials
// ============================================================================

/// Maximum length of a FRITZ!OS user name (characters).
pub const MAX_USERNAME_LENGTH: usize = 32;

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default gateway host name on a FRITZ!Box LAN.
pub const DEFAULT_HOST: &str = "fritz.box";

/// Default HTTPS port.
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Default timeout for a single HTTP exchange (milliseconds).
///
/// # Examples
///
/// ```
/// use fritz_core::constants::DEFAULT_REQUEST_TIMEOUT_MS;
/// use std::time::Duration;
///
/// let timeout = Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS);
/// assert_eq!(timeout.as_secs(), 10);
/// ```
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Read-only command used by the keep-alive loop to reset gateway idle time.
pub const DEFAULT_PROBE_COMMAND: &str = "getswitchlist";
