//! Gateway request construction.
//!
//! A [`GatewayRequest`] is a path plus ordered query parameters. The session
//! identifier is never stored in the request: the executor appends the
//! current SID when the request is sent, so a retried request automatically
//! picks up a renewed session. Login requests carry their SID explicitly and
//! are marked so the executor leaves them alone.
//!
//! # Example
//!
//! ```
//! use fritz_core::{Ain, SessionId};
//! use fritz_protocol::{GatewayRequest, SwitchCommand};
//!
//! let ain = Ain::new("087610000434").unwrap();
//! let request = GatewayRequest::home_auto(SwitchCommand::SetHkrTsoll)
//!     .ain(&ain)
//!     .param("param", "44")
//!     .build()
//!     .unwrap();
//!
//! let sid = SessionId::new("affe1234affe1234").unwrap();
//! assert_eq!(
//!     request.target_with_sid(sid),
//!     "/webservices/homeautoswitch.lua?switchcmd=sethkrtsoll&ain=087610000434&param=44&sid=affe1234affe1234"
//! );
//! ```

use crate::commands::SwitchCommand;
use fritz_core::{
    Ain, Error, Result, SessionId,
    constants::{
        HOME_AUTO_PATH, LOGIN_PATH, LOGIN_VERSION, PARAM_AIN, PARAM_LOGOUT, PARAM_RESPONSE,
        PARAM_SID, PARAM_SWITCHCMD, PARAM_USERNAME, PARAM_VERSION,
    },
};
use url::form_urlencoded;

/// Parameters whose values never appear in logs.
const SECRET_PARAMS: [&str; 3] = [PARAM_SID, PARAM_RESPONSE, "password"];

/// One GET request against the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    path: String,
    params: Vec<(String, String)>,
    command: Option<SwitchCommand>,
    manages_sid: bool,
}

impl GatewayRequest {
    /// Start building a request for an arbitrary path.
    pub fn builder(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(path)
    }

    /// Start building a home-automation command.
    pub fn home_auto(command: SwitchCommand) -> RequestBuilder {
        let mut builder = RequestBuilder::new(HOME_AUTO_PATH);
        builder.command = Some(command);
        builder.param(PARAM_SWITCHCMD, command.as_str())
    }

    /// Anonymous request for a fresh challenge.
    #[must_use]
    pub fn login_challenge() -> Self {
        Self::login(vec![])
    }

    /// Submission of a solved challenge.
    #[must_use]
    pub fn login_response(username: &str, response: &str) -> Self {
        Self::login(vec![
            (PARAM_USERNAME, username.to_string()),
            (PARAM_RESPONSE, response.to_string()),
        ])
    }

    /// Validity check of an existing session.
    #[must_use]
    pub fn login_check(sid: SessionId) -> Self {
        Self::login(vec![(PARAM_SID, sid.to_string())])
    }

    /// Explicit logoff of `sid`.
    #[must_use]
    pub fn logout(sid: SessionId) -> Self {
        Self::login(vec![
            (PARAM_LOGOUT, "1".to_string()),
            (PARAM_SID, sid.to_string()),
        ])
    }

    fn login(extra: Vec<(&str, String)>) -> Self {
        let mut params = vec![(PARAM_VERSION.to_string(), LOGIN_VERSION.to_string())];
        params.extend(extra.into_iter().map(|(k, v)| (k.to_string(), v)));

        GatewayRequest {
            path: LOGIN_PATH.to_string(),
            params,
            command: None,
            manages_sid: true,
        }
    }

    /// Request path (always starts with `/`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in wire order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Home-automation command, if this is one.
    #[must_use]
    pub fn command(&self) -> Option<SwitchCommand> {
        self.command
    }

    /// Returns `true` for login endpoint requests, which set `sid` themselves.
    #[must_use]
    pub fn is_login(&self) -> bool {
        self.manages_sid
    }

    /// `path?query` without a session identifier.
    #[must_use]
    pub fn target(&self) -> String {
        Self::render(&self.path, self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// `path?query` with `sid` appended, unless the request manages its own.
    #[must_use]
    pub fn target_with_sid(&self, sid: SessionId) -> String {
        if self.manages_sid {
            return self.target();
        }

        Self::render(
            &self.path,
            self.params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .chain(std::iter::once((PARAM_SID, sid.as_str()))),
        )
    }

    /// Log-safe rendering with secret values masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        Self::render(
            &self.path,
            self.params.iter().map(|(k, v)| {
                if SECRET_PARAMS.contains(&k.as_str()) {
                    (k.as_str(), "***")
                } else {
                    (k.as_str(), v.as_str())
                }
            }),
        )
    }

    fn render<'a>(path: &str, params: impl Iterator<Item = (&'a str, &'a str)>) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}

/// Fluent builder for [`GatewayRequest`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    path: String,
    params: Vec<(String, String)>,
    command: Option<SwitchCommand>,
}

impl RequestBuilder {
    /// Create a builder for `path`; a missing leading `/` is added.
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        RequestBuilder {
            path,
            params: Vec::new(),
            command: None,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Address a device.
    #[must_use]
    pub fn ain(self, ain: &Ain) -> Self {
        self.param(PARAM_AIN, ain.as_str())
    }

    /// Build the request.
    ///
    /// # Errors
    /// - `Error::InvalidFormat` if a parameter named `sid` was added by hand;
    ///   the executor owns that parameter
    /// - `Error::InvalidAin` if the command addresses a device but no AIN
    ///   was given
    pub fn build(self) -> Result<GatewayRequest> {
        if self.params.iter().any(|(k, _)| k == PARAM_SID) {
            return Err(Error::InvalidFormat(
                "the sid parameter is appended automatically".to_string(),
            ));
        }

        if let Some(command) = self.command
            && command.requires_ain()
            && !self.params.iter().any(|(k, _)| k == PARAM_AIN)
        {
            return Err(Error::InvalidAin(format!("{command} requires an AIN")));
        }

        Ok(GatewayRequest {
            path: self.path,
            params: self.params,
            command: self.command,
            manages_sid: false,
        })
    }
}
