//! Gateway client façade.
//!
//! [`FritzClient`] bundles the transport, session state, authenticator,
//! request executor and keep-alive loop of one gateway. Callers log in once
//! and then issue requests; expired sessions are renewed transparently.
//!
//! # Example
//!
//! ```no_run
//! use fritz_core::Credentials;
//! use fritz_network::{ClientConfig, FritzClient};
//! use fritz_protocol::SwitchCommand;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     credentials: Credentials::new("fritz3141", "secret")?,
//!     ..ClientConfig::default()
//! };
//!
//! let client = FritzClient::connect(config)?;
//! client.login().await?;
//!
//! let switches = client
//!     .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
//!     .await?;
//! println!("switches: {switches}");
//!
//! client.logoff().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! [`ClientConfig::from_env`] reads:
//!
//! | Variable          | Default      |
//! |-------------------|--------------|
//! | `FRITZ_HOST`      | `fritz.box`  |
//! | `FRITZ_PORT`      | `443`        |
//! | `FRITZ_USERNAME`  | empty        |
//! | `FRITZ_PASSWORD`  | required     |
//! | `FRITZ_TIMEOUT_MS`| `10000`      |
//! | `FRITZ_CA_CERT`   | unset (accept the self-signed certificate) |

use crate::auth::LoginOutcome;
use crate::error::{ClientError, Result};
use crate::executor::{GatewayResponse, RequestExecutor, ResponseFormat};
use crate::https::{HttpsTransport, TlsPolicy};
use crate::keepalive::KeepAliveConfig;
use crate::session::SessionState;
use crate::transport::Transport;
use fritz_core::constants::{DEFAULT_HOST, DEFAULT_HTTPS_PORT, DEFAULT_REQUEST_TIMEOUT_MS};
use fritz_core::{Ain, Credentials, Error, SessionId};
use fritz_protocol::{GatewayRequest, SwitchCommand, XmlDocument};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway host name or address
    pub host: String,

    /// HTTPS port
    pub port: u16,

    pub credentials: Credentials,

    /// Timeout for a single HTTP exchange
    pub timeout: Duration,

    pub tls: TlsPolicy,

    pub keep_alive: KeepAliveConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_HTTPS_PORT,
            credentials: Credentials::default(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            tls: TlsPolicy::default(),
            keep_alive: KeepAliveConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load the configuration from `FRITZ_*` environment variables.
    ///
    /// # Errors
    /// - `Error::MissingConfig` if `FRITZ_PASSWORD` is not set
    /// - `Error::Config` if a value cannot be parsed or the CA certificate
    ///   cannot be read
    /// - `Error::InvalidUsername` if `FRITZ_USERNAME` is invalid
    pub fn from_env() -> fritz_core::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> fritz_core::Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("FRITZ_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("FRITZ_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::Config(format!("FRITZ_PORT {port:?} is not a port")))?;
        }

        if let Some(timeout) = lookup("FRITZ_TIMEOUT_MS") {
            let millis: u64 = timeout.parse().map_err(|_| {
                Error::Config(format!("FRITZ_TIMEOUT_MS {timeout:?} is not a number"))
            })?;
            if millis == 0 {
                return Err(Error::Config("FRITZ_TIMEOUT_MS must be positive".to_string()));
            }
            config.timeout = Duration::from_millis(millis);
        }

        if let Some(path) = lookup("FRITZ_CA_CERT") {
            let pem = std::fs::read(&path)
                .map_err(|e| Error::Config(format!("FRITZ_CA_CERT {path:?}: {e}")))?;
            config.tls = TlsPolicy::Pinned(pem);
        }

        let password =
            lookup("FRITZ_PASSWORD").ok_or_else(|| Error::MissingConfig("FRITZ_PASSWORD".to_string()))?;
        let username = lookup("FRITZ_USERNAME").unwrap_or_default();
        config.credentials = Credentials::new(&username, password)?;

        Ok(config)
    }
}

/// Session-managing client for one gateway.
pub struct FritzClient<T: Transport = HttpsTransport> {
    executor: Arc<RequestExecutor<T>>,
}

impl FritzClient<HttpsTransport> {
    /// Create a client that talks HTTPS to `config.host`.
    ///
    /// No request is sent until [`login`](Self::login) or the first request.
    ///
    /// # Errors
    /// `ClientError::Transport` if the HTTPS client cannot be built.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = HttpsTransport::new(&config.host, config.port, config.timeout, &config.tls)?;
        info!(host = %config.host, port = config.port, "Gateway client created");
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> FritzClient<T> {
    /// Create a client over any transport. Host, port, timeout and TLS
    /// settings of `config` are ignored.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            executor: RequestExecutor::new(Arc::new(transport), config.credentials, config.keep_alive),
        }
    }

    /// Log in and start the keep-alive loop.
    ///
    /// # Errors
    /// - `ClientError::Credentials` if the gateway rejects the credentials
    /// - `ClientError::Transport`, `ClientError::Protocol` or
    ///   `ClientError::Status` if the handshake fails
    pub async fn login(&self) -> Result<SessionId> {
        match self.executor.authenticator().login().await? {
            LoginOutcome::Authenticated(sid) => Ok(sid),
            LoginOutcome::Rejected { block_time } => Err(ClientError::credentials(block_time)),
        }
    }

    /// Log off and stop the keep-alive loop.
    ///
    /// Returns `false` if the gateway kept the session.
    ///
    /// # Errors
    /// `ClientError::Transport`, `ClientError::Protocol` or
    /// `ClientError::Status` if the logout request fails.
    pub async fn logoff(&self) -> Result<bool> {
        self.executor.authenticator().logoff().await
    }

    /// Send an arbitrary request.
    ///
    /// # Errors
    /// See [`RequestExecutor::execute`].
    pub async fn execute(
        &self,
        request: &GatewayRequest,
        format: ResponseFormat,
    ) -> Result<GatewayResponse> {
        self.executor.execute(request, format).await
    }

    /// Home-automation command with a text answer.
    ///
    /// # Errors
    /// See [`RequestExecutor::home_auto_text`].
    pub async fn home_auto_text(
        &self,
        command: SwitchCommand,
        ain: Option<&Ain>,
        params: &[(&str, &str)],
    ) -> Result<String> {
        self.executor.home_auto_text(command, ain, params).await
    }

    /// Home-automation command with an XML answer.
    ///
    /// # Errors
    /// See [`RequestExecutor::home_auto_xml`].
    pub async fn home_auto_xml(
        &self,
        command: SwitchCommand,
        ain: Option<&Ain>,
        params: &[(&str, &str)],
    ) -> Result<XmlDocument> {
        self.executor.home_auto_xml(command, ain, params).await
    }

    /// Current session identifier (all-zero when logged out).
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.executor.session().current()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.executor.session().is_valid()
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        self.executor.session()
    }

    #[must_use]
    pub fn is_keep_alive_running(&self) -> bool {
        self.executor.authenticator().keep_alive().is_running()
    }
}
