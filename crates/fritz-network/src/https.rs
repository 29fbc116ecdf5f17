//! HTTPS transport over `reqwest` with rustls.
//!
//! FRITZ!Box gateways serve a self-signed certificate issued for their LAN
//! names, so the default [`TlsPolicy`] accepts any certificate. Deployments
//! that exported the gateway certificate should pin it with
//! [`TlsPolicy::Pinned`].
//!
//! # Timeout Handling
//!
//! Every request carries the configured timeout (default 10 s). A request
//! that does not complete in time fails with [`TransportError::Timeout`];
//! the transport never retries on its own.
//!
//! # Example
//!
//! ```no_run
//! use fritz_network::{HttpsTransport, TlsPolicy, Transport};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpsTransport::new(
//!     "fritz.box",
//!     443,
//!     Duration::from_secs(10),
//!     &TlsPolicy::AcceptInvalid,
//! )?;
//! let response = transport.get("/login_sid.lua?version=2").await?;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

use crate::transport::{HttpResponse, Transport, TransportError, target_path};
use reqwest::{Certificate, Client};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const PEM_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Certificate validation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Accept any certificate (device-local self-signed certificates).
    #[default]
    AcceptInvalid,

    /// Trust only the given PEM certificate.
    Pinned(Vec<u8>),

    /// Validate against the built-in web PKI roots.
    System,
}

/// [`Transport`] that talks HTTPS to a single gateway.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpsTransport {
    /// Build a transport for `https://host:port`.
    ///
    /// # Errors
    /// - `TransportError::InvalidUrl` if host and port do not form a URL
    /// - `TransportError::Tls` if the pinned certificate is not valid PEM or
    ///   the TLS backend cannot be initialised
    pub fn new(
        host: &str,
        port: u16,
        timeout: Duration,
        tls: &TlsPolicy,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(&format!("https://{host}:{port}/"))
            .map_err(|e| TransportError::InvalidUrl(format!("{host}:{port}: {e}")))?;

        let builder = Client::builder().timeout(timeout).connect_timeout(timeout);
        let builder = match tls {
            TlsPolicy::AcceptInvalid => builder.danger_accept_invalid_certs(true),
            TlsPolicy::Pinned(pem) => {
                // rustls parses PEM lazily and silently skips non-PEM input
                if !pem.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
                    return Err(TransportError::Tls(
                        "pinned certificate is not a PEM certificate".to_string(),
                    ));
                }
                let certificate = Certificate::from_pem(pem)
                    .map_err(|e| TransportError::Tls(format!("pinned certificate: {e}")))?;
                builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(certificate)
            }
            TlsPolicy::System => builder,
        };

        let client = builder
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        debug!(base_url = %base_url, ?timeout, "HTTPS transport ready");

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Gateway origin this transport talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(timeout_millis(self.timeout))
        } else if error.is_body() || error.is_decode() {
            TransportError::Body(error.to_string())
        } else {
            TransportError::Connection(error.to_string())
        }
    }
}

/// Saturates instead of truncating for absurdly long timeouts.
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl Transport for HttpsTransport {
    async fn get(&self, target: &str) -> Result<HttpResponse, TransportError> {
        let url = self
            .base_url
            .join(target)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", target_path(target))))?;

        trace!(path = target_path(target), "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(&e))?;

        trace!(path = target_path(target), status, bytes = body.len(), "Response");

        Ok(HttpResponse { status, body })
    }
}
