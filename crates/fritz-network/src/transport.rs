//! Transport abstraction.
//!
//! A transport performs exactly one GET against the gateway and reports the
//! HTTP status and raw body. It knows nothing about sessions: status
//! classification and re-authentication live in the request executor.
//!
//! # Implementations
//!
//! - [`HttpsTransport`](crate::HttpsTransport): `reqwest` over rustls
//! - [`MockGateway`](crate::mock::MockGateway): in-memory gateway simulation
//! - [`ScriptedTransport`](crate::mock::ScriptedTransport): fixed replay
//!
//! # Example
//!
//! ```
//! use fritz_network::{HttpResponse, Transport, TransportError};
//!
//! struct Offline;
//!
//! impl Transport for Offline {
//!     async fn get(&self, _target: &str) -> Result<HttpResponse, TransportError> {
//!         Err(TransportError::Connection("offline".to_string()))
//!     }
//! }
//! ```

use bytes::Bytes;
use fritz_protocol::XmlDocument;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Status code and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 response with `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as XML.
    ///
    /// # Errors
    /// Returns `fritz_core::Error::Xml` if the body is not a safe,
    /// well-formed document.
    pub fn xml(&self) -> fritz_core::Result<XmlDocument> {
        XmlDocument::parse_bytes(&self.body)
    }
}

/// Errors raised below the HTTP status layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No complete response within the configured timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS setup failed (certificate, client configuration)
    #[error("TLS error: {0}")]
    Tls(String),

    /// Response body could not be read
    #[error("Body error: {0}")]
    Body(String),

    /// Host, port or target do not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// One-shot GET against the gateway.
///
/// `target` is an absolute path with query, e.g.
/// `/login_sid.lua?version=2`. Implementations must not log it verbatim, it
/// may carry a session identifier or a login response.
pub trait Transport: Send + Sync + 'static {
    fn get(
        &self,
        target: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn get(
        &self,
        target: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).get(target)
    }
}

/// Path component of a target, safe to log.
pub(crate) fn target_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}
