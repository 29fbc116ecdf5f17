//! Transport that replays a fixed sequence of responses.

use crate::transport::{HttpResponse, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Render a `SessionInfo` document as returned by `login_sid.lua`.
///
/// # Examples
///
/// ```
/// use fritz_network::mock::session_info_xml;
///
/// let xml = session_info_xml("0000000000000000", "1234567z", 0);
/// assert!(xml.contains("<Challenge>1234567z</Challenge>"));
/// ```
pub fn session_info_xml(sid: &str, challenge: &str, block_time: u32) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><SessionInfo><SID>{sid}</SID>\
         <Challenge>{challenge}</Challenge><BlockTime>{block_time}</BlockTime>\
         <Rights></Rights></SessionInfo>"
    )
}

/// Replays queued responses in order and records every target.
///
/// When the script is exhausted the fallback response is returned, or a
/// connection error if there is none.
///
/// # Examples
///
/// ```
/// use fritz_network::mock::ScriptedTransport;
/// use fritz_network::{HttpResponse, Transport};
///
/// # #[tokio::main]
/// # async fn main() {
/// let transport = ScriptedTransport::new([HttpResponse::ok("1\n")])
///     .with_fallback(HttpResponse::new(403, ""));
///
/// assert_eq!(transport.get("/a").await.unwrap().status, 200);
/// assert_eq!(transport.get("/b").await.unwrap().status, 403);
/// assert_eq!(transport.requests(), vec!["/a", "/b"]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Option<HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Script of successful HTTP exchanges.
    pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok))
    }

    /// Script that may include transport failures.
    pub fn from_results(
        results: impl IntoIterator<Item = Result<HttpResponse, TransportError>>,
    ) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Response returned once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, response: HttpResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Every target received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, target: &str) -> Result<HttpResponse, TransportError> {
        tokio::task::yield_now().await;

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| TransportError::Connection("script exhausted".to_string())),
        }
    }
}
