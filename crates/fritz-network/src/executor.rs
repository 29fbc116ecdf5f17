//! Request execution with transparent re-authentication.
//!
//! Every request is sent with the current SID. Status handling:
//!
//! | Status | Action                                                      |
//! |--------|-------------------------------------------------------------|
//! | 200    | decode body as text or XML                                  |
//! | 403    | re-login once, then resend with the new SID                 |
//! | 400    | [`ClientError::UnsupportedOperation`]                       |
//! | other  | [`ClientError::Status`]                                     |
//!
//! A second 403 after the re-login, or a rejected re-login, ends the call
//! with [`ClientError::SessionLost`]. Transport failures are returned as-is.

use crate::auth::{Authenticator, LoginOutcome};
use crate::error::{ClientError, Result};
use crate::keepalive::{KeepAlive, KeepAliveConfig};
use crate::session::SessionState;
use crate::transport::{HttpResponse, Transport};
use fritz_core::constants::MAX_REAUTH_RETRIES;
use fritz_core::{Ain, Credentials};
use fritz_protocol::{GatewayRequest, SwitchCommand, XmlDocument};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// How a 200 body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Xml,
}

/// Decoded body of a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    Text(String),
    Xml(XmlDocument),
}

impl GatewayResponse {
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            GatewayResponse::Text(text) => Some(text),
            GatewayResponse::Xml(_) => None,
        }
    }

    #[must_use]
    pub fn into_xml(self) -> Option<XmlDocument> {
        match self {
            GatewayResponse::Xml(doc) => Some(doc),
            GatewayResponse::Text(_) => None,
        }
    }
}

/// Sends requests with the current session and renews it on 403.
pub struct RequestExecutor<T> {
    transport: Arc<T>,
    session: Arc<SessionState>,
    authenticator: Authenticator<T>,
}

impl<T: Transport> RequestExecutor<T> {
    /// Wire up executor, authenticator and keep-alive around one transport.
    pub(crate) fn new(
        transport: Arc<T>,
        credentials: Credentials,
        keep_alive: KeepAliveConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|executor| {
            let session = Arc::new(SessionState::new());
            let keep_alive = KeepAlive::new(executor.clone(), Arc::clone(&session), keep_alive);
            let authenticator = Authenticator::new(
                Arc::clone(&transport),
                Arc::clone(&session),
                credentials,
                keep_alive,
            );

            Self {
                transport,
                session,
                authenticator,
            }
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator<T> {
        &self.authenticator
    }

    /// Send `request` and decode the body.
    ///
    /// # Errors
    /// - `ClientError::SessionLost` if the session cannot be renewed
    /// - `ClientError::UnsupportedOperation` on HTTP 400
    /// - `ClientError::Status` on any other non-200 status
    /// - `ClientError::Transport` on network failures
    /// - `ClientError::Protocol` if an XML body is malformed
    pub async fn execute(
        &self,
        request: &GatewayRequest,
        format: ResponseFormat,
    ) -> Result<GatewayResponse> {
        self.send(request, format, None).await
    }

    /// Keep-alive variant: a logoff cancels pending re-authentication.
    pub(crate) async fn probe(
        &self,
        request: &GatewayRequest,
        cancel: &CancellationToken,
    ) -> Result<GatewayResponse> {
        self.send(request, ResponseFormat::Text, Some(cancel)).await
    }

    /// Run a home-automation command that answers with a text token.
    ///
    /// The trailing newline the gateway appends is removed.
    ///
    /// # Errors
    /// `ClientError::Protocol` if the command needs an AIN and none is
    /// given; otherwise as [`execute`](Self::execute).
    pub async fn home_auto_text(
        &self,
        command: SwitchCommand,
        ain: Option<&Ain>,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let request = home_auto_request(command, ain, params)?;
        let text = self
            .execute(&request, ResponseFormat::Text)
            .await?
            .into_text()
            .unwrap_or_default();

        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Run a home-automation command that answers with an XML document.
    ///
    /// # Errors
    /// As [`home_auto_text`](Self::home_auto_text); additionally
    /// `ClientError::Protocol` if the body is not valid XML.
    pub async fn home_auto_xml(
        &self,
        command: SwitchCommand,
        ain: Option<&Ain>,
        params: &[(&str, &str)],
    ) -> Result<XmlDocument> {
        let request = home_auto_request(command, ain, params)?;
        self.execute(&request, ResponseFormat::Xml)
            .await?
            .into_xml()
            .ok_or_else(|| fritz_core::Error::Xml("expected an XML response".to_string()).into())
    }

    async fn send(
        &self,
        request: &GatewayRequest,
        format: ResponseFormat,
        cancel: Option<&CancellationToken>,
    ) -> Result<GatewayResponse> {
        let mut reauthenticated = 0;

        loop {
            let epoch = self.authenticator.epoch();
            let sid = self.session.current();

            debug!(request = %request.redacted(), attempt = reauthenticated + 1, "Sending request");
            let response = self.transport.get(&request.target_with_sid(sid)).await?;
            self.session.touch();
            trace!(status = response.status, bytes = response.body.len(), "Gateway answered");

            match response.status {
                200 => return decode(&response, format),
                403 if !request.is_login() => {
                    if reauthenticated >= MAX_REAUTH_RETRIES {
                        warn!(request = %request.redacted(), "Still forbidden after re-login");
                        return Err(ClientError::SessionLost);
                    }
                    reauthenticated += 1;

                    match self.authenticator.relogin(epoch, cancel).await? {
                        LoginOutcome::Authenticated(_) => continue,
                        LoginOutcome::Rejected { block_time } => {
                            warn!(block_time, "Re-login rejected, session lost");
                            return Err(ClientError::SessionLost);
                        }
                    }
                }
                400 => {
                    let operation = request
                        .command()
                        .map_or_else(|| request.path().to_string(), |cmd| cmd.to_string());
                    return Err(ClientError::unsupported(operation));
                }
                status => return Err(ClientError::status(status)),
            }
        }
    }
}

fn home_auto_request(
    command: SwitchCommand,
    ain: Option<&Ain>,
    params: &[(&str, &str)],
) -> fritz_core::Result<GatewayRequest> {
    let mut builder = GatewayRequest::home_auto(command);
    if let Some(ain) = ain {
        builder = builder.ain(ain);
    }
    params
        .iter()
        .fold(builder, |builder, (key, value)| builder.param(*key, *value))
        .build()
}

fn decode(response: &HttpResponse, format: ResponseFormat) -> Result<GatewayResponse> {
    Ok(match format {
        ResponseFormat::Text => GatewayResponse::Text(response.text()),
        ResponseFormat::Xml => GatewayResponse::Xml(response.xml()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritz_core::Error;

    #[test]
    fn test_home_auto_request() {
        let ain = Ain::new("087610000434").unwrap();
        let request =
            home_auto_request(SwitchCommand::SetHkrTsoll, Some(&ain), &[("param", "44")]).unwrap();
        assert_eq!(
            request.target(),
            "/webservices/homeautoswitch.lua?switchcmd=sethkrtsoll&ain=087610000434&param=44"
        );
    }

    #[test]
    fn test_home_auto_request_requires_ain() {
        assert!(matches!(
            home_auto_request(SwitchCommand::GetSwitchState, None, &[]),
            Err(Error::InvalidAin(_))
        ));
    }

    #[test]
    fn test_decode() {
        let text = decode(&HttpResponse::ok("1\n"), ResponseFormat::Text).unwrap();
        assert_eq!(text, GatewayResponse::Text("1\n".to_string()));

        let xml = decode(&HttpResponse::ok("<state>1</state>"), ResponseFormat::Xml).unwrap();
        assert_eq!(xml.into_xml().unwrap().root().text(), "1");

        let bad = decode(&HttpResponse::ok("1\n"), ResponseFormat::Xml);
        assert!(matches!(bad, Err(ClientError::Protocol(Error::Xml(_)))));
    }

    #[test]
    fn test_response_accessors() {
        assert_eq!(
            GatewayResponse::Text("x".to_string()).into_text(),
            Some("x".to_string())
        );
        assert!(GatewayResponse::Text("x".to_string()).into_xml().is_none());
    }
}
