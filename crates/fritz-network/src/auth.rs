//! Login handshake and session renewal.
//!
//! # Handshake
//!
//! ```text
//! 1. GET /login_sid.lua?version=2                        -> SID + Challenge
//! 2. SID already valid (LAN without password)?           -> go to 4
//! 3. GET /login_sid.lua?version=2&username=u&response=r  -> SID
//! 4. GET /login_sid.lua?version=2&sid=s                  -> confirm SID
//! ```
//!
//! A zero SID after step 3 or 4 is a rejection; the gateway reports how long
//! it refuses further attempts in `BlockTime`.
//!
//! # Single Flight
//!
//! All logins, re-logins and logoffs run under one async mutex. Every
//! completed attempt bumps a login epoch. A caller that observed a 403 passes
//! the epoch it saw before sending; if another caller completed a login in
//! the meantime, its outcome is reused instead of starting a second
//! handshake.

use crate::error::{ClientError, Result};
use crate::keepalive::KeepAlive;
use crate::session::SessionState;
use crate::transport::Transport;
use fritz_core::{Credentials, SessionId};
use fritz_protocol::{GatewayRequest, SessionInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a completed login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(SessionId),
    /// The gateway refused the credentials for `block_time` seconds.
    Rejected { block_time: u32 },
}

impl LoginOutcome {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }
}

/// Performs the login handshake and owns the login gate.
pub struct Authenticator<T> {
    transport: Arc<T>,
    session: Arc<SessionState>,
    credentials: Credentials,
    gate: Mutex<Option<LoginOutcome>>,
    epoch: AtomicU64,
    keep_alive: KeepAlive<T>,
}

impl<T: Transport> Authenticator<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        session: Arc<SessionState>,
        credentials: Credentials,
        keep_alive: KeepAlive<T>,
    ) -> Self {
        Self {
            transport,
            session,
            credentials,
            gate: Mutex::new(None),
            epoch: AtomicU64::new(0),
            keep_alive,
        }
    }

    /// Number of completed login attempts and logoffs.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn keep_alive(&self) -> &KeepAlive<T> {
        &self.keep_alive
    }

    /// Run the full handshake.
    ///
    /// Starts the keep-alive loop on success. A rejection leaves the session
    /// state at the all-zero SID and stops the keep-alive loop.
    ///
    /// # Errors
    /// - `ClientError::Transport` if the gateway is unreachable
    /// - `ClientError::Protocol` if a response is malformed or the challenge
    ///   cannot be solved
    /// - `ClientError::Status` for unexpected HTTP statuses
    pub async fn login(&self) -> Result<LoginOutcome> {
        let mut last = self.gate.lock().await;
        self.attempt(&mut last).await
    }

    /// Re-authenticate after the gateway answered 403.
    ///
    /// `observed_epoch` is [`epoch`](Self::epoch) as read before the rejected
    /// request was sent. If a login completed since then, its outcome is
    /// returned without contacting the gateway.
    ///
    /// # Errors
    /// `ClientError::Cancelled` if `cancel` fired while waiting for the
    /// gate; otherwise as [`login`](Self::login).
    pub async fn relogin(
        &self,
        observed_epoch: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<LoginOutcome> {
        let mut last = self.gate.lock().await;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(ClientError::Cancelled);
        }

        if self.epoch() != observed_epoch
            && let Some(outcome) = *last
        {
            debug!(
                authenticated = outcome.is_authenticated(),
                "Reusing outcome of concurrent login"
            );
            return Ok(outcome);
        }

        info!("Session rejected by gateway, logging in again");
        self.attempt(&mut last).await
    }

    /// End the session on the gateway.
    ///
    /// Returns `true` if the session is gone (including when there was
    /// none), `false` if the gateway kept it alive. The keep-alive loop is
    /// stopped on success and resumed otherwise.
    ///
    /// # Errors
    /// `ClientError::Transport`, `ClientError::Protocol` or
    /// `ClientError::Status` if the logout request fails; the session is
    /// left untouched.
    pub async fn logoff(&self) -> Result<bool> {
        let mut last = self.gate.lock().await;
        self.keep_alive.stop();

        let sid = self.session.current();
        if !sid.is_valid() {
            debug!("No session to log off");
            return Ok(true);
        }

        let info = match self.fetch(GatewayRequest::logout(sid)).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Logoff failed");
                self.keep_alive.start();
                return Err(e);
            }
        };

        if info.as_ref().is_some_and(SessionInfo::is_authenticated) {
            warn!("Gateway kept the session after logoff");
            self.keep_alive.start();
            return Ok(false);
        }

        self.session.reset();
        *last = None;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        info!("Logged off");
        Ok(true)
    }

    async fn attempt(&self, last: &mut Option<LoginOutcome>) -> Result<LoginOutcome> {
        let outcome = self.handshake().await;
        if let Ok(LoginOutcome::Rejected { .. }) = outcome {
            self.keep_alive.stop();
        }
        *last = outcome.as_ref().ok().copied();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn handshake(&self) -> Result<LoginOutcome> {
        let Some(info) = self.fetch(GatewayRequest::login_challenge()).await? else {
            return Ok(self.reject(0));
        };
        self.session.set(info.sid);

        let sid = if info.is_authenticated() {
            debug!("Gateway granted a session without credentials");
            info.sid
        } else {
            let challenge = info.parse_challenge()?;
            let response = challenge.solve(self.credentials.password.expose())?;
            let username = self.username_for(&info);
            debug!(
                user = username,
                iterated = challenge.is_iterated(),
                "Answering login challenge"
            );

            let Some(answer) = self
                .fetch(GatewayRequest::login_response(username, &response))
                .await?
            else {
                return Ok(self.reject(0));
            };
            if !answer.is_authenticated() {
                return Ok(self.reject(answer.block_time));
            }
            answer.sid
        };

        let Some(confirmed) = self.fetch(GatewayRequest::login_check(sid)).await? else {
            return Ok(self.reject(0));
        };
        if !confirmed.is_authenticated() {
            return Ok(self.reject(confirmed.block_time));
        }

        self.session.set(confirmed.sid);
        self.keep_alive.start();
        info!(user = self.credentials.username.as_str(), "Logged in");

        Ok(LoginOutcome::Authenticated(confirmed.sid))
    }

    /// GET a login endpoint request. `None` means the gateway answered 403.
    async fn fetch(&self, request: GatewayRequest) -> Result<Option<SessionInfo>> {
        debug!(request = %request.redacted(), "Login endpoint request");

        let response = self.transport.get(&request.target()).await?;
        self.session.touch();

        match response.status {
            200 => Ok(Some(SessionInfo::parse(&response.body)?)),
            403 => Ok(None),
            status => Err(ClientError::status(status)),
        }
    }

    fn reject(&self, block_time: u32) -> LoginOutcome {
        self.session.reset();
        warn!(block_time, "Login rejected by gateway");
        LoginOutcome::Rejected { block_time }
    }

    /// Configured user, or the gateway's last user when none is configured.
    fn username_for<'a>(&'a self, info: &'a SessionInfo) -> &'a str {
        if self.credentials.username.is_empty() {
            info.last_user().unwrap_or_default()
        } else {
            self.credentials.username.as_str()
        }
    }
}
