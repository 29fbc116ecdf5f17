//! Background session keep-alive.
//!
//! The gateway drops a session after ten idle minutes. While a session is
//! established, a single background task sleeps until the session has been
//! idle for [`SESSION_TIMEOUT`](fritz_core::constants::SESSION_TIMEOUT) and
//! then issues a cheap read-only command through the request executor, so
//! the normal 403 handling renews an expired session as well.
//!
//! # Lifecycle
//!
//! ```text
//! login ok ──> start() ──> [sleep until last_activity + timeout]
//!                               │ activity moved?  ──> sleep again
//!                               │ idle             ──> probe
//!                               └─ cancelled       ──> exit
//! logoff ───> stop() (in-flight probe completes, no new probes)
//! rejected login ──> stop()
//! ```
//!
//! The task holds only a `Weak` reference to the executor. Dropping the
//! client ends the loop at its next wake-up.

use crate::error::ClientError;
use crate::executor::RequestExecutor;
use crate::session::SessionState;
use crate::transport::Transport;
use fritz_core::constants::SESSION_TIMEOUT;
use fritz_protocol::{GatewayRequest, SwitchCommand};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Keep-alive settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveConfig {
    /// Run the loop at all.
    pub enabled: bool,

    /// Idle time before a probe is sent.
    pub interval: Duration,

    /// Pause after a probe that failed or was skipped.
    pub retry_delay: Duration,

    /// Read-only command used as probe. A command that changes gateway
    /// state is refused and the loop does not start.
    pub probe: SwitchCommand,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: SESSION_TIMEOUT,
            retry_delay: Duration::from_secs(30),
            probe: SwitchCommand::GetSwitchList,
        }
    }
}

struct LoopHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Handle to the keep-alive task of one client.
pub struct KeepAlive<T> {
    executor: Weak<RequestExecutor<T>>,
    session: Arc<SessionState>,
    config: KeepAliveConfig,
    task: Mutex<Option<LoopHandle>>,
}

impl<T: Transport> KeepAlive<T> {
    pub(crate) fn new(
        executor: Weak<RequestExecutor<T>>,
        session: Arc<SessionState>,
        config: KeepAliveConfig,
    ) -> Self {
        Self {
            executor,
            session,
            config,
            task: Mutex::new(None),
        }
    }

    /// Spawn the loop unless it is already running, disabled, or configured
    /// with a command that is not read-only.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        if !self.config.enabled {
            return;
        }

        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(LoopHandle::is_active) {
            return;
        }

        if !self.config.probe.is_read_only() {
            warn!(command = %self.config.probe, "Keep-alive command must be read-only");
            return;
        }

        let probe = match GatewayRequest::home_auto(self.config.probe).build() {
            Ok(probe) => probe,
            Err(e) => {
                warn!(command = %self.config.probe, error = %e, "Unusable keep-alive probe");
                return;
            }
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.executor.clone(),
            Arc::clone(&self.session),
            self.config.clone(),
            probe,
            cancel.clone(),
        ));

        debug!(interval = ?self.config.interval, "Keep-alive started");
        *slot = Some(LoopHandle { cancel, handle });
    }

    /// Stop the loop. A probe already in flight is allowed to finish, but no
    /// new probe is issued.
    pub fn stop(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.cancel.cancel();
            debug!("Keep-alive stopped");
        }
    }

    /// Returns `true` while a loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(LoopHandle::is_active)
    }

    #[must_use]
    pub fn config(&self) -> &KeepAliveConfig {
        &self.config
    }
}

impl<T> Drop for KeepAlive<T> {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.cancel.cancel();
        }
    }
}

impl LoopHandle {
    fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

async fn run<T: Transport>(
    executor: Weak<RequestExecutor<T>>,
    session: Arc<SessionState>,
    config: KeepAliveConfig,
    probe: GatewayRequest,
    cancel: CancellationToken,
) {
    let mut not_before = Instant::now();

    loop {
        let deadline = (session.last_activity() + config.interval).max(not_before);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep_until(deadline) => {}
        }

        let now = Instant::now();
        if session.last_activity() + config.interval > now {
            trace!("Activity while sleeping, keep-alive postponed");
            continue;
        }

        if !session.is_valid() {
            trace!("No session to keep alive");
            not_before = now + config.retry_delay;
            continue;
        }

        let Some(executor) = executor.upgrade() else {
            break;
        };

        debug!(command = %config.probe, idle = ?session.idle_for(), "Keep-alive probe");
        match executor.probe(&probe, &cancel).await {
            Ok(_) => trace!("Keep-alive probe answered"),
            Err(ClientError::Cancelled) => break,
            Err(e) => {
                warn!(error = %e, "Keep-alive probe failed");
                not_before = Instant::now() + config.retry_delay;
            }
        }
    }

    debug!("Keep-alive loop exited");
}
