//! Shared session state.
//!
//! Holds the current session identifier and the time of the last exchange
//! with the gateway. Both live in `tokio::sync::watch` cells: readers always
//! see a whole value, writers replace it atomically, and observers can
//! subscribe to changes.
//!
//! Activity is measured with `tokio::time::Instant` so paused-clock tests
//! drive the keep-alive loop deterministically. The wall-clock establishment
//! time is kept separately for diagnostics.

use chrono::{DateTime, Utc};
use fritz_core::SessionId;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

/// Snapshot of the session cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub sid: SessionId,
    /// When the current SID was first observed as valid.
    pub established_at: Option<DateTime<Utc>>,
}

/// Current SID plus last-activity clock, shared between the executor, the
/// authenticator and the keep-alive loop.
#[derive(Debug)]
pub struct SessionState {
    session: watch::Sender<SessionSnapshot>,
    activity: watch::Sender<Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session: watch::Sender::new(SessionSnapshot::default()),
            activity: watch::Sender::new(Instant::now()),
        }
    }

    /// Current session identifier (all-zero when logged out).
    #[must_use]
    pub fn current(&self) -> SessionId {
        self.session.borrow().sid
    }

    /// Full snapshot including the establishment time.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.session.borrow()
    }

    /// Returns `true` if a session is established.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.current().is_valid()
    }

    /// Store a new session identifier.
    ///
    /// Storing a valid SID counts as activity.
    pub fn set(&self, sid: SessionId) {
        self.session.send_if_modified(|snapshot| {
            if snapshot.sid == sid {
                return false;
            }
            snapshot.sid = sid;
            snapshot.established_at = sid.is_valid().then(Utc::now);
            true
        });

        if sid.is_valid() {
            self.touch();
        }
    }

    /// Forget the session.
    pub fn reset(&self) {
        self.set(SessionId::INVALID);
    }

    /// Observe session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Record an exchange with the gateway.
    pub fn touch(&self) {
        let now = Instant::now();
        trace!("Session activity");
        self.activity.send_replace(now);
    }

    /// Time of the last exchange with the gateway.
    #[must_use]
    pub fn last_activity(&self) -> Instant {
        *self.activity.borrow()
    }

    /// Time since the last exchange with the gateway.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity().elapsed()
    }

    /// Observe activity changes.
    #[must_use]
    pub fn subscribe_activity(&self) -> watch::Receiver<Instant> {
        self.activity.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(value: &str) -> SessionId {
        SessionId::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let state = SessionState::new();
        assert_eq!(state.current(), SessionId::INVALID);
        assert!(!state.is_valid());
        assert_eq!(state.snapshot().established_at, None);
    }

    #[tokio::test]
    async fn test_set_and_reset() {
        let state = SessionState::new();
        state.set(sid("affe1234affe1234"));
        assert!(state.is_valid());
        assert_eq!(state.current().as_str(), "affe1234affe1234");
        assert!(state.snapshot().established_at.is_some());

        state.reset();
        assert!(!state.is_valid());
        assert_eq!(state.snapshot().established_at, None);
    }

    #[tokio::test]
    async fn test_same_sid_keeps_establishment_time() {
        let state = SessionState::new();
        state.set(sid("affe1234affe1234"));
        let established = state.snapshot().established_at;

        state.set(sid("affe1234affe1234"));
        assert_eq!(state.snapshot().established_at, established);
    }

    #[tokio::test]
    async fn test_subscribe_sees_changes() {
        let state = SessionState::new();
        let mut rx = state.subscribe();

        state.set(sid("0123456789abcdef"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().sid.as_str(), "0123456789abcdef");

        // Re-setting the same value is not a change
        state.set(sid("0123456789abcdef"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_clock() {
        let state = SessionState::new();
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(state.idle_for(), Duration::from_secs(100));

        state.touch();
        assert_eq!(state.idle_for(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(5)).await;
        state.set(sid("affe1234affe1234"));
        assert_eq!(state.last_activity(), Instant::now());

        // Resetting is not activity
        tokio::time::advance(Duration::from_secs(5)).await;
        state.reset();
        assert_eq!(state.idle_for(), Duration::from_secs(5));
    }
}
