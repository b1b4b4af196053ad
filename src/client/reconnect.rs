// =============================================================================
// Reconnect Policy — bounded exponential backoff for subscriber clients
// =============================================================================
//
// Delay for failure n (1-based) is `min(base × 2^(n-1), max)`. After
// `max_attempts` consecutive failures the client gives up. A successful
// connect resets the counter.
//
// The pending retry is a spawned sleep task so shutdown can abort it instead
// of waiting out the delay.
// =============================================================================

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based). Attempt 0 is treated as 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Client-side connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Drives `Disconnected → Connecting → Connected` and counts failures.
#[derive(Debug)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: ConnectionState,
    failures: u32,
    pending: Option<JoinHandle<()>>,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            failures: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub fn connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.failures = 0;
    }

    /// Record a failed attempt or a dropped connection. Returns the delay
    /// before the next attempt, or `None` once the policy is exhausted.
    pub fn disconnected(&mut self) -> Option<Duration> {
        self.state = ConnectionState::Disconnected;
        self.failures = self.failures.saturating_add(1);
        if self.failures > self.policy.max_attempts {
            warn!(failures = self.failures, "reconnect attempts exhausted");
            return None;
        }
        let delay = self.policy.delay_for(self.failures);
        debug!(attempt = self.failures, delay_ms = delay.as_millis() as u64, "retry scheduled");
        Some(delay)
    }

    /// Spawn the retry timer. The receiver resolves `Ok(())` when the delay
    /// elapses and `Err` if the retry was cancelled first.
    pub fn schedule(&mut self, delay: Duration) -> oneshot::Receiver<()> {
        self.cancel();
        let (tx, rx) = oneshot::channel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(());
        }));
        rx
    }

    /// Abort a pending retry, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Reconnector {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_then_caps() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(5), Duration::from_secs(16));
        assert_eq!(p.delay_for(6), Duration::from_secs(30));
        assert_eq!(p.delay_for(40), Duration::from_secs(30));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        for _ in 0..5 {
            r.begin_connect();
            assert!(r.disconnected().is_some());
        }
        r.begin_connect();
        assert_eq!(r.disconnected(), None);
        assert_eq!(r.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn successful_connect_resets_failures() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        r.disconnected();
        r.disconnected();
        r.begin_connect();
        r.connected();
        assert_eq!(r.failures(), 0);
        assert_eq!(r.state(), ConnectionState::Connected);
        assert_eq!(r.disconnected(), Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_retry_fires_after_delay() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        let started = tokio::time::Instant::now();
        r.schedule(Duration::from_secs(4)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_retry_never_fires() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        let rx = r.schedule(Duration::from_secs(4));
        r.cancel();
        assert!(rx.await.is_err());
    }
}
