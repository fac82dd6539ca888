//! Per-provider cooldown after repeated enrichment timeouts.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CircuitState {
    Closed,
    /// Calls are skipped until the instant passes.
    Open { until: Instant },
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_timeouts: u32,
}

/// Opens after `threshold` consecutive timeouts and closes again once the
/// cooldown has elapsed. Any completed call resets the count.
#[derive(Debug)]
pub(super) struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub(super) fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_timeouts: 0,
            }),
        }
    }

    /// Whether a call may go out at `now`. An expired cooldown closes the breaker.
    pub(super) fn allow(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open { until } if now >= until => {
                inner.state = CircuitState::Closed;
                inner.consecutive_timeouts = 0;
                true
            }
            CircuitState::Open { .. } => false,
        }
    }

    pub(super) fn record_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_timeouts = 0;
    }

    /// Record a timeout. Returns `true` when this call opened the breaker.
    pub(super) fn record_timeout(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        inner.consecutive_timeouts += 1;
        if inner.consecutive_timeouts >= self.threshold
            && inner.state == CircuitState::Closed
        {
            inner.state = CircuitState::Open {
                until: now + self.cooldown,
            };
            return true;
        }
        false
    }

    #[cfg(test)]
    pub(super) fn state(&self) -> CircuitState {
        self.lock().state
    }

    // State stays consistent even if a holder panicked.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
