//! Circuit breaker for the inference endpoint.
//!
//! Tracks consecutive failures against the endpoint. When failures reach a
//! configurable threshold the circuit *opens* and calls fail fast without
//! touching the network. After a cool-down the circuit is *half-open*: one
//! probe is allowed through; a success closes the circuit, a failure
//! re-opens it and restarts the cool-down.
//!
//! The breaker is process-wide and shared across every pipeline task, so
//! its state lives behind a `std::sync::Mutex` (held only for bookkeeping,
//! never across an await point).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use assistant_core::InferenceError;
use tracing::warn;

/// Observable state of the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Healthy; requests allowed.
    Closed,
    /// Tripped; requests blocked until the cool-down expires.
    Open,
    /// Cool-down expired; one probe request allowed.
    HalfOpen,
}

#[derive(Debug, Default)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Consecutive-failure circuit breaker guarding one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and probes again after `cooldown`.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner::default()),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Current state of the circuit.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.state_of(&inner)
    }

    fn state_of(&self, inner: &BreakerInner) -> BreakerState {
        if inner.consecutive_failures < self.failure_threshold {
            return BreakerState::Closed;
        }
        match inner.opened_at {
            Some(at) if at.elapsed() >= self.cooldown => BreakerState::HalfOpen,
            _ => BreakerState::Open,
        }
    }

    /// Gate a request: `Ok` when the call may proceed, `Err(Unavailable)`
    /// when the circuit is open (fail-fast, nothing attempted).
    ///
    /// In half-open state only one probe is admitted; concurrent callers
    /// see the circuit as still open until the probe resolves.
    pub fn check(&self) -> Result<(), InferenceError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match self.state_of(&inner) {
            BreakerState::Closed => Ok(()),
            BreakerState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                Ok(())
            }
            _ => Err(InferenceError::Unavailable(
                "inference endpoint temporarily degraded, failing fast".to_string(),
            )),
        }
    }

    /// Record a successful call; closes the circuit.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    /// Record a failed call; may trip the circuit open.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures += 1;
        inner.probe_in_flight = false;
        if inner.consecutive_failures >= self.failure_threshold {
            if inner.opened_at.is_none() || self.state_of(&inner) == BreakerState::HalfOpen {
                warn!(
                    failures = inner.consecutive_failures,
                    cooldown_secs = self.cooldown.as_secs(),
                    "inference circuit breaker opened"
                );
            }
            inner.opened_at = Some(Instant::now());
        }
    }

    /// Consecutive failures recorded so far.
    pub fn failure_count(&self) -> u32 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}
