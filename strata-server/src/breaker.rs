//! # Circuit Breaker
//!
//! Three-state breaker guarding outbound publish calls so a struggling bus
//! cannot stall the ingest path.
//!
//! ```text
//!            failures over threshold
//!   Closed ──────────────────────────> Open
//!     ▲                                  │ timeout elapsed
//!     │  max_requests successes          ▼
//!     └────────────────────────────── HalfOpen
//!                 (any failure reopens)
//! ```
//!
//! While closed, counts reset every `interval`; the breaker trips once a
//! window has seen at least `min_requests` requests with more than
//! `failure_ratio` of them failing. While half-open, at most `max_requests`
//! probes are admitted concurrently.

use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Probes admitted while half-open
    pub max_requests: u32,
    /// Closed-state statistical window
    pub interval: Duration,
    /// Open duration before probing again
    pub timeout: Duration,
    /// Minimum requests in a window before the ratio applies
    pub min_requests: u32,
    /// Failure ratio that trips the breaker
    pub failure_ratio: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            min_requests: 5,
            failure_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakerError {
    #[error("circuit breaker is open")]
    Open,
    #[error("too many requests while half-open")]
    TooManyRequests,
}

/// Error of a call made through the breaker: either rejected up front or
/// failed inside.
#[derive(Debug)]
pub enum CallError<E> {
    Rejected(BreakerError),
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Rejected(e) => e.fmt(f),
            CallError::Inner(e) => e.fmt(f),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for CallError<E> {}

pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    state: BreakerState,
    requests: u32,
    failures: u32,
    half_open_inflight: u32,
    half_open_successes: u32,
    opened_at: Instant,
    window_started: Instant,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                requests: 0,
                failures: 0,
                half_open_inflight: 0,
                half_open_successes: 0,
                opened_at: now,
                window_started: now,
            }),
        }
    }

    /// Run `f` through the breaker.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire().map_err(CallError::Rejected)?;

        match f().await {
            Ok(value) => {
                self.on_result(true);
                Ok(value)
            }
            Err(e) => {
                self.on_result(false);
                Err(CallError::Inner(e))
            }
        }
    }

    /// Current state, applying any pending time-based transition.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.advance(&mut inner);
        inner.state
    }

    fn try_acquire(&self) -> Result<(), BreakerError> {
        let mut inner = self.inner.lock();
        self.advance(&mut inner);

        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => Err(BreakerError::Open),
            BreakerState::HalfOpen => {
                if inner.half_open_inflight >= self.config.max_requests {
                    Err(BreakerError::TooManyRequests)
                } else {
                    inner.half_open_inflight += 1;
                    Ok(())
                }
            }
        }
    }

    fn on_result(&self, success: bool) {
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed => {
                inner.requests += 1;
                if !success {
                    inner.failures += 1;
                }
                if inner.requests >= self.config.min_requests
                    && f64::from(inner.failures) / f64::from(inner.requests)
                        > self.config.failure_ratio
                {
                    warn!(
                        requests = inner.requests,
                        failures = inner.failures,
                        "circuit breaker tripped open"
                    );
                    self.trip(&mut inner);
                }
            }
            BreakerState::HalfOpen => {
                inner.half_open_inflight = inner.half_open_inflight.saturating_sub(1);
                if success {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.max_requests {
                        info!("circuit breaker closed");
                        self.reset(&mut inner);
                    }
                } else {
                    warn!("half-open probe failed, circuit breaker reopened");
                    self.trip(&mut inner);
                }
            }
            // A call that straddled the open transition; its outcome no
            // longer influences anything.
            BreakerState::Open => {}
        }
    }

    /// Time-based transitions: closed-window reset and open -> half-open.
    fn advance(&self, inner: &mut Inner) {
        let now = Instant::now();
        match inner.state {
            BreakerState::Closed => {
                if now.duration_since(inner.window_started) >= self.config.interval {
                    inner.requests = 0;
                    inner.failures = 0;
                    inner.window_started = now;
                }
            }
            BreakerState::Open => {
                if now.duration_since(inner.opened_at) >= self.config.timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_inflight = 0;
                    inner.half_open_successes = 0;
                }
            }
            BreakerState::HalfOpen => {}
        }
    }

    fn trip(&self, inner: &mut Inner) {
        inner.state = BreakerState::Open;
        inner.opened_at = Instant::now();
    }

    fn reset(&self, inner: &mut Inner) {
        inner.state = BreakerState::Closed;
        inner.requests = 0;
        inner.failures = 0;
        inner.half_open_inflight = 0;
        inner.half_open_successes = 0;
        inner.window_started = Instant::now();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
