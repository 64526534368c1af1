//! §4.12: a guard in front of the pool's "acquire a connection" step that
//! fails fast once the server looks unhealthy, rather than piling up timed-
//! out acquisitions against a dependency that isn't coming back soon.
//!
//! State is held in plain atomics rather than behind a mutex, in keeping
//! with the rest of the pool (§5, §9): `state` is the discriminant,
//! `opened_at` and `timeout_millis` are only meaningful while `state ==
//! OPEN`/`HALF_OPEN`, and `probe_in_flight` gates the single probe a
//! `HalfOpen` breaker admits.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

/// Tuning knobs from §4.12.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub max_failures: u32,
    pub reset_timeout: Duration,
    pub exponential_backoff_factor: f64,
    pub max_reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            max_failures: 5,
            reset_timeout: Duration::from_secs(1),
            exponential_backoff_factor: 2.0,
            max_reset_timeout: Duration::from_secs(60),
        }
    }
}

/// A non-blocking state machine wrapping a protected operation (here, pool
/// connection acquisition). Closed/Open/HalfOpen transitions are linearised
/// with CAS; no lock is taken.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failures: AtomicU32,
    /// Milliseconds since `epoch` that the breaker last opened at.
    opened_at_millis: AtomicU64,
    timeout_millis: AtomicU64,
    probe_in_flight: AtomicBool,
    epoch: Instant,
}

/// Outcome of [`CircuitBreaker::try_enter`]: either the caller may proceed
/// (and must report the result via [`Admission::succeed`]/[`Admission::fail`]),
/// or the breaker is open and the call must fail immediately.
pub enum Admission<'a> {
    Proceed(ProceedGuard<'a>),
    Rejected { retry_after: Duration },
}

/// Returned when the breaker admits a call. `is_probe` is `true` exactly
/// when this admission is the single `HalfOpen` probe; the pool doesn't need
/// to look at it, but tests do.
pub struct ProceedGuard<'a> {
    breaker: &'a CircuitBreaker,
    is_probe: bool,
}

impl ProceedGuard<'_> {
    pub fn is_probe(&self) -> bool {
        self.is_probe
    }

    pub fn succeed(self) {
        self.breaker.on_success();
    }

    pub fn fail(self) {
        self.breaker.on_failure();
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            timeout_millis: AtomicU64::new(config.reset_timeout.as_millis() as u64),
            config,
            state: AtomicU8::new(CLOSED),
            failures: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
            probe_in_flight: AtomicBool::new(false),
            epoch: Instant::now(),
        }
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Attempts to admit one call. Never blocks.
    pub fn try_enter(&self) -> Admission<'_> {
        match self.state.load(Ordering::Acquire) {
            CLOSED => Admission::Proceed(ProceedGuard {
                breaker: self,
                is_probe: false,
            }),
            OPEN => {
                let opened_at = self.opened_at_millis.load(Ordering::Acquire);
                let timeout = self.timeout_millis.load(Ordering::Acquire);
                let elapsed = self.now_millis().saturating_sub(opened_at);

                if elapsed < timeout {
                    return Admission::Rejected {
                        retry_after: Duration::from_millis(timeout - elapsed),
                    };
                }

                // The reset window has elapsed; move to HalfOpen. Losing the
                // CAS just means another caller got there first, which is
                // fine — we re-evaluate as HalfOpen either way.
                let _ = self.state.compare_exchange(
                    OPEN,
                    HALF_OPEN,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                self.try_enter_half_open()
            }
            _ => self.try_enter_half_open(),
        }
    }

    fn try_enter_half_open(&self) -> Admission<'_> {
        if self
            .probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Admission::Proceed(ProceedGuard {
                breaker: self,
                is_probe: true,
            })
        } else {
            Admission::Rejected {
                retry_after: Duration::from_millis(50),
            }
        }
    }

    fn on_success(&self) {
        let was_probe = self.probe_in_flight.swap(false, Ordering::AcqRel);
        if was_probe {
            self.failures.store(0, Ordering::Release);
            self.timeout_millis
                .store(self.config.reset_timeout.as_millis() as u64, Ordering::Release);
            self.state.store(CLOSED, Ordering::Release);
            return;
        }

        self.failures.store(0, Ordering::Release);
    }

    fn on_failure(&self) {
        let was_probe = self.probe_in_flight.swap(false, Ordering::AcqRel);
        if was_probe {
            self.open_with_backoff();
            return;
        }

        let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.config.max_failures {
            self.open_with(self.config.reset_timeout);
        }
    }

    fn open_with_backoff(&self) {
        let current = Duration::from_millis(self.timeout_millis.load(Ordering::Acquire));
        let scaled = current.mul_f64(self.config.exponential_backoff_factor);
        let next = scaled.min(self.config.max_reset_timeout);
        self.open_with(next);
    }

    fn open_with(&self, timeout: Duration) {
        self.timeout_millis
            .store(timeout.as_millis() as u64, Ordering::Release);
        self.opened_at_millis.store(self.now_millis(), Ordering::Release);
        self.state.store(OPEN, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Runs `op` under the breaker's protection. `op`'s `Err` counts as a
    /// failure for every error kind; callers that want some errors to not
    /// count (e.g. a query syntax error shouldn't open the breaker) should
    /// filter before calling this — here it wraps pool acquisition, where
    /// every error is a connectivity failure by construction.
    pub async fn protect<F, Fut, T>(&self, op: F) -> crate::Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<T>>,
    {
        let guard = match self.try_enter() {
            Admission::Proceed(guard) => guard,
            Admission::Rejected { retry_after } => {
                return Err(crate::Error::CircuitOpen { retry_after })
            }
        };

        match op().await {
            Ok(value) => {
                guard.succeed();
                Ok(value)
            }
            Err(err) => {
                guard.fail();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(max_failures: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            max_failures,
            reset_timeout: Duration::from_millis(20),
            exponential_backoff_factor: 2.0,
            max_reset_timeout: Duration::from_secs(1),
        })
    }

    fn fail_once(cb: &CircuitBreaker) {
        match cb.try_enter() {
            Admission::Proceed(guard) => guard.fail(),
            Admission::Rejected { .. } => panic!("expected admission while closed/half-open"),
        }
    }

    #[test]
    fn opens_after_max_failures() {
        let cb = breaker(5);
        for _ in 0..5 {
            fail_once(&cb);
        }
        assert!(cb.is_open());

        match cb.try_enter() {
            Admission::Rejected { .. } => {}
            Admission::Proceed(_) => panic!("6th call should be rejected"),
        }
    }

    #[test]
    fn success_resets_failure_count() {
        let cb = breaker(5);
        for _ in 0..4 {
            fail_once(&cb);
        }
        match cb.try_enter() {
            Admission::Proceed(guard) => guard.succeed(),
            Admission::Rejected { .. } => panic!("should still be closed"),
        }
        for _ in 0..4 {
            fail_once(&cb);
        }
        assert!(cb.is_closed());
    }

    #[tokio::test]
    async fn half_open_admits_exactly_one_probe() {
        let cb = breaker(1);
        fail_once(&cb);
        assert!(cb.is_open());

        tokio::time::sleep(Duration::from_millis(30)).await;

        let first = cb.try_enter();
        let second = cb.try_enter();

        assert!(matches!(first, Admission::Proceed(_)));
        assert!(matches!(second, Admission::Rejected { .. }));

        if let Admission::Proceed(guard) = first {
            guard.succeed();
        }
        assert!(cb.is_closed());
    }
}
