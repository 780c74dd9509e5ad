//! Circuit breaker for child service protection.
//!
//! # States
//! - Closed: normal operation, requests pass through, outcomes are counted
//! - Open: child service assumed down, requests fail fast
//! - Half-Open: a bounded number of trial requests test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold AND failures/requests >= ratio
//!                (both within the current closed window)
//! Open → Half-Open: after the open timeout
//! Half-Open → Closed: max_requests consecutive trial successes
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - One breaker per call name (service + path), not per service
//! - Every state change and every closed window starts a new generation;
//!   outcomes reported for an older generation are dropped
//! - An admission that is never settled (cancelled call) is rolled back,
//!   so it neither counts as a failure nor holds a half-open slot

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::schema::BreakerSettings;

/// Open timeout used when the configured value is zero.
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(60);

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl State {
    /// Value published on the state gauge.
    pub fn gauge_value(self) -> f64 {
        f64::from(self as u8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request outcomes counted within the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    /// Failures over admitted requests; 0 when nothing was admitted.
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        f64::from(self.total_failures) / f64::from(self.requests)
    }
}

/// Why a call was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BreakerError {
    #[error("circuit breaker is open")]
    Open,

    #[error("too many requests")]
    TooManyRequests,
}

/// Runtime tuning of one breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub max_requests: u32,
    pub interval: Duration,
    pub open_timeout: Duration,
    pub failure_ratio: f64,
    pub consecutive_failures: u32,
}

impl From<&BreakerSettings> for Policy {
    fn from(s: &BreakerSettings) -> Self {
        Self {
            max_requests: s.max_requests.max(1),
            interval: Duration::from_secs(s.interval),
            open_timeout: if s.timeout == 0 {
                DEFAULT_OPEN_TIMEOUT
            } else {
                Duration::from_secs(s.timeout)
            },
            failure_ratio: s.failure_ratio,
            consecutive_failures: s.consecutive_failures,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::from(&BreakerSettings::default())
    }
}

/// Callback fired on every state change: (call name, from, to).
pub type StateListener = Arc<dyn Fn(&str, State, State) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
    Excluded,
}

type Transition = Option<(State, State)>;

struct Inner {
    state: State,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

/// Point-in-time view of a breaker, for admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: State,
    pub counts: Counts,
}

/// A circuit breaker guarding one call name.
pub struct CircuitBreaker {
    name: String,
    policy: Policy,
    inner: Mutex<Inner>,
    on_state_change: Option<StateListener>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        let expiry = closed_expiry(&policy, Instant::now());
        Self {
            name: name.into(),
            policy,
            inner: Mutex::new(Inner {
                state: State::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
            on_state_change: None,
        }
    }

    /// Attach a state change listener.
    pub fn with_listener(mut self, listener: StateListener) -> Self {
        self.on_state_change = Some(listener);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Current state, applying any time-based transition that is due.
    pub fn state(&self) -> State {
        let (state, transition) = {
            let mut inner = self.inner.lock();
            let transition = self.current_state(&mut inner, Instant::now());
            (inner.state, transition)
        };
        self.notify(transition);
        state
    }

    /// Stored state, without applying time-based transitions or notifying.
    pub(crate) fn stored_state(&self) -> State {
        self.inner.lock().state
    }

    /// Counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.inner.lock().counts
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state();
        BreakerSnapshot {
            name: self.name.clone(),
            state,
            counts: self.counts(),
        }
    }

    /// Ask to send one request. The returned admission must be settled with
    /// the outcome; dropping it unsettled rolls the admission back.
    pub fn admit(&self) -> Result<Admission<'_>, BreakerError> {
        let (result, transition) = {
            let mut inner = self.inner.lock();
            let transition = self.current_state(&mut inner, Instant::now());
            let result = match inner.state {
                State::Open => Err(BreakerError::Open),
                State::HalfOpen if inner.counts.requests >= self.policy.max_requests => {
                    Err(BreakerError::TooManyRequests)
                }
                _ => {
                    inner.counts.on_request();
                    Ok(inner.generation)
                }
            };
            (result, transition)
        };
        self.notify(transition);

        result.map(|generation| Admission {
            breaker: self,
            generation,
            settled: false,
        })
    }

    /// Run `call` if admitted; `Ok` results count as successes, `Err` as failures.
    /// When rejected, `call` is never invoked.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<Result<T, E>, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit()?;
        let result = call().await;
        match &result {
            Ok(_) => admission.success(),
            Err(_) => admission.failure(),
        }
        Ok(result)
    }

    fn after_request(&self, generation: u64, outcome: Outcome) {
        let transition = {
            let mut inner = self.inner.lock();
            let now = Instant::now();
            let transition = self.current_state(&mut inner, now);
            if inner.generation != generation {
                transition
            } else {
                match outcome {
                    Outcome::Success => self.on_success(&mut inner, now),
                    Outcome::Failure => self.on_failure(&mut inner, now),
                    Outcome::Excluded => {
                        inner.counts.requests = inner.counts.requests.saturating_sub(1);
                        None
                    }
                }
            }
        };
        self.notify(transition);
    }

    fn on_success(&self, inner: &mut Inner, now: Instant) -> Transition {
        match inner.state {
            State::Closed => {
                inner.counts.on_success();
                None
            }
            State::HalfOpen => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.policy.max_requests {
                    self.set_state(inner, State::Closed, now)
                } else {
                    None
                }
            }
            State::Open => None,
        }
    }

    fn on_failure(&self, inner: &mut Inner, now: Instant) -> Transition {
        match inner.state {
            State::Closed => {
                inner.counts.on_failure();
                if self.ready_to_trip(&inner.counts) {
                    self.set_state(inner, State::Open, now)
                } else {
                    None
                }
            }
            State::HalfOpen => self.set_state(inner, State::Open, now),
            State::Open => None,
        }
    }

    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests > 0
            && counts.consecutive_failures >= self.policy.consecutive_failures
            && counts.failure_ratio() >= self.policy.failure_ratio
    }

    fn current_state(&self, inner: &mut Inner, now: Instant) -> Transition {
        match (inner.state, inner.expiry) {
            (State::Closed, Some(expiry)) if expiry <= now => {
                self.new_generation(inner, now);
                None
            }
            (State::Open, Some(expiry)) if expiry <= now => {
                self.set_state(inner, State::HalfOpen, now)
            }
            _ => None,
        }
    }

    fn set_state(&self, inner: &mut Inner, to: State, now: Instant) -> Transition {
        let from = inner.state;
        if from == to {
            return None;
        }
        inner.state = to;
        self.new_generation(inner, now);
        Some((from, to))
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts = Counts::default();
        inner.expiry = match inner.state {
            State::Closed => closed_expiry(&self.policy, now),
            State::Open => now.checked_add(self.policy.open_timeout),
            State::HalfOpen => None,
        };
    }

    fn notify(&self, transition: Transition) {
        if let Some((from, to)) = transition {
            tracing::info!(name = %self.name, from = %from, to = %to, "Circuit breaker state changed");
            if let Some(listener) = &self.on_state_change {
                listener(&self.name, from, to);
            }
        }
    }
}

/// End of the closed window; `None` when counts never reset.
fn closed_expiry(policy: &Policy, now: Instant) -> Option<Instant> {
    if policy.interval.is_zero() {
        return None;
    }
    now.checked_add(policy.interval)
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Permission to send one request through a breaker.
#[must_use = "an admission should be settled with success() or failure()"]
pub struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Admission<'_> {
    pub fn success(mut self) {
        self.settle(Outcome::Success);
    }

    pub fn failure(mut self) {
        self.settle(Outcome::Failure);
    }

    /// Give the admission back without reporting an outcome.
    pub fn release(mut self) {
        self.settle(Outcome::Excluded);
    }

    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.after_request(self.generation, outcome);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Outcome::Excluded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread::sleep;

    fn policy(consecutive: u32, ratio: f64, open_ms: u64, max_requests: u32) -> Policy {
        Policy {
            max_requests,
            interval: Duration::ZERO,
            open_timeout: Duration::from_millis(open_ms),
            failure_ratio: ratio,
            consecutive_failures: consecutive,
        }
    }

    fn fail(cb: &CircuitBreaker) {
        cb.admit().unwrap().failure();
    }

    fn succeed(cb: &CircuitBreaker) {
        cb.admit().unwrap().success();
    }

    #[test]
    fn test_policy_from_settings() {
        let p = Policy::from(&BreakerSettings::default());
        assert_eq!(p.max_requests, 100);
        assert_eq!(p.interval, Duration::from_secs(10));
        assert_eq!(p.open_timeout, Duration::from_secs(1));

        let zeroed = Policy::from(&BreakerSettings {
            max_requests: 0,
            timeout: 0,
            ..Default::default()
        });
        assert_eq!(zeroed.max_requests, 1);
        assert_eq!(zeroed.open_timeout, DEFAULT_OPEN_TIMEOUT);
    }

    #[test]
    fn test_trips_after_consecutive_failures() {
        let cb = CircuitBreaker::new("svcA/info", policy(3, 1.0, 1000, 1));
        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), State::Closed);
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
        assert_eq!(cb.admit().err(), Some(BreakerError::Open));
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let cb = CircuitBreaker::new("svcA/info", policy(3, 0.1, 1000, 1));
        fail(&cb);
        fail(&cb);
        succeed(&cb);
        assert_eq!(cb.counts().consecutive_failures, 0);
        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), State::Closed);
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn test_ratio_must_also_hold() {
        // 3 consecutive failures after 3 successes is a 0.5 ratio: not enough.
        let cb = CircuitBreaker::new("svcA/info", policy(3, 0.6, 1000, 1));
        for _ in 0..3 {
            succeed(&cb);
        }
        for _ in 0..3 {
            fail(&cb);
        }
        assert_eq!(cb.state(), State::Closed);
        fail(&cb);
        // 4 of 7 still below 0.6
        assert_eq!(cb.state(), State::Closed);
        fail(&cb);
        // 5 of 8 = 0.625
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn test_closed_window_resets_counts() {
        let mut p = policy(2, 1.0, 1000, 1);
        p.interval = Duration::from_millis(50);
        let cb = CircuitBreaker::new("svcA/info", p);
        fail(&cb);
        sleep(Duration::from_millis(80));
        fail(&cb);
        assert_eq!(cb.counts().consecutive_failures, 1);
        assert_eq!(cb.state(), State::Closed);
    }

    #[test]
    fn test_open_to_half_open_after_timeout() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 2));
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
        sleep(Duration::from_millis(80));
        assert_eq!(cb.state(), State::HalfOpen);
        assert!(cb.admit().is_ok());
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 3));
        fail(&cb);
        sleep(Duration::from_millis(80));
        succeed(&cb);
        assert_eq!(cb.state(), State::HalfOpen);
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn test_half_open_successes_close() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 3));
        fail(&cb);
        sleep(Duration::from_millis(80));
        succeed(&cb);
        succeed(&cb);
        assert_eq!(cb.state(), State::HalfOpen);
        succeed(&cb);
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.counts(), Counts::default());
    }

    #[test]
    fn test_half_open_caps_trials() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 2));
        fail(&cb);
        sleep(Duration::from_millis(80));
        let first = cb.admit().unwrap();
        let second = cb.admit().unwrap();
        assert_eq!(cb.admit().err(), Some(BreakerError::TooManyRequests));
        first.success();
        second.success();
        assert_eq!(cb.state(), State::Closed);
    }

    #[test]
    fn test_dropped_admission_is_not_counted() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 1));
        {
            let _admission = cb.admit().unwrap();
        }
        assert_eq!(cb.counts(), Counts::default());

        fail(&cb);
        sleep(Duration::from_millis(80));
        let trial = cb.admit().unwrap();
        assert_eq!(cb.admit().err(), Some(BreakerError::TooManyRequests));
        trial.release();
        assert!(cb.admit().is_ok());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 0.5, 50, 1));
        let slow = cb.admit().unwrap();
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
        // Result of a call admitted before the trip must not touch the new generation.
        slow.success();
        assert_eq!(cb.state(), State::Open);
        assert_eq!(cb.counts(), Counts::default());
    }

    #[test]
    fn test_listener_sees_transitions() {
        let changes = Arc::new(AtomicU32::new(0));
        let seen = changes.clone();
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 50, 1)).with_listener(Arc::new(
            move |name: &str, _from: State, _to: State| {
                assert_eq!(name, "svcA/info");
                seen.fetch_add(1, Ordering::SeqCst);
            },
        ));
        fail(&cb);
        sleep(Duration::from_millis(80));
        succeed(&cb);
        // closed → open → half-open → closed
        assert_eq!(changes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_skips_call_when_open() {
        let cb = CircuitBreaker::new("svcA/info", policy(1, 1.0, 1000, 1));
        let first: Result<Result<(), &str>, _> = cb.execute(|| async { Err("boom") }).await;
        assert_eq!(first, Ok(Err("boom")));

        let invoked = AtomicU32::new(0);
        let second: Result<Result<(), &str>, _> = cb
            .execute(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(second, Err(BreakerError::Open));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_huge_windows_do_not_overflow() {
        let mut p = policy(1, 1.0, 0, 1);
        p.interval = Duration::MAX;
        p.open_timeout = Duration::MAX;
        let cb = CircuitBreaker::new("svcA/info", p);
        fail(&cb);
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn test_state_gauge_values() {
        assert_eq!(State::Closed.gauge_value(), 0.0);
        assert_eq!(State::Open.gauge_value(), 1.0);
        assert_eq!(State::HalfOpen.gauge_value(), 2.0);
    }
}
