// crates/resilience/src/circuit_breaker.rs
//! Circuit breaker pattern implementation
//!
//! Transitions:
//! - Closed -> Open once `failure_threshold` trip-worthy failures accumulate
//!   (any success while closed clears the count).
//! - Open -> HalfOpen lazily, on the first admission check after
//!   `open_timeout` has passed since the last failure.
//! - HalfOpen -> Closed after `success_threshold` successful probes.
//! - HalfOpen -> Open on any failure, whatever the trip predicate says.

use crate::classify::{default_should_trip, Classify, FailureClass};
use crate::error::CircuitOpenError;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Capacity of the state change broadcast channel
const EVENT_CAPACITY: usize = 32;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, testing if service recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// A committed state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Decides whether a failure counts toward opening the circuit
pub type TripPredicate = Arc<dyn Fn(&FailureClass) -> bool + Send + Sync>;

/// Called after every transition. Must not block.
pub type StateChangeCallback = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// Circuit breaker configuration
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
    max_half_open_requests: u32,
    should_trip: TripPredicate,
    on_state_change: Option<StateChangeCallback>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            success_threshold: 2,
            open_timeout,
            max_half_open_requests: 0,
            should_trip: Arc::new(default_should_trip),
            on_state_change: None,
        }
    }

    /// Sets the number of half-open successes needed to close
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Sets how many probes may run concurrently while half-open (0 means 1)
    pub fn with_max_half_open_requests(mut self, max: u32) -> Self {
        self.max_half_open_requests = max;
        self
    }

    /// Replaces the trip predicate
    pub fn with_trip_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FailureClass) -> bool + Send + Sync + 'static,
    {
        self.should_trip = Arc::new(predicate);
        self
    }

    /// Registers a transition callback.
    ///
    /// The callback runs after the breaker lock is released, so it may call
    /// back into the breaker, but it must return quickly.
    pub fn on_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(callback));
        self
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    pub fn open_timeout(&self) -> Duration {
        self.open_timeout
    }

    /// Effective half-open concurrency
    pub fn max_half_open_requests(&self) -> u32 {
        self.max_half_open_requests.max(1)
    }

    fn should_trip(&self, class: &FailureClass) -> bool {
        (self.should_trip)(class)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("open_timeout", &self.open_timeout)
            .field("max_half_open_requests", &self.max_half_open_requests)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish_non_exhaustive()
    }
}

/// Circuit breaker state
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    half_open_in_flight: u32,
    /// Bumped on every transition so late outcomes from an older state are ignored
    generation: u64,
}

impl BreakerState {
    fn transition(&mut self, to: CircuitState) -> Option<StateChange> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.failure_count = 0;
        self.success_count = 0;
        self.half_open_in_flight = 0;
        self.generation += 1;
        Some(StateChange { from, to })
    }

    fn release_slot(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
    }
}

struct Inner {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    events: broadcast::Sender<StateChange>,
}

/// Circuit breaker implementation
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(BreakerState {
                    state: CircuitState::Closed,
                    failure_count: 0,
                    success_count: 0,
                    last_failure_time: None,
                    half_open_in_flight: 0,
                    generation: 0,
                }),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.inner.config
    }

    /// Gets the current state
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.lock().success_count
    }

    /// Probes currently admitted while half-open
    pub fn half_open_in_flight(&self) -> u32 {
        self.lock().half_open_in_flight
    }

    /// Subscribes to state transitions.
    ///
    /// The channel is bounded; a receiver that falls behind loses the oldest
    /// events instead of slowing the breaker down.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.events.subscribe()
    }

    fn notify(&self, change: Option<StateChange>) {
        let Some(change) = change else {
            return;
        };
        log::info!("circuit breaker {} -> {}", change.from, change.to);
        // No receivers is fine
        let _ = self.inner.events.send(change);
        if let Some(callback) = &self.inner.config.on_state_change {
            callback(change.from, change.to);
        }
    }

    /// Admits a call and returns the generation it was admitted under
    fn admit(&self) -> Result<u64, CircuitOpenError> {
        let config = &self.inner.config;
        let now = Instant::now();
        let mut state = self.lock();
        let mut change = None;

        if state.state == CircuitState::Open {
            let elapsed = state
                .last_failure_time
                .map(|at| now.saturating_duration_since(at));
            match elapsed {
                Some(elapsed) if elapsed < config.open_timeout => {
                    return Err(CircuitOpenError {
                        state: CircuitState::Open,
                        retry_in: Some(config.open_timeout - elapsed),
                    });
                }
                _ => change = state.transition(CircuitState::HalfOpen),
            }
        }

        let admitted = match state.state {
            CircuitState::Closed => Ok(state.generation),
            CircuitState::HalfOpen if state.half_open_in_flight < config.max_half_open_requests() => {
                state.half_open_in_flight += 1;
                Ok(state.generation)
            }
            current => Err(CircuitOpenError {
                state: current,
                retry_in: None,
            }),
        };

        drop(state);
        self.notify(change);
        admitted
    }

    /// Checks if a request can proceed.
    ///
    /// While half-open an admission occupies a probe slot until it is
    /// settled with [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn can_proceed(&self) -> Result<(), CircuitOpenError> {
        self.admit().map(|_| ())
    }

    /// Records a successful operation
    pub fn record_success(&self) {
        self.settle(None, None);
    }

    /// Records a failed operation
    pub fn record_failure(&self, class: &FailureClass) {
        self.settle(None, Some(class));
    }

    /// Applies an outcome. With `generation` set, outcomes admitted under an
    /// earlier state are dropped.
    fn settle(&self, generation: Option<u64>, failure: Option<&FailureClass>) {
        let config = &self.inner.config;
        let mut state = self.lock();

        if generation.is_some_and(|g| g != state.generation) {
            return;
        }

        let change = match (state.state, failure) {
            // The caller gave up; says nothing about upstream health
            (_, Some(FailureClass::Canceled | FailureClass::Rejected | FailureClass::Local)) => {
                state.release_slot();
                None
            }
            (CircuitState::Closed, None) => {
                state.failure_count = 0;
                None
            }
            (CircuitState::Closed, Some(class)) => {
                if config.should_trip(class) {
                    state.failure_count += 1;
                    state.last_failure_time = Some(Instant::now());
                    if state.failure_count >= config.failure_threshold {
                        state.transition(CircuitState::Open)
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            (CircuitState::HalfOpen, None) => {
                state.release_slot();
                state.success_count += 1;
                if state.success_count >= config.success_threshold {
                    state.transition(CircuitState::Closed)
                } else {
                    None
                }
            }
            (CircuitState::HalfOpen, Some(_)) => {
                state.last_failure_time = Some(Instant::now());
                state.transition(CircuitState::Open)
            }
            (CircuitState::Open, _) => None,
        };

        drop(state);
        self.notify(change);
    }

    fn abandon(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.release_slot();
        }
    }

    /// Executes an operation through the circuit breaker.
    ///
    /// Admission and outcome bookkeeping happen under the breaker lock; the
    /// operation itself runs outside it. If the returned future is dropped
    /// before completion, any half-open slot it held is released.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + From<CircuitOpenError>,
    {
        let generation = self.admit()?;
        let mut admission = Admission {
            breaker: self,
            generation,
            settled: false,
        };

        let result = operation().await;

        admission.settled = true;
        match &result {
            Ok(_) => self.settle(Some(generation), None),
            Err(err) => self.settle(Some(generation), Some(&err.failure_class())),
        }
        result
    }

    /// Resets the circuit breaker to closed state
    pub fn reset(&self) {
        let mut state = self.lock();
        let change = state.transition(CircuitState::Closed);
        state.last_failure_time = None;
        drop(state);
        self.notify(change);
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.inner.config)
            .field("state", &*self.lock())
            .finish()
    }
}

struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(self.generation);
        }
    }
}
