//! Circuit breaker registry for protecting external dependencies.
//!
//! # States
//! - Closed: normal operation, calls pass through (also the state of any
//!   name that has no registry entry)
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: first can_proceed() after timeout has elapsed
//! Half-Open → Closed: success_threshold consecutive successes (entry removed)
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One registry per process, keyed by circuit name; each instance has its
//!   own view (no cluster state)
//! - Closed is not persisted: recovery removes the entry and the next
//!   registration starts from a fresh circuit
//! - Never panics and never errors; an unknown name always proceeds
//! - The open → half-open transition is at-least-once under races

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one named dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub consecutive_successes: u32,
    pub last_failure_time: Option<SystemTime>,
    /// Trial admissions granted since entering half-open.
    pub half_open_attempts: u32,
    pub config: CircuitBreakerConfig,
}

impl Circuit {
    fn new(name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            consecutive_successes: 0,
            last_failure_time: None,
            half_open_attempts: 0,
            config,
        }
    }

    fn open_timeout_elapsed(&self, now: SystemTime) -> bool {
        let Some(last_failure) = self.last_failure_time else {
            return true;
        };
        // A clock that went backwards reads as zero elapsed time.
        let elapsed = now.duration_since(last_failure).unwrap_or_default();
        elapsed >= Duration::from_millis(self.config.timeout_ms)
    }
}

/// Shared reference to a registered circuit.
///
/// Returned by [`CircuitBreakerService::get_or_register_circuit`] and passed
/// back to [`CircuitBreakerService::record_failure`].
#[derive(Debug, Clone)]
pub struct CircuitHandle {
    inner: Arc<Mutex<Circuit>>,
}

impl CircuitHandle {
    fn new(circuit: Circuit) -> Self {
        Self {
            inner: Arc::new(Mutex::new(circuit)),
        }
    }

    /// Copy of the circuit's current bookkeeping.
    pub fn snapshot(&self) -> Circuit {
        self.lock().clone()
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Circuit> {
        // Every mutation leaves the circuit consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn same_as(&self, other: &CircuitHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Registry of named circuits.
#[derive(Debug)]
pub struct CircuitBreakerService {
    circuits: DashMap<String, CircuitHandle>,
    defaults: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreakerService {
    /// Create an empty registry. `defaults` apply to circuits registered
    /// without an explicit configuration.
    pub fn new(defaults: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            circuits: DashMap::new(),
            defaults,
            clock,
        }
    }

    /// Return the circuit registered under `name`, creating a closed one if
    /// absent. An existing circuit keeps its counters and configuration.
    pub fn get_or_register_circuit(
        &self,
        name: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> CircuitHandle {
        self.circuits
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(circuit = %name, "Registering circuit");
                CircuitHandle::new(Circuit::new(name, config.unwrap_or(self.defaults)))
            })
            .clone()
    }

    /// Whether a call guarded by `name` may be attempted now.
    ///
    /// Unknown names always proceed and are not registered. An open circuit
    /// whose timeout has elapsed moves to half-open here, and this call is
    /// its first trial.
    pub fn can_proceed(&self, name: &str) -> bool {
        // Clone the handle out so no registry shard lock is held while the circuit is locked.
        let Some(handle) = self.handle(name) else {
            return true;
        };

        let mut circuit = handle.lock();
        let allowed = match circuit.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if circuit.open_timeout_elapsed(self.clock.now()) {
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_attempts = 1;
                    circuit.consecutive_successes = 0;
                    circuit.failure_count = 0;
                    log_transition(&circuit, CircuitState::Open);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if circuit.half_open_attempts < circuit.config.half_open_max_requests {
                    circuit.half_open_attempts += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !allowed {
            metrics::record_circuit_rejection(name);
        }
        allowed
    }

    /// Record a successful call. No-op for unknown names.
    ///
    /// Enough consecutive successes while half-open close the circuit, which
    /// removes it from the registry.
    pub fn record_success(&self, name: &str) {
        let Some(handle) = self.handle(name) else {
            return;
        };

        let recovered = {
            let mut circuit = handle.lock();
            circuit.success_count = circuit.success_count.saturating_add(1);
            circuit.consecutive_successes = circuit.consecutive_successes.saturating_add(1);

            if circuit.state == CircuitState::HalfOpen
                && circuit.consecutive_successes >= circuit.config.success_threshold
            {
                // Holders of a stale handle see a fresh closed circuit.
                let config = circuit.config;
                *circuit = Circuit::new(name, config);
                log_transition(&circuit, CircuitState::HalfOpen);
                true
            } else {
                false
            }
        };

        if recovered {
            self.circuits
                .remove_if(name, |_, registered| registered.same_as(&handle));
        }
    }

    /// Record a failed call on a circuit obtained from
    /// [`get_or_register_circuit`](Self::get_or_register_circuit).
    ///
    /// If the circuit was removed from the registry in the meantime it is
    /// registered again so the failure is not lost.
    pub fn record_failure(&self, handle: &CircuitHandle) {
        let name = {
            let mut circuit = handle.lock();
            let now = self.clock.now();
            circuit.failure_count = circuit.failure_count.saturating_add(1);
            circuit.consecutive_successes = 0;
            circuit.last_failure_time = Some(now);

            match circuit.state {
                CircuitState::Closed => {
                    if circuit.failure_count >= circuit.config.failure_threshold {
                        circuit.state = CircuitState::Open;
                        log_transition(&circuit, CircuitState::Closed);
                    }
                }
                CircuitState::HalfOpen => {
                    circuit.state = CircuitState::Open;
                    circuit.half_open_attempts = 0;
                    log_transition(&circuit, CircuitState::HalfOpen);
                }
                CircuitState::Open => {}
            }
            circuit.name.clone()
        };

        self.circuits.entry(name).or_insert_with(|| handle.clone());
    }

    /// Snapshot of the circuit registered under `name`.
    pub fn get(&self, name: &str) -> Option<Circuit> {
        self.handle(name).map(|handle| handle.snapshot())
    }

    /// Snapshots of every registered circuit, ordered by name.
    pub fn list(&self) -> Vec<Circuit> {
        let handles: Vec<CircuitHandle> =
            self.circuits.iter().map(|entry| entry.value().clone()).collect();
        let mut circuits: Vec<Circuit> = handles.iter().map(CircuitHandle::snapshot).collect();
        circuits.sort_by(|a, b| a.name.cmp(&b.name));
        circuits
    }

    /// Remove a circuit, returning whether it existed.
    pub fn delete(&self, name: &str) -> bool {
        self.circuits.remove(name).is_some()
    }

    /// Remove every circuit.
    pub fn delete_all(&self) {
        self.circuits.clear();
    }

    /// Default configuration for circuits registered without one.
    pub fn defaults(&self) -> &CircuitBreakerConfig {
        &self.defaults
    }

    fn handle(&self, name: &str) -> Option<CircuitHandle> {
        self.circuits.get(name).map(|entry| entry.value().clone())
    }
}

fn log_transition(circuit: &Circuit, from: CircuitState) {
    tracing::info!(
        circuit = %circuit.name,
        from = %from,
        to = %circuit.state,
        failure_count = circuit.failure_count,
        "Circuit state changed"
    );
    metrics::record_circuit_transition(&circuit.name, circuit.state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            timeout_ms: 1_000,
            rolling_window_ms: 60_000,
            half_open_max_requests: 2,
        }
    }

    fn service() -> (CircuitBreakerService, MockClock) {
        let clock = MockClock::at_unix(1_700_000_000);
        (CircuitBreakerService::new(config(), Arc::new(clock.clone())), clock)
    }

    fn open(service: &CircuitBreakerService, name: &str) -> CircuitHandle {
        let handle = service.get_or_register_circuit(name, None);
        for _ in 0..config().failure_threshold {
            service.record_failure(&handle);
        }
        handle
    }

    #[test]
    fn test_register_is_idempotent() {
        let (service, _) = service();
        let first = service.get_or_register_circuit("api", None);
        service.record_failure(&first);

        let custom = CircuitBreakerConfig {
            failure_threshold: 99,
            ..config()
        };
        let second = service.get_or_register_circuit("api", Some(custom));
        let circuit = second.snapshot();
        assert_eq!(circuit.failure_count, 1);
        assert_eq!(circuit.config.failure_threshold, 3);
    }

    #[test]
    fn test_register_uses_supplied_config() {
        let (service, _) = service();
        let custom = CircuitBreakerConfig {
            failure_threshold: 10,
            ..config()
        };
        let handle = service.get_or_register_circuit("custom", Some(custom));
        assert_eq!(handle.snapshot().config.failure_threshold, 10);
        assert_eq!(handle.snapshot().state, CircuitState::Closed);
    }

    #[test]
    fn test_unknown_circuit_proceeds_without_registration() {
        let (service, _) = service();
        assert!(service.can_proceed("unknown"));
        assert!(service.get("unknown").is_none());

        service.record_success("unknown");
        assert!(service.get("unknown").is_none());
    }

    #[test]
    fn test_opens_at_threshold_once() {
        let (service, _) = service();
        let handle = service.get_or_register_circuit("api", None);

        service.record_failure(&handle);
        service.record_failure(&handle);
        assert_eq!(handle.snapshot().state, CircuitState::Closed);
        assert!(service.can_proceed("api"));

        service.record_failure(&handle);
        assert_eq!(handle.snapshot().state, CircuitState::Open);

        service.record_failure(&handle);
        let circuit = handle.snapshot();
        assert_eq!(circuit.state, CircuitState::Open);
        assert_eq!(circuit.failure_count, 4);
    }

    #[test]
    fn test_failure_resets_consecutive_successes() {
        let (service, _) = service();
        let handle = service.get_or_register_circuit("api", None);
        service.record_success("api");
        service.record_success("api");
        assert_eq!(handle.snapshot().consecutive_successes, 2);

        service.record_failure(&handle);
        let circuit = handle.snapshot();
        assert_eq!(circuit.consecutive_successes, 0);
        assert_eq!(circuit.success_count, 2);
    }

    #[test]
    fn test_open_rejects_until_timeout() {
        let (service, clock) = service();
        open(&service, "api");

        assert!(!service.can_proceed("api"));
        clock.advance(Duration::from_millis(999));
        assert!(!service.can_proceed("api"));
        assert_eq!(service.get("api").unwrap().state, CircuitState::Open);

        clock.advance(Duration::from_millis(1));
        assert!(service.can_proceed("api"));
        let circuit = service.get("api").unwrap();
        assert_eq!(circuit.state, CircuitState::HalfOpen);
        assert_eq!(circuit.half_open_attempts, 1);
    }

    #[test]
    fn test_half_open_admission_is_bounded() {
        let (service, clock) = service();
        open(&service, "api");
        clock.advance(Duration::from_secs(1));

        let admitted = (0..5).filter(|_| service.can_proceed("api")).count();
        assert_eq!(admitted, 2);
        assert_eq!(service.get("api").unwrap().half_open_attempts, 2);
    }

    #[test]
    fn test_recovery_removes_circuit() {
        let (service, clock) = service();
        let stale = open(&service, "api");
        clock.advance(Duration::from_secs(1));
        assert!(service.can_proceed("api"));

        service.record_success("api");
        assert_eq!(service.get("api").unwrap().state, CircuitState::HalfOpen);
        service.record_success("api");
        assert!(service.get("api").is_none());

        let circuit = stale.snapshot();
        assert_eq!(circuit.state, CircuitState::Closed);
        assert_eq!(circuit.failure_count, 0);

        let fresh = service.get_or_register_circuit("api", None);
        assert_eq!(fresh.snapshot().state, CircuitState::Closed);
        assert!(!fresh.same_as(&stale));
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let (service, clock) = service();
        let handle = open(&service, "api");
        clock.advance(Duration::from_secs(1));
        assert!(service.can_proceed("api"));
        service.record_success("api");

        clock.advance(Duration::from_millis(10));
        service.record_failure(&handle);
        let circuit = handle.snapshot();
        assert_eq!(circuit.state, CircuitState::Open);
        assert_eq!(circuit.consecutive_successes, 0);
        assert_eq!(circuit.half_open_attempts, 0);
        assert_eq!(circuit.last_failure_time, Some(clock.now()));

        // The new failure restarts the open timeout.
        clock.advance(Duration::from_millis(500));
        assert!(!service.can_proceed("api"));
        clock.advance(Duration::from_millis(500));
        assert!(service.can_proceed("api"));
    }

    #[test]
    fn test_failure_on_removed_circuit_reregisters() {
        let (service, _) = service();
        let handle = service.get_or_register_circuit("api", None);
        assert!(service.delete("api"));
        assert!(service.get("api").is_none());

        service.record_failure(&handle);
        assert_eq!(service.get("api").unwrap().failure_count, 1);
    }

    #[test]
    fn test_delete_all_and_list() {
        let (service, _) = service();
        service.get_or_register_circuit("b", None);
        service.get_or_register_circuit("a", None);

        let names: Vec<_> = service.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        service.delete_all();
        assert!(service.list().is_empty());
        assert!(!service.delete("a"));
    }

    #[test]
    fn test_state_serializes_screaming_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
    }
}
