//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external dependency (relay provider, chain RPC):
//!     → get_or_register_circuit(name)
//!     → can_proceed(name)? no → fail fast without calling out
//!     → call
//!     → record_success(name) / record_failure(handle)
//! ```
//!
//! # Design Decisions
//! - One named circuit per dependency, created on first use
//! - A recovered circuit is dropped from the registry and starts fresh
//! - Time comes from the injected clock so transitions are testable

pub mod circuit_breaker;

pub use circuit_breaker::{Circuit, CircuitBreakerService, CircuitHandle, CircuitState};
