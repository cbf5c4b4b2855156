//! Safe relay gateway library.
//!
//! Sponsored ("gasless") relaying of Safe transactions with per-address
//! quotas, optional token-tiered no-fee campaigns, and circuit breakers
//! around every external dependency.

pub mod admin;
pub mod blockchain;
pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::RelayManager;
pub use resilience::CircuitBreakerService;
