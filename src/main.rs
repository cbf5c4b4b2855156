//! Safe relay gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /v1/chains/{id}/relay
//!        │
//!        ▼
//!   ┌─────────┐   ┌───────────────┐   ┌──────────────┐
//!   │  http   │──▶│ RelayManager  │──▶│ relay api    │──▶ relay provider
//!   │ server  │   │  eligibility  │   │ (circuit)    │
//!   └─────────┘   └──────┬────────┘   └──────────────┘
//!                        │
//!            ┌───────────┼─────────────┐
//!            ▼           ▼             ▼
//!     ┌───────────┐ ┌──────────┐ ┌─────────────┐
//!     │ addresses │ │ counters │ │  balances   │──▶ chain RPC
//!     │ (calldata)│ │ (TTL)    │ │  (circuit)  │
//!     └───────────┘ └──────────┘ └─────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use safe_relay_gateway::blockchain::ChainClients;
use safe_relay_gateway::clock::{Clock, SystemClock};
use safe_relay_gateway::config::load_from_env;
use safe_relay_gateway::http::{AppState, HttpServer};
use safe_relay_gateway::lifecycle::{wait_for_shutdown_signal, Shutdown};
use safe_relay_gateway::observability::{logging, metrics};
use safe_relay_gateway::relay::{
    HttpRelayApi, InMemoryRelayCounterStore, RelayManager, RpcBalanceLookup, SafeAddressResolver,
};
use safe_relay_gateway::resilience::CircuitBreakerService;

const COUNTER_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_from_env()?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "safe-relay-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        relay_limit = config.relay.limit,
        campaigns = config.relay.no_fee_campaign.len(),
        chains = config.chains.len(),
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shutdown = Shutdown::new();

    let circuits = Arc::new(CircuitBreakerService::new(
        config.circuit_breaker,
        clock.clone(),
    ));

    let store = InMemoryRelayCounterStore::new(clock.clone());
    let purge = tokio::spawn(
        store
            .clone()
            .run_purge(COUNTER_PURGE_INTERVAL, shutdown.subscribe()),
    );

    let chains = ChainClients::from_config(&config.chains);
    let balances = RpcBalanceLookup::new(chains, circuits.clone());
    let api = HttpRelayApi::new(config.relay.provider.clone(), circuits.clone())?;

    let manager = RelayManager::new(
        config.relay.clone(),
        Arc::new(SafeAddressResolver),
        Arc::new(store),
        Arc::new(balances),
        Arc::new(api),
        clock,
    );

    let state = AppState {
        relay: Arc::new(manager),
        circuits,
        admin: Arc::new(config.admin.clone()),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, state);

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, &shutdown).await?;

    shutdown.trigger();
    if let Err(e) = purge.await {
        tracing::warn!(error = %e, "Counter purge task ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
