//! Relay subsystem: sponsored transactions and their quotas.
//!
//! # Data Flow
//! ```text
//! RelayPayload
//!     → addresses.rs (which Safe or owners the request counts against)
//!     → manager.rs (eligibility per address)
//!         → limits.rs (flat limit, or campaign tier by token balance)
//!         → balances.rs (ERC-20 balance, circuit "balances:<chain>")
//!         → store.rs (current count per namespace)
//!     → api.rs (sponsored call, circuit "relay-provider")
//!     → store.rs (best-effort increment)
//! ```
//!
//! # Design Decisions
//! - Eligibility is checked for every address before anything is sent
//! - Counting is not transactional; concurrent relays may overshoot a limit
//! - An inactive campaign closes the chain instead of reverting to the flat limit

pub mod addresses;
pub mod api;
pub mod balances;
pub mod limits;
pub mod manager;
pub mod store;
pub mod types;

pub use addresses::{AddressResolver, SafeAddressResolver};
pub use api::{HttpRelayApi, RelayApi, RELAY_PROVIDER_CIRCUIT};
pub use balances::{BalanceError, BalanceLookup, RpcBalanceLookup, TokenBalance};
pub use limits::{no_fee_campaign_limit, Quota};
pub use manager::RelayManager;
pub use store::{CounterKey, CounterNamespace, InMemoryRelayCounterStore, RelayCounterStore, StoreError};
pub use types::{
    RelayEligibility, RelayError, RelayPayload, RelayResponse, RelayResult, RelaysRemaining,
    SponsoredCall,
};
