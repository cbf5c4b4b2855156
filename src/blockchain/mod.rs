//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! [chains.<id>] config
//!     → client.rs (one RPC provider per chain, with timeouts)
//!     → ERC-20 reads (balanceOf, decimals) for relay tiering
//! ```
//!
//! # Design Decisions
//! - Read-only: the gateway never signs; relays go through the provider
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when a chain is unreachable

pub mod client;
pub mod types;

pub use client::{ChainClient, ChainClients};
pub use types::{BlockchainError, BlockchainResult};
