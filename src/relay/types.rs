//! Relay request/response types and errors.

use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A sponsored transaction submission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPayload {
    pub chain_id: String,
    /// Target contract (a Safe, a MultiSend or a proxy factory).
    pub to: Address,
    pub data: Bytes,
    /// Caller supplied gas limit, before the gateway's buffer is added.
    pub gas_limit: Option<u64>,
    /// Safe contract version the payload was built for.
    pub version: String,
}

/// The call forwarded to the relay provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsoredCall {
    pub chain_id: String,
    pub target: Address,
    pub data: Bytes,
    pub gas_limit: Option<u64>,
}

/// Provider acknowledgement of a relayed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub task_id: String,
}

/// Outcome of a per-address eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEligibility {
    pub result: bool,
    pub current_count: u64,
    pub limit: u64,
}

/// Quota introspection for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaysRemaining {
    pub remaining: u64,
    pub limit: u64,
}

/// Errors surfaced by the relay subsystem.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An address exhausted its quota. Raised before any provider call.
    #[error("Relay limit reached for {address} | current: {current_count} | limit: {limit}")]
    LimitReached {
        address: Address,
        current_count: u64,
        limit: u64,
    },

    /// The payload is not a transaction the gateway sponsors.
    #[error("Unsupported relay transaction: {0}")]
    UnsupportedTransaction(String),

    /// The payload could not be parsed.
    #[error("Invalid relay payload: {0}")]
    InvalidPayload(String),

    /// The provider rejected or failed the call.
    #[error("Relay provider error: {0}")]
    Provider(String),

    /// A dependency needed to decide or forward the relay is unavailable.
    #[error("Relay service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
