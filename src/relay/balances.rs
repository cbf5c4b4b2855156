//! Token balance lookup for campaign tiering.

use std::sync::Arc;

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::{BlockchainError, ChainClients};
use crate::resilience::CircuitBreakerService;

/// A raw token balance and the token's decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub balance: U256,
    pub decimals: u8,
}

impl TokenBalance {
    /// Balance in whole token units (`balance / 10^decimals`).
    pub fn to_decimal(&self) -> f64 {
        format_units(self.balance, self.decimals)
            .ok()
            .and_then(|units| units.parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error("circuit {0} is open")]
    CircuitOpen(String),
}

/// Reads the balance a Safe holds of a given token.
#[async_trait]
pub trait BalanceLookup: Send + Sync {
    /// `Ok(None)` when the balance is not known for this chain or token.
    async fn get_token_balance(
        &self,
        chain_id: &str,
        safe_address: Address,
        token_address: Address,
    ) -> Result<Option<TokenBalance>, BalanceError>;
}

/// Balance lookup over each chain's JSON-RPC endpoint.
///
/// Calls for a chain are guarded by the circuit `balances:<chain_id>`.
pub struct RpcBalanceLookup {
    chains: ChainClients,
    circuits: Arc<CircuitBreakerService>,
}

impl RpcBalanceLookup {
    pub fn new(chains: ChainClients, circuits: Arc<CircuitBreakerService>) -> Self {
        Self { chains, circuits }
    }

    pub fn circuit_name(chain_id: &str) -> String {
        format!("balances:{chain_id}")
    }
}

#[async_trait]
impl BalanceLookup for RpcBalanceLookup {
    async fn get_token_balance(
        &self,
        chain_id: &str,
        safe_address: Address,
        token_address: Address,
    ) -> Result<Option<TokenBalance>, BalanceError> {
        let Ok(client) = self.chains.get(chain_id) else {
            return Ok(None);
        };

        let circuit_name = Self::circuit_name(chain_id);
        let circuit = self.circuits.get_or_register_circuit(&circuit_name, None);
        if !self.circuits.can_proceed(&circuit_name) {
            return Err(BalanceError::CircuitOpen(circuit_name));
        }

        let result = tokio::try_join!(
            client.token_balance(token_address, safe_address),
            client.token_decimals(token_address),
        );

        match result {
            Ok((balance, decimals)) => {
                self.circuits.record_success(&circuit_name);
                Ok(Some(TokenBalance { balance, decimals }))
            }
            Err(e) => {
                self.circuits.record_failure(&circuit);
                Err(e.into())
            }
        }
    }
}
