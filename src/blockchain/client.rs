//! Per-chain RPC client for ERC-20 reads.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint of each configured chain
//! - Read token balances and decimals
//! - Bound every call with the chain's timeout

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::ChainConfig;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// RPC client bound to a single chain.
#[derive(Clone)]
pub struct ChainClient {
    chain_id: String,
    rpc_url: String,
    provider: DynProvider,
    timeout_secs: u64,
}

impl ChainClient {
    /// Create a client for `chain_id`. No request is made until first use.
    pub fn new(chain_id: &str, config: &ChainConfig) -> BlockchainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            chain_id: chain_id.to_string(),
            rpc_url: config.rpc_url.clone(),
            provider,
            timeout_secs: config.rpc_timeout_secs,
        })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Raw ERC-20 balance of `owner`.
    pub async fn token_balance(&self, token: Address, owner: Address) -> BlockchainResult<U256> {
        let erc20 = IERC20::new(token, self.provider.clone());
        self.with_timeout(async move { erc20.balanceOf(owner).call().await })
            .await
    }

    /// ERC-20 `decimals()` of `token`.
    pub async fn token_decimals(&self, token: Address) -> BlockchainResult<u8> {
        let erc20 = IERC20::new(token, self.provider.clone());
        self.with_timeout(async move { erc20.decimals().call().await })
            .await
    }

    async fn with_timeout<T, E, F>(&self, call: F) -> BlockchainResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(chain_id = %self.chain_id, error = %e, "RPC error");
                Err(BlockchainError::Rpc(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(chain_id = %self.chain_id, "RPC timeout");
                Err(BlockchainError::Timeout(self.timeout_secs))
            }
        }
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Clients for every configured chain.
#[derive(Debug, Clone, Default)]
pub struct ChainClients {
    clients: HashMap<String, ChainClient>,
}

impl ChainClients {
    /// Build clients from the `chains` config section, skipping invalid entries.
    pub fn from_config(chains: &HashMap<String, ChainConfig>) -> Self {
        let mut clients = HashMap::new();
        for (chain_id, config) in chains {
            match ChainClient::new(chain_id, config) {
                Ok(client) => {
                    tracing::info!(chain_id = %chain_id, rpc_url = %config.rpc_url, "Chain client initialized");
                    clients.insert(chain_id.clone(), client);
                }
                Err(e) => {
                    tracing::warn!(chain_id = %chain_id, error = %e, "Ignoring chain with invalid RPC URL");
                }
            }
        }
        Self { clients }
    }

    pub fn get(&self, chain_id: &str) -> BlockchainResult<&ChainClient> {
        self.clients
            .get(chain_id)
            .ok_or_else(|| BlockchainError::UnknownChain(chain_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(rpc_url: &str) -> ChainConfig {
        ChainConfig {
            rpc_url: rpc_url.to_string(),
            rpc_timeout_secs: 1,
        }
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = ChainClient::new("1", &chain("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_clients_from_config_skip_invalid() {
        let mut chains = HashMap::new();
        chains.insert("1".to_string(), chain("http://127.0.0.1:1"));
        chains.insert("2".to_string(), chain("::bad::"));

        let clients = ChainClients::from_config(&chains);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients.get("1").unwrap().chain_id(), "1");
        assert!(matches!(clients.get("2"), Err(BlockchainError::UnknownChain(_))));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_errors() {
        let client = ChainClient::new("1", &chain("http://127.0.0.1:1")).unwrap();
        let result = client.token_decimals(Address::ZERO).await;
        assert!(matches!(result, Err(BlockchainError::Rpc(_))));
    }
}
