//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Default settings for every registered circuit.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Relay limits, campaigns and provider.
    pub relay: RelayConfig,

    /// Per-chain RPC endpoints, keyed by chain ID.
    pub chains: HashMap<String, ChainConfig>,
}

/// Default admin key. Rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}

/// Circuit breaker thresholds.
///
/// Used as the registry default when a circuit is registered without its
/// own configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures in the closed state before opening the circuit.
    pub failure_threshold: u32,

    /// Consecutive half-open successes before the circuit closes.
    pub success_threshold: u32,

    /// How long the circuit stays open before admitting trial calls, in ms.
    pub timeout_ms: u64,

    /// Failure counting window in ms. Accepted but not applied yet: failures
    /// accumulate until the circuit changes state.
    pub rolling_window_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_ms: 30_000,
            rolling_window_ms: 60_000,
            half_open_max_requests: 1,
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Flat number of relays per address for chains without a campaign.
    pub limit: u64,

    /// Lifetime of flat relay counters in seconds.
    pub ttl_secs: u64,

    /// Gas added on top of a caller supplied gas limit.
    pub gas_limit_buffer: u64,

    /// Sponsored relay provider.
    pub provider: RelayProviderConfig,

    /// No-fee campaigns keyed by chain ID.
    pub no_fee_campaign: HashMap<String, NoFeeCampaign>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            ttl_secs: 24 * 60 * 60,
            gas_limit_buffer: 150_000,
            provider: RelayProviderConfig::default(),
            no_fee_campaign: HashMap::new(),
        }
    }
}

/// Sponsored relay provider endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for RelayProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gelato.digital".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// A time-bounded sponsorship campaign on one chain.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NoFeeCampaign {
    /// Campaign start (UNIX seconds, inclusive).
    pub starts_at_timestamp: u64,

    /// Campaign end (UNIX seconds, inclusive).
    pub ends_at_timestamp: u64,

    /// Token whose balance selects the relay tier.
    pub safe_token_address: String,

    /// Balance ceilings and the limit each grants.
    pub relay_rules: Vec<RelayRule>,
}

impl NoFeeCampaign {
    /// Whether `now` (UNIX seconds) falls inside the campaign window.
    pub fn is_active(&self, now: u64) -> bool {
        now >= self.starts_at_timestamp && now <= self.ends_at_timestamp
    }
}

/// One relay tier: holders of at most `balance` tokens get `limit` relays.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct RelayRule {
    pub balance: f64,
    pub limit: u64,
}

/// Per-chain connectivity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// RPC request timeout in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.relay.limit, 5);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.half_open_max_requests, 1);
        assert!(config.relay.no_fee_campaign.is_empty());
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_campaign_table_parses() {
        let raw = r#"
            [relay]
            limit = 3

            [relay.no_fee_campaign.11155111]
            starts_at_timestamp = 1000
            ends_at_timestamp = 2000
            safe_token_address = "0xd8F1c2b1C6b3Bb5E2E4b5a4A0C5CC3fB3b1D0a6A"
            relay_rules = [
                { balance = 100, limit = 5 },
                { balance = 1000, limit = 20 },
            ]

            [chains.11155111]
            rpc_url = "http://localhost:8545"
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();
        let campaign = &config.relay.no_fee_campaign["11155111"];
        assert_eq!(campaign.relay_rules.len(), 2);
        assert_eq!(campaign.relay_rules[1].limit, 20);
        assert_eq!(config.chains["11155111"].rpc_timeout_secs, 10);
    }

    #[test]
    fn test_campaign_window_is_inclusive() {
        let campaign = NoFeeCampaign {
            starts_at_timestamp: 10,
            ends_at_timestamp: 20,
            safe_token_address: String::new(),
            relay_rules: vec![],
        };
        assert!(!campaign.is_active(9));
        assert!(campaign.is_active(10));
        assert!(campaign.is_active(20));
        assert!(!campaign.is_active(21));
    }
}
