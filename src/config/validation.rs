//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, campaign windows ordered)
//! - Check referential integrity (campaign chains have an RPC endpoint)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, PLACEHOLDER_ADMIN_KEY};

/// Longest accepted lifetime for flat relay counters (one year).
pub const MAX_COUNTER_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("admin.api_key must be set to a non-default value when the admin API is enabled")]
    PlaceholderAdminKey,

    #[error("invalid URL for {field}: {value}")]
    InvalidUrl { field: String, value: String },

    #[error("campaign on chain {chain_id} ends before it starts")]
    CampaignWindow { chain_id: String },

    #[error("campaign on chain {chain_id} has no relay rules")]
    CampaignWithoutRules { chain_id: String },

    #[error("campaign on chain {chain_id} has a negative or non-finite rule balance")]
    CampaignRuleBalance { chain_id: String },

    #[error("campaign on chain {chain_id} has an invalid token address: {value}")]
    CampaignToken { chain_id: String, value: String },

    #[error("campaign on chain {chain_id} has no RPC endpoint configured")]
    CampaignWithoutRpc { chain_id: String },
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let breaker = &config.circuit_breaker;
    for (field, value) in [
        ("circuit_breaker.failure_threshold", u64::from(breaker.failure_threshold)),
        ("circuit_breaker.success_threshold", u64::from(breaker.success_threshold)),
        ("circuit_breaker.half_open_max_requests", u64::from(breaker.half_open_max_requests)),
        ("circuit_breaker.timeout_ms", breaker.timeout_ms),
        ("relay.ttl_secs", config.relay.ttl_secs),
        ("listener.timeout_secs", config.listener.timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.relay.ttl_secs > MAX_COUNTER_TTL_SECS {
        errors.push(ValidationError::TooLarge {
            field: "relay.ttl_secs",
            max: MAX_COUNTER_TTL_SECS,
        });
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY)
    {
        errors.push(ValidationError::PlaceholderAdminKey);
    }

    check_url(&mut errors, "relay.provider.base_url".to_string(), &config.relay.provider.base_url);
    for (chain_id, chain) in &config.chains {
        check_url(&mut errors, format!("chains.{chain_id}.rpc_url"), &chain.rpc_url);
    }

    let mut campaign_chains: Vec<_> = config.relay.no_fee_campaign.iter().collect();
    campaign_chains.sort_by(|a, b| a.0.cmp(b.0));

    for (chain_id, campaign) in campaign_chains {
        if campaign.starts_at_timestamp > campaign.ends_at_timestamp {
            errors.push(ValidationError::CampaignWindow { chain_id: chain_id.clone() });
        }
        if campaign.relay_rules.is_empty() {
            errors.push(ValidationError::CampaignWithoutRules { chain_id: chain_id.clone() });
        }
        if campaign
            .relay_rules
            .iter()
            .any(|rule| !rule.balance.is_finite() || rule.balance < 0.0)
        {
            errors.push(ValidationError::CampaignRuleBalance { chain_id: chain_id.clone() });
        }
        if campaign.safe_token_address.parse::<Address>().is_err() {
            errors.push(ValidationError::CampaignToken {
                chain_id: chain_id.clone(),
                value: campaign.safe_token_address.clone(),
            });
        }
        if !config.chains.contains_key(chain_id) {
            errors.push(ValidationError::CampaignWithoutRpc { chain_id: chain_id.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    if url::Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
