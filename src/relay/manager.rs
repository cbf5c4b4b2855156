//! Relay eligibility and rate limiting.
//!
//! # Data Flow
//! ```text
//! relay(payload)
//!     → AddressResolver (Safe and/or owners to limit)
//!     → can_relay() per address (flat or campaign quota, counter read)
//!         any address over quota → RelayError::LimitReached, nothing sent
//!     → RelayApi (sponsored call, gas limit + buffer)
//!     → counters incremented best-effort
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use futures_util::future::join_all;

use crate::clock::Clock;
use crate::config::{NoFeeCampaign, RelayConfig};
use crate::observability::metrics::{self, RelayOutcome};
use crate::relay::addresses::AddressResolver;
use crate::relay::api::RelayApi;
use crate::relay::balances::BalanceLookup;
use crate::relay::limits::{no_fee_campaign_limit, Quota};
use crate::relay::store::{CounterKey, CounterNamespace, RelayCounterStore};
use crate::relay::types::{
    RelayEligibility, RelayError, RelayPayload, RelayResponse, RelayResult, RelaysRemaining,
    SponsoredCall,
};

/// Decides whether relays may proceed and tracks per-address usage.
pub struct RelayManager {
    config: RelayConfig,
    resolver: Arc<dyn AddressResolver>,
    store: Arc<dyn RelayCounterStore>,
    balances: Arc<dyn BalanceLookup>,
    api: Arc<dyn RelayApi>,
    clock: Arc<dyn Clock>,
}

impl RelayManager {
    pub fn new(
        config: RelayConfig,
        resolver: Arc<dyn AddressResolver>,
        store: Arc<dyn RelayCounterStore>,
        balances: Arc<dyn BalanceLookup>,
        api: Arc<dyn RelayApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
            balances,
            api,
            clock,
        }
    }

    /// Relay `payload` if every limited address still has quota.
    ///
    /// Eligibility is checked for all addresses before the provider is
    /// called, so a rejected request never reaches the provider.
    pub async fn relay(&self, payload: RelayPayload) -> RelayResult<RelayResponse> {
        let chain_id = payload.chain_id.as_str();

        let addresses = match self.resolver.resolve(&payload) {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::info!(chain_id = %chain_id, to = %payload.to, error = %e, "Relay payload rejected");
                metrics::record_relay(chain_id, RelayOutcome::Rejected);
                return Err(e);
            }
        };

        for &address in &addresses {
            let eligibility = self.can_relay(chain_id, address).await?;
            if !eligibility.result {
                tracing::info!(
                    chain_id = %chain_id,
                    address = %address,
                    current_count = eligibility.current_count,
                    limit = eligibility.limit,
                    "Relay limit reached"
                );
                metrics::record_relay(chain_id, RelayOutcome::Limited);
                return Err(RelayError::LimitReached {
                    address,
                    current_count: eligibility.current_count,
                    limit: eligibility.limit,
                });
            }
        }

        let call = SponsoredCall {
            chain_id: payload.chain_id.clone(),
            target: payload.to,
            data: payload.data.clone(),
            gas_limit: payload
                .gas_limit
                .map(|gas| gas.saturating_add(self.config.gas_limit_buffer)),
        };

        let response = match self.api.relay(&call).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_relay(chain_id, RelayOutcome::Failed);
                return Err(e);
            }
        };

        self.increment_relay_counts(chain_id, &addresses).await;

        tracing::info!(
            chain_id = %chain_id,
            to = %payload.to,
            task_id = %response.task_id,
            addresses = addresses.len(),
            "Transaction relayed"
        );
        metrics::record_relay(chain_id, RelayOutcome::Relayed);
        Ok(response)
    }

    /// Whether `address` may relay on `chain_id` right now.
    ///
    /// Campaign chains outside their window report `result: false, limit: 0`
    /// and never fall back to the flat limit. A counter that cannot be read
    /// fails the check with `ServiceUnavailable`.
    pub async fn can_relay(&self, chain_id: &str, address: Address) -> RelayResult<RelayEligibility> {
        let (current_count, limit) = match self.quota(chain_id) {
            Quota::CampaignInactive => (0, 0),
            Quota::Flat { limit } => {
                let key = CounterKey::new(CounterNamespace::Flat, chain_id, address);
                (self.read_count(&key).await?, limit)
            }
            Quota::Campaign(campaign) => {
                let limit = self.campaign_limit(chain_id, address, campaign).await;
                let key = CounterKey::new(CounterNamespace::Campaign, chain_id, address);
                (self.read_count(&key).await?, limit)
            }
        };

        let eligibility = RelayEligibility {
            result: current_count < limit,
            current_count,
            limit,
        };
        tracing::debug!(
            chain_id = %chain_id,
            address = %address,
            result = eligibility.result,
            current_count,
            limit,
            "Relay eligibility"
        );
        Ok(eligibility)
    }

    /// Remaining relays for `address`, using the same limits as `can_relay`.
    pub async fn get_relays_remaining(
        &self,
        chain_id: &str,
        address: Address,
    ) -> RelayResult<RelaysRemaining> {
        let eligibility = self.can_relay(chain_id, address).await?;
        Ok(RelaysRemaining {
            remaining: eligibility.limit.saturating_sub(eligibility.current_count),
            limit: eligibility.limit,
        })
    }

    fn quota(&self, chain_id: &str) -> Quota<'_> {
        Quota::resolve(
            self.config.no_fee_campaign.get(chain_id),
            self.config.limit,
            self.clock.unix_secs(),
        )
    }

    /// Tier limit for `address`. Balance lookup failures count as a zero balance.
    async fn campaign_limit(&self, chain_id: &str, address: Address, campaign: &NoFeeCampaign) -> u64 {
        let token_balance = match campaign.safe_token_address.parse::<Address>() {
            Ok(token) => match self.balances.get_token_balance(chain_id, address, token).await {
                Ok(Some(balance)) => balance.to_decimal(),
                Ok(None) => 0.0,
                Err(e) => {
                    tracing::warn!(chain_id = %chain_id, address = %address, error = %e, "Token balance lookup failed, assuming zero");
                    metrics::record_balance_lookup_failure(chain_id);
                    0.0
                }
            },
            Err(e) => {
                tracing::warn!(chain_id = %chain_id, token = %campaign.safe_token_address, error = %e, "Invalid campaign token address, assuming zero balance");
                0.0
            }
        };
        no_fee_campaign_limit(&campaign.relay_rules, token_balance)
    }

    async fn read_count(&self, key: &CounterKey) -> RelayResult<u64> {
        self.store.get_count(key).await.map_err(|e| {
            tracing::error!(key = %key, error = %e, "Failed to read relay counter");
            RelayError::ServiceUnavailable(e.to_string())
        })
    }

    /// Counter key and lifetime for a relay made now, or `None` when relaying
    /// is closed on this chain.
    fn counter_slot(&self, chain_id: &str, address: Address) -> Option<(CounterKey, Duration)> {
        match self.quota(chain_id) {
            Quota::Flat { .. } => Some((
                CounterKey::new(CounterNamespace::Flat, chain_id, address),
                Duration::from_secs(self.config.ttl_secs),
            )),
            Quota::Campaign(campaign) => {
                // Live through the last active second of the campaign.
                let remaining = campaign
                    .ends_at_timestamp
                    .saturating_sub(self.clock.unix_secs())
                    .saturating_add(1);
                Some((
                    CounterKey::new(CounterNamespace::Campaign, chain_id, address),
                    Duration::from_secs(remaining),
                ))
            }
            Quota::CampaignInactive => None,
        }
    }

    /// Best-effort: the relay already happened, so a failed increment is
    /// logged and dropped rather than failing or retrying the request.
    async fn increment_relay_counts(&self, chain_id: &str, addresses: &[Address]) {
        join_all(
            addresses
                .iter()
                .map(|&address| self.increment_relay_count(chain_id, address)),
        )
        .await;
    }

    async fn increment_relay_count(&self, chain_id: &str, address: Address) {
        let Some((key, ttl)) = self.counter_slot(chain_id, address) else {
            return;
        };

        let result = match self.store.get_count(&key).await {
            Ok(count) => self.store.set_count(&key, count.saturating_add(1), ttl).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Failed to increment relay counter");
            metrics::record_counter_increment_failure(chain_id);
        }
    }
}
