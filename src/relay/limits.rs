//! Relay quota resolution.
//!
//! Chains without a campaign use the flat `relay.limit`. Campaign chains only
//! relay inside the campaign window, with a limit chosen by the address's
//! token balance:
//!
//! ```text
//! rules (sorted by balance): [100 → 5] [1000 → 20]
//! balance   0..=100  → 5
//! balance 100<..=1000 → 20
//! balance   > 1000   → 20 (highest rule)
//! ```

use crate::config::{NoFeeCampaign, RelayRule};

/// Limit granted by the campaign rules for `token_balance`.
///
/// Rules are ceilings: the first rule (in ascending balance order) whose
/// balance is at least `token_balance` wins, so a balance equal to a
/// threshold falls into that lower tier. Balances above every threshold get
/// the highest rule's limit; no rules means no relays.
pub fn no_fee_campaign_limit(rules: &[RelayRule], token_balance: f64) -> u64 {
    let mut sorted: Vec<&RelayRule> = rules.iter().collect();
    sorted.sort_by(|a, b| a.balance.total_cmp(&b.balance));

    sorted
        .iter()
        .find(|rule| token_balance <= rule.balance)
        .or(sorted.last())
        .map_or(0, |rule| rule.limit)
}

/// The quota regime applying to a chain at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quota<'a> {
    /// No campaign: everyone gets the flat limit.
    Flat { limit: u64 },
    /// Campaign running: the limit depends on the token balance.
    Campaign(&'a NoFeeCampaign),
    /// Campaign configured but outside its window: nothing is relayed.
    CampaignInactive,
}

impl<'a> Quota<'a> {
    pub fn resolve(campaign: Option<&'a NoFeeCampaign>, flat_limit: u64, now: u64) -> Self {
        match campaign {
            None => Quota::Flat { limit: flat_limit },
            Some(campaign) if campaign.is_active(now) => Quota::Campaign(campaign),
            Some(_) => Quota::CampaignInactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<RelayRule> {
        vec![
            RelayRule { balance: 1000.0, limit: 20 },
            RelayRule { balance: 100.0, limit: 5 },
        ]
    }

    #[test]
    fn test_threshold_is_inclusive_ceiling() {
        assert_eq!(no_fee_campaign_limit(&rules(), 100.0), 5);
        assert_eq!(no_fee_campaign_limit(&rules(), 100.5), 20);
        assert_eq!(no_fee_campaign_limit(&rules(), 1000.0), 20);
    }

    #[test]
    fn test_zero_balance_gets_lowest_tier() {
        assert_eq!(no_fee_campaign_limit(&rules(), 0.0), 5);
    }

    #[test]
    fn test_above_all_thresholds_gets_highest_rule() {
        assert_eq!(no_fee_campaign_limit(&rules(), 1500.0), 20);
    }

    #[test]
    fn test_no_rules_means_no_relays() {
        assert_eq!(no_fee_campaign_limit(&[], 10.0), 0);
    }

    #[test]
    fn test_quota_resolution() {
        let campaign = NoFeeCampaign {
            starts_at_timestamp: 100,
            ends_at_timestamp: 200,
            safe_token_address: String::new(),
            relay_rules: rules(),
        };

        assert_eq!(Quota::resolve(None, 5, 150), Quota::Flat { limit: 5 });
        assert_eq!(Quota::resolve(Some(&campaign), 5, 150), Quota::Campaign(&campaign));
        assert_eq!(Quota::resolve(Some(&campaign), 5, 99), Quota::CampaignInactive);
        assert_eq!(Quota::resolve(Some(&campaign), 5, 201), Quota::CampaignInactive);
    }
}
