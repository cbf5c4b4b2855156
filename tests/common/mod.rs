//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use safe_relay_gateway::clock::MockClock;
use safe_relay_gateway::config::{NoFeeCampaign, RelayConfig, RelayRule};
use safe_relay_gateway::relay::addresses::{createProxyWithNonceCall, execTransactionCall, setupCall};
use safe_relay_gateway::relay::{
    BalanceError, BalanceLookup, CounterKey, CounterNamespace, InMemoryRelayCounterStore,
    RelayApi, RelayCounterStore, RelayManager, RelayPayload, RelayResponse, RelayResult,
    SafeAddressResolver, SponsoredCall, StoreError, TokenBalance,
};

pub const NOW: u64 = 1_700_000_000;
pub const SAFE_TOKEN: &str = "0x5aFE3855358E112B5647B952709E6165e1c1eEEe";

/// In-memory counter store whose reads and writes can be made to fail.
#[derive(Debug, Clone)]
pub struct FlakyStore {
    pub inner: InMemoryRelayCounterStore,
    pub fail_reads: Arc<AtomicBool>,
    pub fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            inner: InMemoryRelayCounterStore::new(Arc::new(clock.clone())),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn count(&self, namespace: CounterNamespace, chain_id: &str, address: Address) -> u64 {
        self.inner
            .get_count(&CounterKey::new(namespace, chain_id, address))
            .await
            .unwrap()
    }

    pub async fn preset(&self, namespace: CounterNamespace, chain_id: &str, address: Address, count: u64) {
        self.inner
            .set_count(
                &CounterKey::new(namespace, chain_id, address),
                count,
                Duration::from_secs(3600),
            )
            .await
            .unwrap();
    }
}

#[async_trait]
impl RelayCounterStore for FlakyStore {
    async fn get_count(&self, key: &CounterKey) -> Result<u64, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        self.inner.get_count(key).await
    }

    async fn set_count(&self, key: &CounterKey, count: u64, ttl: Duration) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.inner.set_count(key, count, ttl).await
    }
}

/// Token balances per Safe in whole tokens (18 decimals); unknown Safes hold nothing.
#[derive(Debug, Default)]
pub struct FixedBalances {
    pub balances: HashMap<Address, f64>,
    pub fail: bool,
}

#[async_trait]
impl BalanceLookup for FixedBalances {
    async fn get_token_balance(
        &self,
        _chain_id: &str,
        safe_address: Address,
        _token_address: Address,
    ) -> Result<Option<TokenBalance>, BalanceError> {
        if self.fail {
            return Err(BalanceError::CircuitOpen("balances:1".to_string()));
        }
        let whole = self.balances.get(&safe_address).copied().unwrap_or(0.0);
        Ok(Some(TokenBalance {
            balance: U256::from(whole as u128) * U256::from(10u64).pow(U256::from(18)),
            decimals: 18,
        }))
    }
}

/// Relay API that records every call and answers with sequential task IDs.
#[derive(Debug, Default)]
pub struct RecordingRelayApi {
    pub calls: Mutex<Vec<SponsoredCall>>,
}

impl RecordingRelayApi {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RelayApi for RecordingRelayApi {
    async fn relay(&self, call: &SponsoredCall) -> RelayResult<RelayResponse> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call.clone());
        Ok(RelayResponse {
            task_id: format!("task-{}", calls.len()),
        })
    }
}

pub struct Harness {
    pub manager: Arc<RelayManager>,
    pub store: FlakyStore,
    pub api: Arc<RecordingRelayApi>,
    pub clock: MockClock,
}

pub fn harness(config: RelayConfig, balances: FixedBalances) -> Harness {
    let clock = MockClock::at_unix(NOW);
    let store = FlakyStore::new(&clock);
    let api = Arc::new(RecordingRelayApi::default());
    let manager = RelayManager::new(
        config,
        Arc::new(SafeAddressResolver),
        Arc::new(store.clone()),
        Arc::new(balances),
        api.clone(),
        Arc::new(clock.clone()),
    );
    Harness {
        manager: Arc::new(manager),
        store,
        api,
        clock,
    }
}

pub fn flat_config(limit: u64) -> RelayConfig {
    RelayConfig {
        limit,
        ..RelayConfig::default()
    }
}

/// Relay config with a campaign on chain "1" running for an hour either side of `NOW`.
pub fn campaign_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.no_fee_campaign.insert(
        "1".to_string(),
        NoFeeCampaign {
            starts_at_timestamp: NOW - 3600,
            ends_at_timestamp: NOW + 3600,
            safe_token_address: SAFE_TOKEN.to_string(),
            relay_rules: vec![
                RelayRule { balance: 100.0, limit: 5 },
                RelayRule { balance: 1000.0, limit: 20 },
            ],
        },
    );
    config
}

pub fn exec_transaction_data() -> Bytes {
    execTransactionCall {
        to: Address::repeat_byte(0x01),
        value: U256::ZERO,
        data: Bytes::new(),
        operation: 0,
        safeTxGas: U256::ZERO,
        baseGas: U256::ZERO,
        gasPrice: U256::ZERO,
        gasToken: Address::ZERO,
        refundReceiver: Address::ZERO,
        signatures: Bytes::from(vec![0u8; 65]),
    }
    .abi_encode()
    .into()
}

pub fn create_proxy_data(owners: Vec<Address>) -> Bytes {
    let initializer = setupCall {
        _owners: owners,
        _threshold: U256::from(1),
        to: Address::ZERO,
        data: Bytes::new(),
        fallbackHandler: Address::ZERO,
        paymentToken: Address::ZERO,
        payment: U256::ZERO,
        paymentReceiver: Address::ZERO,
    }
    .abi_encode();
    createProxyWithNonceCall {
        _singleton: Address::repeat_byte(0x77),
        initializer: initializer.into(),
        saltNonce: U256::from(1),
    }
    .abi_encode()
    .into()
}

pub fn exec_payload(chain_id: &str, safe: Address) -> RelayPayload {
    RelayPayload {
        chain_id: chain_id.to_string(),
        to: safe,
        data: exec_transaction_data(),
        gas_limit: None,
        version: "1.4.1".to_string(),
    }
}
