//! Resolution of the addresses a relay request is rate-limited against.
//!
//! | Calldata                                   | Limited addresses          |
//! |--------------------------------------------|----------------------------|
//! | `execTransaction` on a Safe                | the Safe (`to`)            |
//! | `multiSend` of `execTransaction`s          | the Safe they all target   |
//! | `createProxyWithNonce` + `setup` initializer | every owner of the new Safe |
//!
//! Anything else is not sponsored.

use std::collections::HashSet;

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::relay::types::{RelayError, RelayPayload, RelayResult};

sol! {
    function execTransaction(
        address to,
        uint256 value,
        bytes data,
        uint8 operation,
        uint256 safeTxGas,
        uint256 baseGas,
        uint256 gasPrice,
        address gasToken,
        address refundReceiver,
        bytes signatures
    ) external payable returns (bool success);

    function multiSend(bytes transactions) external payable;

    function createProxyWithNonce(
        address _singleton,
        bytes initializer,
        uint256 saltNonce
    ) external returns (address proxy);

    function setup(
        address[] _owners,
        uint256 _threshold,
        address to,
        bytes data,
        address fallbackHandler,
        address paymentToken,
        uint256 payment,
        address paymentReceiver
    ) external;
}

/// Produces the non-empty list of addresses to rate-limit for a payload.
pub trait AddressResolver: Send + Sync {
    fn resolve(&self, payload: &RelayPayload) -> RelayResult<Vec<Address>>;
}

/// Resolver for Safe transactions, batches and deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeAddressResolver;

impl AddressResolver for SafeAddressResolver {
    fn resolve(&self, payload: &RelayPayload) -> RelayResult<Vec<Address>> {
        let data = payload.data.as_ref();
        let Some(selector) = data.get(..4) else {
            return Err(RelayError::UnsupportedTransaction(
                "calldata has no function selector".to_string(),
            ));
        };

        if selector == execTransactionCall::SELECTOR {
            decode::<execTransactionCall>(data)?;
            Ok(vec![payload.to])
        } else if selector == multiSendCall::SELECTOR {
            let call = decode::<multiSendCall>(data)?;
            multi_send_safe(&call.transactions).map(|safe| vec![safe])
        } else if selector == createProxyWithNonceCall::SELECTOR {
            let call = decode::<createProxyWithNonceCall>(data)?;
            setup_owners(&call.initializer)
        } else {
            Err(RelayError::UnsupportedTransaction(format!(
                "unknown function selector 0x{}",
                alloy::primitives::hex::encode(selector)
            )))
        }
    }
}

fn decode<C: SolCall>(data: &[u8]) -> RelayResult<C> {
    C::abi_decode(data).map_err(|e| {
        RelayError::InvalidPayload(format!("cannot decode {}: {}", C::SIGNATURE, e))
    })
}

/// One packed MultiSend entry: `operation ‖ to ‖ value ‖ dataLength ‖ data`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MultiSendEntry<'a> {
    operation: u8,
    to: Address,
    data: &'a [u8],
}

fn parse_multi_send(mut packed: &[u8]) -> RelayResult<Vec<MultiSendEntry<'_>>> {
    const HEADER_LEN: usize = 1 + 20 + 32 + 32;

    let mut entries = Vec::new();
    while !packed.is_empty() {
        if packed.len() < HEADER_LEN {
            return Err(RelayError::InvalidPayload(
                "truncated multiSend transaction header".to_string(),
            ));
        }
        let operation = packed[0];
        let to = Address::from_slice(&packed[1..21]);
        let data_len = U256::from_be_slice(&packed[53..85]);
        let data_len = usize::try_from(data_len)
            .ok()
            .filter(|len| *len <= packed.len() - HEADER_LEN)
            .ok_or_else(|| {
                RelayError::InvalidPayload("multiSend data length out of bounds".to_string())
            })?;

        let end = HEADER_LEN + data_len;
        entries.push(MultiSendEntry {
            operation,
            to,
            data: &packed[HEADER_LEN..end],
        });
        packed = &packed[end..];
    }
    Ok(entries)
}

/// The single Safe targeted by a batch of `execTransaction` calls.
fn multi_send_safe(packed: &[u8]) -> RelayResult<Address> {
    let entries = parse_multi_send(packed)?;
    let Some(first) = entries.first() else {
        return Err(RelayError::UnsupportedTransaction(
            "empty multiSend batch".to_string(),
        ));
    };

    for entry in &entries {
        if entry.to != first.to {
            return Err(RelayError::UnsupportedTransaction(
                "multiSend batch targets more than one Safe".to_string(),
            ));
        }
        if entry.data.get(..4) != Some(execTransactionCall::SELECTOR.as_slice()) {
            return Err(RelayError::UnsupportedTransaction(
                "multiSend batch contains a call that is not execTransaction".to_string(),
            ));
        }
        decode::<execTransactionCall>(entry.data)?;
    }

    tracing::trace!(safe = %first.to, operation = first.operation, batch = entries.len(), "Resolved multiSend batch");
    Ok(first.to)
}

fn setup_owners(initializer: &[u8]) -> RelayResult<Vec<Address>> {
    if initializer.get(..4) != Some(setupCall::SELECTOR.as_slice()) {
        return Err(RelayError::UnsupportedTransaction(
            "proxy initializer is not a Safe setup call".to_string(),
        ));
    }
    let setup = decode::<setupCall>(initializer)?;
    if setup._owners.is_empty() {
        return Err(RelayError::UnsupportedTransaction(
            "Safe setup has no owners".to_string(),
        ));
    }
    // Safe setup reverts on repeated owners.
    let mut seen = HashSet::with_capacity(setup._owners.len());
    if !setup._owners.iter().all(|owner| seen.insert(*owner)) {
        return Err(RelayError::UnsupportedTransaction(
            "Safe setup has duplicate owners".to_string(),
        ));
    }
    Ok(setup._owners)
}
