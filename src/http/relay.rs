//! Relay endpoints.

use alloy::primitives::{Address, Bytes};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::response::bad_request;
use crate::http::server::AppState;
use crate::relay::RelayPayload;

/// Body of `POST /v1/chains/{chain_id}/relay`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub version: String,
    pub to: Address,
    pub data: Bytes,
    /// Decimal string, as sent by wallets.
    pub gas_limit: Option<String>,
}

fn parse_chain_id(chain_id: &str) -> Result<(), Response> {
    chain_id
        .parse::<u64>()
        .map(|_| ())
        .map_err(|_| bad_request(format!("invalid chain ID: {chain_id}")))
}

pub async fn relay(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
    Json(request): Json<RelayRequest>,
) -> Response {
    if let Err(response) = parse_chain_id(&chain_id) {
        return response;
    }

    let gas_limit = match request.gas_limit.as_deref().map(str::parse::<u64>) {
        None => None,
        Some(Ok(gas)) => Some(gas),
        Some(Err(_)) => return bad_request("gasLimit must be a decimal integer"),
    };

    let payload = RelayPayload {
        chain_id,
        to: request.to,
        data: request.data,
        gas_limit,
        version: request.version,
    };

    match state.relay.relay(payload).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_relays_remaining(
    State(state): State<AppState>,
    Path((chain_id, safe_address)): Path<(String, String)>,
) -> Response {
    if let Err(response) = parse_chain_id(&chain_id) {
        return response;
    }
    let Ok(address) = safe_address.parse::<Address>() else {
        return bad_request(format!("invalid Safe address: {safe_address}"));
    };

    match state.relay.get_relays_remaining(&chain_id, address).await {
        Ok(remaining) => (StatusCode::OK, Json(remaining)).into_response(),
        Err(e) => e.into_response(),
    }
}
