use std::time::UNIX_EPOCH;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::server::AppState;
use crate::resilience::{Circuit, CircuitState};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitStatus {
    pub name: String,
    pub state: String,
    pub failure_count: u32,
    pub success_count: u32,
    pub consecutive_successes: u32,
    /// Unix milliseconds.
    pub last_failure_time: Option<u64>,
    pub half_open_attempts: u32,
}

impl From<Circuit> for CircuitStatus {
    fn from(circuit: Circuit) -> Self {
        Self {
            name: circuit.name,
            state: circuit.state.as_str().to_string(),
            failure_count: circuit.failure_count,
            success_count: circuit.success_count,
            consecutive_successes: circuit.consecutive_successes,
            last_failure_time: circuit.last_failure_time.and_then(|time| {
                time.duration_since(UNIX_EPOCH)
                    .ok()
                    .and_then(|since| u64::try_from(since.as_millis()).ok())
            }),
            half_open_attempts: circuit.half_open_attempts,
        }
    }
}

pub async fn list_circuits(State(state): State<AppState>) -> Json<Vec<CircuitStatus>> {
    Json(state.circuits.list().into_iter().map(CircuitStatus::from).collect())
}

pub async fn get_circuit(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.circuits.get(&name) {
        Some(circuit) => Json(CircuitStatus::from(circuit)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("circuit {name} not found") })),
        )
            .into_response(),
    }
}

pub async fn delete_circuit(State(state): State<AppState>, Path(name): Path<String>) -> StatusCode {
    if state.circuits.delete(&name) {
        tracing::info!(circuit = %name, "Circuit reset by admin");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn delete_circuits(State(state): State<AppState>) -> StatusCode {
    let open = state
        .circuits
        .list()
        .iter()
        .filter(|circuit| circuit.state != CircuitState::Closed)
        .count();
    state.circuits.delete_all();
    tracing::info!(open, "All circuits reset by admin");
    StatusCode::NO_CONTENT
}
