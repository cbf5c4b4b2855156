//! Sponsored relay provider client.
//!
//! # Responsibilities
//! - Submit sponsored calls to the provider's HTTP API
//! - Translate transport and HTTP failures into `RelayError`
//! - Skip the provider entirely while its circuit is open
//!
//! # Design Decisions
//! - Never retried: a relay spends gas, a retry could spend it twice
//! - 4xx responses are the caller's fault and do not trip the circuit

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::RelayProviderConfig;
use crate::relay::types::{RelayError, RelayResponse, RelayResult, SponsoredCall};
use crate::resilience::CircuitBreakerService;

/// Circuit guarding the relay provider.
pub const RELAY_PROVIDER_CIRCUIT: &str = "relay-provider";

/// Submits sponsored calls.
#[async_trait]
pub trait RelayApi: Send + Sync {
    async fn relay(&self, call: &SponsoredCall) -> RelayResult<RelayResponse>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsoredCallRequest<'a> {
    chain_id: &'a str,
    target: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_limit: Option<String>,
    sponsor_api_key: &'a str,
}

/// HTTP client for a Gelato-compatible sponsored call endpoint.
pub struct HttpRelayApi {
    client: reqwest::Client,
    config: RelayProviderConfig,
    circuits: Arc<CircuitBreakerService>,
}

impl HttpRelayApi {
    pub fn new(
        config: RelayProviderConfig,
        circuits: Arc<CircuitBreakerService>,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Provider(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            circuits,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/relays/v2/sponsored-call",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn submit(&self, call: &SponsoredCall) -> Result<RelayResponse, Failure> {
        let body = SponsoredCallRequest {
            chain_id: &call.chain_id,
            target: call.target.to_string(),
            data: call.data.to_string(),
            gas_limit: call.gas_limit.map(|gas| gas.to_string()),
            sponsor_api_key: &self.config.api_key,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Failure::Upstream(format!("provider returned {status}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Failure::Rejected(format!("provider returned {status}: {text}")));
        }

        response
            .json::<RelayResponse>()
            .await
            .map_err(|e| Failure::Upstream(format!("malformed provider response: {e}")))
    }
}

enum Failure {
    /// The provider misbehaved; counts against the circuit.
    Upstream(String),
    /// The provider refused this particular call.
    Rejected(String),
}

#[async_trait]
impl RelayApi for HttpRelayApi {
    async fn relay(&self, call: &SponsoredCall) -> RelayResult<RelayResponse> {
        let circuit = self
            .circuits
            .get_or_register_circuit(RELAY_PROVIDER_CIRCUIT, None);
        if !self.circuits.can_proceed(RELAY_PROVIDER_CIRCUIT) {
            tracing::warn!(chain_id = %call.chain_id, "Relay provider circuit open, refusing call");
            return Err(RelayError::ServiceUnavailable(
                "relay provider circuit is open".to_string(),
            ));
        }

        match self.submit(call).await {
            Ok(response) => {
                self.circuits.record_success(RELAY_PROVIDER_CIRCUIT);
                Ok(response)
            }
            Err(Failure::Rejected(message)) => {
                self.circuits.record_success(RELAY_PROVIDER_CIRCUIT);
                Err(RelayError::Provider(message))
            }
            Err(Failure::Upstream(message)) => {
                tracing::error!(chain_id = %call.chain_id, error = %message, "Relay provider failure");
                self.circuits.record_failure(&circuit);
                Err(RelayError::Provider(message))
            }
        }
    }
}
