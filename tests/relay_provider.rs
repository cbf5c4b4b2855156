//! Relay provider client against a mocked provider.
//!
//! Uses `wiremock` for the sponsored call endpoint.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use safe_relay_gateway::clock::MockClock;
use safe_relay_gateway::config::{CircuitBreakerConfig, RelayProviderConfig};
use safe_relay_gateway::relay::{
    HttpRelayApi, RelayApi, RelayError, SponsoredCall, RELAY_PROVIDER_CIRCUIT,
};
use safe_relay_gateway::resilience::{CircuitBreakerService, CircuitState};

fn circuits(failure_threshold: u32) -> Arc<CircuitBreakerService> {
    Arc::new(CircuitBreakerService::new(
        CircuitBreakerConfig {
            failure_threshold,
            ..CircuitBreakerConfig::default()
        },
        Arc::new(MockClock::at_unix(1_700_000_000)),
    ))
}

fn api(server: &MockServer, circuits: Arc<CircuitBreakerService>) -> HttpRelayApi {
    HttpRelayApi::new(
        RelayProviderConfig {
            base_url: server.uri(),
            api_key: "sponsor-key".to_string(),
            timeout_secs: 5,
        },
        circuits,
    )
    .unwrap()
}

fn call() -> SponsoredCall {
    SponsoredCall {
        chain_id: "1".to_string(),
        target: Address::repeat_byte(0x5a),
        data: Bytes::from(vec![0x6a, 0x76, 0x12, 0x02]),
        gas_limit: Some(250_000),
    }
}

#[tokio::test]
async fn test_sponsored_call_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/relays/v2/sponsored-call"))
        .and(body_partial_json(json!({
            "chainId": "1",
            "data": "0x6a761202",
            "gasLimit": "250000",
            "sponsorApiKey": "sponsor-key",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "taskId": "0xtask" })))
        .expect(1)
        .mount(&server)
        .await;

    let circuits = circuits(5);
    let response = api(&server, circuits.clone()).relay(&call()).await.unwrap();

    assert_eq!(response.task_id, "0xtask");
    assert_eq!(circuits.get(RELAY_PROVIDER_CIRCUIT).unwrap().failure_count, 0);
}

#[tokio::test]
async fn test_server_errors_open_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let circuits = circuits(2);
    let api = api(&server, circuits.clone());

    for _ in 0..2 {
        let err = api.relay(&call()).await.unwrap_err();
        assert!(matches!(err, RelayError::Provider(_)));
    }
    assert_eq!(
        circuits.get(RELAY_PROVIDER_CIRCUIT).unwrap().state,
        CircuitState::Open
    );

    // Refused locally: the mock expects exactly two requests.
    let err = api.relay(&call()).await.unwrap_err();
    assert!(matches!(err, RelayError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_client_errors_do_not_trip_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid target"))
        .mount(&server)
        .await;

    let circuits = circuits(1);
    let err = api(&server, circuits.clone()).relay(&call()).await.unwrap_err();

    match err {
        RelayError::Provider(message) => assert!(message.contains("invalid target")),
        other => panic!("expected Provider, got {other:?}"),
    }
    assert_eq!(
        circuits.get(RELAY_PROVIDER_CIRCUIT).unwrap().state,
        CircuitState::Closed
    );
}

#[tokio::test]
async fn test_malformed_response_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let circuits = circuits(1);
    let err = api(&server, circuits.clone()).relay(&call()).await.unwrap_err();

    assert!(matches!(err, RelayError::Provider(_)));
    assert_eq!(
        circuits.get(RELAY_PROVIDER_CIRCUIT).unwrap().state,
        CircuitState::Open
    );
}
