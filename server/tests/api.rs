mod harness;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use flightsurety_oracle_server::app_state::AppState;
use flightsurety_oracle_server::chain::{ChainClient, ContractMethod};
use flightsurety_oracle_server::models::IndexTriple;
use flightsurety_oracle_server::routes::app_router;
use flightsurety_oracle_server::services::OracleRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

use harness::{account, ChainOp, FakeChain};

fn app(chain: Arc<FakeChain>) -> axum::Router {
    let mut registry = OracleRegistry::new();
    registry.register(account(20), IndexTriple([1, 2, 3])).unwrap();
    registry.register(account(21), IndexTriple([4, 5, 6])).unwrap();
    let chain: Arc<dyn ChainClient> = chain;
    app_router(AppState::new(chain, Arc::new(registry), account(0)))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn api_banner_matches_the_dapp_contract() {
    let response = app(Arc::new(FakeChain::new(0, &[])))
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "An API for use with your Dapp!" })
    );
}

#[tokio::test]
async fn lists_registered_oracles() {
    let response = app(Arc::new(FakeChain::new(0, &[])))
        .oneshot(Request::builder().uri("/api/oracles").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    let oracles = body["data"].as_array().unwrap();
    assert_eq!(oracles.len(), 2);
    assert_eq!(oracles[1]["indexes"], json!([4, 5, 6]));
}

#[tokio::test]
async fn reports_operational_status() {
    let response = app(Arc::new(FakeChain::new(0, &[])))
        .oneshot(Request::builder().uri("/api/operational").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!(true));
}

#[tokio::test]
async fn fetch_flight_status_is_sent_by_the_owner() {
    let chain = Arc::new(FakeChain::new(0, &[]));
    let airline = account(1);
    let request = Request::builder()
        .method("POST")
        .uri("/api/flights/status")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "airline": airline, "flight": "ND1309", "timestamp": 1_700_000_000u64 }).to_string(),
        ))
        .unwrap();

    let response = app(chain.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["flight"], json!("ND1309"));
    assert!(chain.ops().iter().any(|op| matches!(
        op,
        ChainOp::Send { from, method: ContractMethod::FetchFlightStatus { flight, .. }, .. }
            if *from == account(0) && flight == "ND1309"
    )));
}

#[tokio::test]
async fn empty_flight_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/flights/status")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "airline": account(1), "flight": " ", "timestamp": 1u64 }).to_string(),
        ))
        .unwrap();

    let response = app(Arc::new(FakeChain::new(0, &[]))).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], json!(false));
}
