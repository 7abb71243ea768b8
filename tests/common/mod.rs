//! Common test utilities
#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use handin::carrier::DhlClient;
use handin::channeldock::ChannelDockClient;
use handin::config::Config;
use handin::logging::{MemorySink, SharedSink};
use handin::workflow::HandInWorkflow;

pub const SHIPMENT_PATH: &str = "/cd/shipment";
pub const LOGIN_PATH: &str = "/dhl/api/user/login";
pub const SCAN_PATH: &str = "/dhl/servicepoint-api/customer/hand-in/validate";
pub const HANDIN_PATH: &str = "/dhl/servicepoint-api/customer/hand-in";

/// Config pointing both remote APIs at `uri`
pub fn test_config(uri: &str) -> Config {
    let mut config = Config::default();
    config.channeldock.base_url = format!("{uri}/cd/");
    config.channeldock.api_key = "cd-key".to_string();
    config.channeldock.api_secret = "cd-secret".to_string();
    config.carrier.base_url = format!("{uri}/dhl/");
    config.carrier.email = "ops@example.com".to_string();
    config.carrier.password = "hunter2".to_string();
    config.carrier.requests_per_second = 1000;
    config.http.request_timeout_secs = 5;
    config.workflow.seller_ids = vec![3477];
    config
}

pub fn channeldock(config: &Config, sink: Arc<MemorySink>) -> ChannelDockClient {
    ChannelDockClient::from_config(config, sink).unwrap()
}

pub fn dhl(config: &Config, sink: Arc<MemorySink>) -> DhlClient {
    DhlClient::from_config(config, sink).unwrap()
}

pub fn workflow(config: &Config, sink: Arc<MemorySink>) -> HandInWorkflow {
    let shared: SharedSink = sink;
    let source = ChannelDockClient::from_config(config, shared.clone()).unwrap();
    let carrier = DhlClient::from_config(config, shared.clone()).unwrap();
    HandInWorkflow::from_config(config, Arc::new(source), Arc::new(carrier), shared)
}

/// Listing page with one shipment per tracking code
pub fn shipments_body(codes: &[&str]) -> Value {
    let shipments: Vec<Value> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            json!({
                "id": 500 + i,
                "order_id": 1000 + i,
                "seller_id": 3477,
                "track_and_trace": code,
            })
        })
        .collect();

    json!({ "shipments": shipments, "shipments_count": codes.len() })
}

pub async fn mount_shipments(server: &MockServer, codes: &[&str]) {
    Mock::given(method("GET"))
        .and(path(SHIPMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shipments_body(codes)))
        .mount(server)
        .await;
}

/// Successful login setting a folded cookie header
pub fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "email": "ops@example.com" }))
        .append_header(
            "set-cookie",
            "XSRF-TOKEN=tok-123; Expires=Wed, 21 Oct 2099 07:28:00 GMT; Path=/, \
             dhl_session=sess-456; Path=/; HttpOnly",
        )
}

pub async fn mount_login_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(login_ok())
        .mount(server)
        .await;
}

pub async fn mount_scan_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SCAN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true })))
        .mount(server)
        .await;
}

pub async fn mount_handin_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(HANDIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "handin-1" })))
        .mount(server)
        .await;
}

/// JSON bodies of every request received on `request_path`
pub async fn bodies(server: &MockServer, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}
