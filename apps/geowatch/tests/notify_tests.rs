//! Integration tests for the Twilio notification sink.
//!
//! Uses wiremock to stand in for the Twilio Messages API.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum_test::TestServer;
use geowatch::api::{AppState, create_router};
use geowatch::config::{Config, TwilioConfig};
use geowatch::notify::{DeliveryId, NotificationSink, NotifyError, TwilioSink};
use geowatch_core::{AuthorizationSet, Coordinate, ReferencePoint};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn twilio_config(api_base: String) -> TwilioConfig {
    TwilioConfig {
        account_sid: "AC123".to_string(),
        auth_token: "secret".to_string(),
        from: "whatsapp:+14155238886".to_string(),
        to: "whatsapp:+27820000000".to_string(),
        api_base,
    }
}

/// Poll until the mock server has seen `n` requests.
async fn wait_for_requests(server: &MockServer, n: usize) -> bool {
    for _ in 0..50 {
        let seen = server.received_requests().await.map(|r| r.len()).unwrap_or(0);
        if seen >= n {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// =============================================================================
// SINK TESTS
// =============================================================================

#[tokio::test]
async fn test_send_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(header("authorization", "Basic QUMxMjM6c2VjcmV0"))
        .and(body_string_contains("To=whatsapp%3A%2B27820000000"))
        .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
        .and(body_string_contains("Body=Alert"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"sid": "SM42", "status": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = TwilioSink::new(&twilio_config(server.uri())).unwrap();
    let id = sink
        .send("Alert: alice has entered the geofence", "whatsapp:+27820000000")
        .await
        .unwrap();

    assert_eq!(id, DeliveryId("SM42".to_string()));
}

#[tokio::test]
async fn test_provider_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number.",
            "status": 400
        })))
        .mount(&server)
        .await;

    let sink = TwilioSink::new(&twilio_config(server.uri())).unwrap();
    let err = sink.send("hello", "bogus").await.unwrap_err();

    match err {
        NotifyError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("not a valid phone number"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let sink = TwilioSink::new(&twilio_config(server.uri())).unwrap();
    let err = sink.send("hello", "+1").await.unwrap_err();

    assert!(matches!(
        err,
        NotifyError::Rejected { status: 503, ref message } if message == "unavailable"
    ));
}

// =============================================================================
// END-TO-END
// =============================================================================

fn config_for(server: &MockServer) -> Config {
    let origin = Coordinate::new(0.0, 0.0).unwrap();
    let mut config = Config::new(
        ReferencePoint::new(origin, 50.0).unwrap(),
        AuthorizationSet::parse("alice").unwrap(),
    );
    config.twilio = Some(twilio_config(server.uri()));
    config.notify_timeout = Duration::from_secs(2);
    config
}

#[tokio::test]
async fn test_entry_sends_exactly_one_message() {
    let twilio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(body_string_contains("UNAUTHORIZED"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
        .mount(&twilio)
        .await;

    let state = Arc::new(AppState::from_config(&config_for(&twilio)).unwrap());
    let app = TestServer::new(create_router(state)).unwrap();

    for _ in 0..3 {
        app.post("/location")
            .json(&json!({"tag": "mallory", "lat": 0.0, "lon": 0.0}))
            .await
            .assert_status_ok();
    }

    assert!(wait_for_requests(&twilio, 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(twilio.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sink_outage_does_not_fail_reports() {
    let twilio = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&twilio)
        .await;

    let state = Arc::new(AppState::from_config(&config_for(&twilio)).unwrap());
    let app = TestServer::new(create_router(state.clone())).unwrap();

    app.post("/location")
        .json(&json!({"tag": "alice", "lat": 0.0, "lon": 0.0}))
        .await
        .assert_status_ok();
    assert!(wait_for_requests(&twilio, 1).await);

    // State is not rolled back and the next inside report stays silent.
    assert_eq!(state.tracker.is_inside("alice"), Some(true));
    app.post("/location")
        .json(&json!({"tag": "alice", "lat": 0.0, "lon": 0.0}))
        .await
        .assert_status_ok();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(twilio.received_requests().await.unwrap().len(), 1);
}
