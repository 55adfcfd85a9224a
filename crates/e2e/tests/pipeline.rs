//! Observation pipeline tests
//!
//! Feeds synthetic response streams through a session, then exercises the
//! latency and contract paths the way a probe run does after the interaction
//! has completed.

use netprobe_common::{is_authorized, validate, ImageMetadata, Provider, ViolationKind};
use netprobe_e2e::{
    E2eError, EventClassifier, HostEvent, ObservationRule, ObservationSession, ResponseEvent,
};
use serde_json::json;
use tokio::sync::mpsc;

fn rules() -> Vec<ObservationRule> {
    vec![
        ObservationRule::contains("/api/chat", "chat_latency"),
        ObservationRule::contains("/api/images", "image_generation_latency"),
        ObservationRule::contains("/api/", "api_latency"),
    ]
}

async fn run_stream(events: Vec<HostEvent>) -> ObservationSession {
    let mut session = ObservationSession::new(EventClassifier::from_rules(&rules()).unwrap());
    let (tx, rx) = mpsc::channel(16);
    let handle = session.attach(rx).unwrap();
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    handle.finished().await.unwrap();
    session
}

fn response(url: &str, ms: f64) -> HostEvent {
    HostEvent::Response(ResponseEvent::new(url).with_timing(ms))
}

#[tokio::test]
async fn overlapping_rules_write_lowest_indexed_channel() {
    let session = run_stream(vec![response("https://app.test/api/chat/stream", 730.0)]).await;

    assert_eq!(session.ledger().sample("chat_latency"), Some(730.0));
    assert!(!session.ledger().contains("api_latency"));
}

#[tokio::test]
async fn unobserved_channel_reads_zero_and_passes() {
    let session = run_stream(vec![response("https://app.test/api/chat", 100.0)]).await;

    assert_eq!(session.get_latency("image_generation_latency"), 0.0);
    for budget in [0.0, 1.0, 5000.0] {
        assert!(session
            .assert_latency_within("image_generation_latency", budget)
            .is_ok());
    }
}

#[tokio::test]
async fn budget_boundary() {
    let session = run_stream(vec![response("https://app.test/api/images", 4200.0)]).await;

    assert!(session
        .assert_latency_within("image_generation_latency", 4200.0)
        .is_ok());

    let violation = session
        .assert_latency_within("image_generation_latency", 4199.0)
        .unwrap_err();
    assert_eq!(violation.channel, "image_generation_latency");
    assert_eq!(violation.observed_ms, 4200.0);
    assert_eq!(violation.budget_ms, 4199.0);
    assert!(violation.to_string().contains("image_generation_latency"));
}

#[tokio::test]
async fn nan_budget_is_never_met() {
    let session = run_stream(vec![response("https://app.test/api/chat", 5000.0)]).await;

    assert!(session.assert_latency_within("chat_latency", f64::NAN).is_err());
}

#[tokio::test]
async fn repeated_reads_are_stable() {
    let session = run_stream(vec![response("https://app.test/api/chat", 321.0)]).await;

    let first = session.get_latency("chat_latency");
    for _ in 0..5 {
        assert_eq!(session.get_latency("chat_latency"), first);
    }
}

#[tokio::test]
async fn later_delivery_overwrites_even_if_stale() {
    // Delivery order decides, not request order.
    let session = run_stream(vec![
        response("https://app.test/api/chat?req=2", 150.0),
        response("https://app.test/api/chat?req=1", 900.0),
    ])
    .await;

    assert_eq!(session.get_latency("chat_latency"), 900.0);
}

#[tokio::test]
async fn untimed_match_is_distinct_from_never_observed() {
    let session = run_stream(vec![HostEvent::Response(ResponseEvent::new(
        "https://app.test/api/images",
    ))])
    .await;

    assert_eq!(session.get_latency("image_generation_latency"), 0.0);
    assert!(session.ledger().contains("image_generation_latency"));
    assert!(!session.ledger().contains("chat_latency"));
}

#[tokio::test]
async fn sessions_do_not_share_ledgers() {
    let first = run_stream(vec![response("https://app.test/api/chat", 999.0)]).await;
    let second = run_stream(vec![]).await;

    assert_eq!(first.get_latency("chat_latency"), 999.0);
    assert!(second.ledger().is_empty());
}

#[tokio::test]
async fn classifier_attaches_once() {
    let mut session = ObservationSession::new(EventClassifier::from_rules(&rules()).unwrap());
    let (_tx, rx) = mpsc::channel(1);
    let _handle = session.attach(rx).unwrap();
    let (_tx2, rx2) = mpsc::channel(1);
    assert!(matches!(session.attach(rx2), Err(E2eError::AlreadyAttached)));
}

#[test]
fn minimal_payload_validates_with_defaults() {
    let entity = validate(&json!({"id": "x", "url": "y", "provider": "openai"})).unwrap();
    assert_eq!(entity.generation_time(), 0.0);
    assert_eq!(*entity.metadata(), ImageMetadata::default());
}

#[test]
fn missing_provider_is_named() {
    let err = validate(&json!({"id": "x", "url": "y"})).unwrap_err();
    assert_eq!(err.field, "provider");
    assert_eq!(err.kind, ViolationKind::Missing);
}

#[test]
fn unknown_provider_is_out_of_domain() {
    let err = validate(&json!({"id": "x", "url": "y", "provider": "unknown-vendor"})).unwrap_err();
    assert_eq!(err.field, "provider");
    assert!(matches!(err.kind, ViolationKind::OutOfDomain { .. }));
}

#[test]
fn only_whitelisted_providers_are_authorized() {
    for provider in Provider::ALL {
        let entity =
            validate(&json!({"id": "x", "url": "y", "provider": provider.as_str()})).unwrap();
        let expected = matches!(provider, Provider::OpenAi | Provider::StabilityAi);
        assert_eq!(is_authorized(&entity), expected, "provider {}", provider);
    }
}

#[test]
fn revalidation_of_raw_form_is_equal() {
    let entity = validate(&json!({
        "id": "img_9",
        "url": "https://cdn.test/img_9.webp",
        "provider": "stability-ai",
        "generationTime": 8123,
        "metadata": {"width": 768, "height": 512, "quality": "hd"},
    }))
    .unwrap();
    assert_eq!(validate(&entity.to_raw()).unwrap(), entity);
}
