//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{FixedOffset, Utc};
use common::{EventId, Money, PaymentId, TicketNumber, TransactionStatus, UserId};
use gateway::InMemoryGateway;
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{Collaborators, InMemoryNotifier};
use store::{Country, Event, InMemoryProfileCache, InMemoryStore, Reservation, UserProfile};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const USER: &str = "user-1";
const EVENT: &str = "EVT-1";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    store: InMemoryStore,
    gateway: InMemoryGateway,
    notifier: InMemoryNotifier,
}

fn reservation(ticket: &str) -> Reservation {
    Reservation {
        ticket_number: TicketNumber::new(ticket),
        event_id: EventId::new(EVENT),
        ticket_id: "TKT-CAT1".to_string(),
        ticket_type: "CAT 1".to_string(),
        seat_number: 7,
        price: Money::from_rupiah(500_000),
        user_id: UserId::new(USER),
        queue_id: "Q-1".to_string(),
        country_code: "ID".to_string(),
        payment_status: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn setup() -> TestApp {
    let profile = UserProfile {
        user_id: UserId::new(USER),
        full_name: "Siti Rahma".to_string(),
        email: "siti@example.com".to_string(),
        mobile_number: "081234567890".to_string(),
    };

    let store = InMemoryStore::new();
    for ticket in ["TIX-1", "TIX-2", "TIX-3"] {
        store.insert_reservation(reservation(ticket)).await;
    }
    store
        .insert_event(Event {
            event_id: EventId::new(EVENT),
            name: "Jazz Night".to_string(),
            date_time: Utc::now(),
            country: Country {
                name: "Indonesia".to_string(),
                code: "ID".to_string(),
                city: "Jakarta".to_string(),
                place: "JIExpo".to_string(),
            },
            description: String::new(),
            tag: "jazz".to_string(),
        })
        .await;
    store.insert_user(profile.clone()).await;

    let cache = InMemoryProfileCache::new();
    cache.insert_profile(&profile);
    let gateway = InMemoryGateway::new();
    let notifier = InMemoryNotifier::new();

    let deps = Collaborators::from_store(
        store.clone(),
        Arc::new(cache),
        Arc::new(gateway.clone()),
        Arc::new(notifier.clone()),
    );
    let offset = FixedOffset::east_opt(7 * 3600).unwrap();
    let state = Arc::new(api::AppState::new(deps, "concert-send-email-pdf", offset));

    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        store,
        gateway,
        notifier,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn save(ticket: &str, bank: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payment/v1/save")
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let body = serde_json::json!({
        "ticket_number": ticket,
        "event_id": EVENT,
        "payment_type": bank,
    });
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_payment(app: &Router, ticket: &str) -> PaymentId {
    let (status, json) = send(app, save(ticket, "bca", Some(USER))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["payment_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let (status, json) = send(&t.app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;
    create_payment(&t.app, "TIX-1").await;

    let response = t.app.clone().oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("payment_intents_created_total"));
}

#[tokio::test]
async fn test_save_creates_pending_payment() {
    let t = setup().await;

    let (status, json) = send(&t.app, save("TIX-1", "bca", Some(USER))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "payment created");
    assert_eq!(json["data"]["transaction_status"], "pending");
    assert!(json.get("meta").is_none());
    assert_eq!(t.store.intents().await.len(), 1);
}

#[tokio::test]
async fn test_save_without_user_is_unauthorized() {
    let t = setup().await;

    let (status, json) = send(&t.app, save("TIX-1", "bca", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");
    assert_eq!(t.gateway.charge_calls(), 0);
}

#[tokio::test]
async fn test_save_with_unknown_bank_is_bad_request() {
    let t = setup().await;

    let (status, json) = send(&t.app, save("TIX-1", "gopay", Some(USER))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
    assert_eq!(t.gateway.charge_calls(), 0);
}

#[tokio::test]
async fn test_save_with_blank_ticket_is_bad_request() {
    let t = setup().await;

    let (status, _) = send(&t.app, save("  ", "bca", Some(USER))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_for_other_users_reservation_is_forbidden() {
    let t = setup().await;

    let (status, json) = send(&t.app, save("TIX-1", "bca", Some("intruder"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");
}

#[tokio::test]
async fn test_save_unknown_reservation_is_not_found() {
    let t = setup().await;

    let (status, json) = send(&t.app, save("TIX-404", "bca", Some(USER))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_second_save_for_same_ticket_conflicts() {
    let t = setup().await;
    create_payment(&t.app, "TIX-1").await;

    let (status, json) = send(&t.app, save("TIX-1", "bni", Some(USER))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");
    assert_eq!(t.gateway.charge_calls(), 1);
}

#[tokio::test]
async fn test_status_reports_live_gateway_status() {
    let t = setup().await;
    let payment_id = create_payment(&t.app, "TIX-1").await;
    t.gateway
        .set_status(payment_id, TransactionStatus::Settlement)
        .await;

    let uri = format!("/api/payment/v1/status?payment_id={payment_id}");
    let (status, json) = send(&t.app, get(&uri, Some(USER))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["payment_status"], "settlement");
    assert_eq!(json["data"]["ticket_number"], "TIX-1");
    assert_eq!(json["data"]["bank"], "bca");
}

#[tokio::test]
async fn test_status_with_invalid_payment_id_is_bad_request() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        get("/api/payment/v1/status?payment_id=not-a-uuid", Some(USER)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
}

#[tokio::test]
async fn test_status_for_unknown_payment_is_not_found() {
    let t = setup().await;

    let uri = format!("/api/payment/v1/status?payment_id={}", PaymentId::new());
    let (status, _) = send(&t.app, get(&uri, Some(USER))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_status_shows_deadline_while_pending() {
    let t = setup().await;
    let payment_id = create_payment(&t.app, "TIX-1").await;

    let uri = format!("/api/payment/v1/order-status?payment_id={payment_id}");
    let (status, json) = send(&t.app, get(&uri, Some(USER))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["full_name"], "Siti Rahma");
    assert_eq!(json["data"]["event_name"], "Jazz Night");
    assert_eq!(json["data"]["place"], "JIExpo");
    assert!(json["data"]["max_wait_time"].is_string());
}

#[tokio::test]
async fn test_order_status_for_other_user_is_bad_request() {
    let t = setup().await;
    let payment_id = create_payment(&t.app, "TIX-1").await;

    let uri = format!("/api/payment/v1/order-status?payment_id={payment_id}");
    let (status, _) = send(&t.app, get(&uri, Some("someone-else"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_returns_meta() {
    let t = setup().await;
    for ticket in ["TIX-1", "TIX-2", "TIX-3"] {
        create_payment(&t.app, ticket).await;
    }

    let (status, json) = send(
        &t.app,
        get("/api/payment/v1/list?page=2&size=2", Some(USER)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["page"], 2);
    assert_eq!(json["meta"]["count"], 1);
    assert_eq!(json["meta"]["total_page"], 2);
    assert_eq!(json["meta"]["total_data"], 3);
}

#[tokio::test]
async fn test_list_defaults_to_first_page() {
    let t = setup().await;
    create_payment(&t.app, "TIX-1").await;

    let (status, json) = send(&t.app, get("/api/payment/v1/list", Some(USER))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["page"], 1);
    assert_eq!(json["meta"]["total_data"], 1);
}

#[tokio::test]
async fn test_list_rejects_page_zero() {
    let t = setup().await;

    let (status, _) = send(&t.app, get("/api/payment/v1/list?page=0", Some(USER))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_finalizes_settled_payment() {
    let t = setup().await;
    let payment_id = create_payment(&t.app, "TIX-1").await;
    t.gateway
        .set_status(payment_id, TransactionStatus::Settlement)
        .await;

    let uri = format!("/api/payment/v1/callback/{payment_id}");
    let (status, json) = send(&t.app, get(&uri, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "order created");
    assert_eq!(json["data"]["payment_id"], payment_id.to_string());
    assert_eq!(t.store.orders().await.len(), 1);
    assert_eq!(t.notifier.messages().len(), 1);

    let (repeat, _) = send(&t.app, get(&uri, None)).await;
    assert_eq!(repeat, StatusCode::CONFLICT);
    assert_eq!(t.store.orders().await.len(), 1);
}

#[tokio::test]
async fn test_callback_while_pending_conflicts() {
    let t = setup().await;
    let payment_id = create_payment(&t.app, "TIX-1").await;

    let uri = format!("/api/payment/v1/callback/{payment_id}");
    let (status, _) = send(&t.app, get(&uri, None)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(t.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_gateway_failure_is_internal_error() {
    let t = setup().await;
    t.gateway.set_fail_on_charge(true);

    let (status, json) = send(&t.app, save("TIX-1", "bca", Some(USER))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "internal");
    assert!(t.store.intents().await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_structured_bad_request() {
    let t = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/v1/save")
        .header("content-type", "application/json")
        .header("x-user-id", USER)
        .body(Body::from("{\"ticket_number\": "))
        .unwrap();

    let (status, json) = send(&t.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
    assert!(json["message"].is_string());
    assert_eq!(t.gateway.charge_calls(), 0);
}

#[tokio::test]
async fn test_unparseable_query_is_structured_bad_request() {
    let t = setup().await;

    let (status, json) = send(&t.app, get("/api/payment/v1/list?page=abc", Some(USER))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");

    let (status, json) = send(&t.app, get("/api/payment/v1/status", Some(USER))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
}

#[tokio::test]
async fn test_list_rejects_unaddressable_page() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        get("/api/payment/v1/list?page=18446744073709551615", Some(USER)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
}
