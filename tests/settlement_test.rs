//! Integration tests for payment initiation against a mocked PSP and for
//! webhook-driven settlement reconciliation.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use hmac::{Hmac, Mac};
use pix_checkout_api::entities::Transaction;
use sea_orm::EntityTrait;
use serde_json::json;
use sha2::Sha256;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PIX_TOKEN: &str = "00020126580014br.gov.bcb.pix";

async fn app_with_psp(server: &MockServer) -> TestApp {
    let endpoint = format!("{}/charges", server.uri());
    TestApp::with_config(move |cfg| cfg.psp_endpoint = endpoint).await
}

/// Open a session on a seeded product, fill in the buyer, and return the
/// session id.
async fn ready_session(app: &TestApp) -> String {
    app.seed_product("curso", 19700, json!([]), json!([])).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/sessions",
            Some(json!({"product": "curso"})),
        )
        .await;
    let body = response_json(response).await;
    let session_id = body["data"]["session"]["id"].as_str().unwrap().to_string();

    app.request(
        Method::PUT,
        &format!("/api/v1/checkout/sessions/{}/customer", session_id),
        Some(json!({"name": "Maria Silva", "phone": "11999990000"})),
    )
    .await;

    session_id
}

#[tokio::test]
async fn successful_initiation_returns_pending_intent_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .and(header("authorization", "Bearer test_psp_key"))
        .and(body_partial_json(json!({
            "value": 19700,
            "customer": {"document": "12345678901"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionId": "T1",
            "pix_code": PIX_TOKEN
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "12345678901"})),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["pix_code"], PIX_TOKEN);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "pending");
    assert_eq!(rows[0].gateway_transaction_id.as_deref(), Some("T1"));
    assert_eq!(rows[0].amount, 19700);
}

#[tokio::test]
async fn double_submit_reuses_the_open_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionId": "T1",
            "pix_code": PIX_TOKEN
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;
    let uri = format!("/api/v1/checkout/sessions/{}/pay", session_id);
    let payload = json!({"document": "12345678901"});

    let first = response_json(app.request(Method::POST, &uri, Some(payload.clone())).await).await;
    let second = response_json(app.request(Method::POST, &uri, Some(payload)).await).await;

    assert_eq!(first["data"]["transaction_id"], second["data"]["transaction_id"]);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn psp_failure_settles_the_row_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "12345678901"})),
        )
        .await;
    assert_eq!(response.status(), 502);

    // The attempt is still on the ledger, settled rejected.
    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "rejected");
}

#[tokio::test]
async fn accepted_response_without_token_is_a_gateway_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transactionId": "T1"})))
        .mount(&server)
        .await;

    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "12345678901"})),
        )
        .await;
    assert_eq!(response.status(), 502);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows[0].status, "rejected");
}

#[tokio::test]
async fn invalid_document_is_rejected_before_any_row_exists() {
    let server = MockServer::start().await;
    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;

    // Ten digits, not eleven.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "1234567890"})),
        )
        .await;
    assert_eq!(response.status(), 400);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn payment_without_buyer_identity_is_rejected() {
    let server = MockServer::start().await;
    let app = app_with_psp(&server).await;
    app.seed_product("curso", 19700, json!([]), json!([])).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/sessions",
            Some(json!({"product": "curso"})),
        )
        .await;
    let body = response_json(response).await;
    let session_id = body["data"]["session"]["id"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "12345678901"})),
        )
        .await;
    assert_eq!(response.status(), 400);
}

async fn initiated_app() -> (MockServer, TestApp) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionId": "T1",
            "pix_code": PIX_TOKEN
        })))
        .mount(&server)
        .await;

    let app = app_with_psp(&server).await;
    let session_id = ready_session(&app).await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/sessions/{}/pay", session_id),
            Some(json!({"document": "12345678901"})),
        )
        .await;
    assert_eq!(response.status(), 200);

    (server, app)
}

#[tokio::test]
async fn webhook_settles_by_psp_reference_and_is_idempotent() {
    let (_server, app) = initiated_app().await;

    let delivery = json!({"id": "T1", "status": "PAID"});
    let response = app
        .request(Method::POST, "/api/v1/payments/webhook", Some(delivery.clone()))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["outcome"], "applied:approved");

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows[0].status, "approved");

    // Redelivery of the same event is acknowledged without another write.
    let response = app
        .request(Method::POST, "/api/v1/payments/webhook", Some(delivery))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["outcome"], "no_change");
}

#[tokio::test]
async fn webhook_accepts_alternate_field_names() {
    let (_server, app) = initiated_app().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"transaction_id": "T1", "paymentStatus": "confirmed"})),
        )
        .await;
    assert_eq!(response.status(), 200);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows[0].status, "approved");
}

#[tokio::test]
async fn intermediate_status_leaves_the_row_pending() {
    let (_server, app) = initiated_app().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"id": "T1", "status": "waiting_payment"})),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["outcome"], "ignored");

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows[0].status, "pending");
}

#[tokio::test]
async fn terminal_rows_do_not_move_again() {
    let (_server, app) = initiated_app().await;

    app.request(
        Method::POST,
        "/api/v1/payments/webhook",
        Some(json!({"id": "T1", "status": "FAILED"})),
    )
    .await;

    // A late approval for an already-rejected intent is a no-op.
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"id": "T1", "status": "PAID"})),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["outcome"], "no_change");

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert_eq!(rows[0].status, "rejected");
}

#[tokio::test]
async fn webhook_never_creates_transactions() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"id": "GHOST", "status": "PAID"})),
        )
        .await;
    assert_eq!(response.status(), 404);

    let rows = Transaction::find().all(&*app.state.db).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn webhook_without_identifier_is_malformed() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"status": "PAID"})),
        )
        .await;
    assert_eq!(response.status(), 400);
}

type HmacSha256 = Hmac<Sha256>;

fn sign(secret: &str, ts: i64, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", ts, body).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn configured_secret_enforces_signatures() {
    let app = TestApp::with_config(|cfg| {
        cfg.payment_webhook_secret = Some("whsec_test".to_string());
    })
    .await;

    // Unsigned delivery is refused.
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(json!({"id": "T1", "status": "PAID"})),
        )
        .await;
    assert_eq!(response.status(), 401);

    // A correctly signed delivery gets through to reconciliation, which
    // then reports the unknown reference.
    let body = json!({"id": "T1", "status": "PAID"}).to_string();
    let ts = chrono::Utc::now().timestamp();
    let sig = sign("whsec_test", ts, &body);

    let response = app
        .request_with_headers(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(serde_json::from_str(&body).unwrap()),
            &[
                ("x-timestamp", &ts.to_string()),
                ("x-signature", &sig),
            ],
        )
        .await;
    assert_eq!(response.status(), 404);
}
