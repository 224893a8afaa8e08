//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /api/order`                          – checkout (header-authenticated)
//! - `GET  /api/operations/{op_id}/qr-status`   – operation status projection
//! - `POST /api/webhook`                        – provider completion callback
//! - `POST /api/test`                           – sandbox order / ping
//!
//! All failures answer a JSON envelope `{"error": message}`; a quota denial
//! is not a failure and answers 200 with a cancellation payload.

use axum::{
    Json, Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod extractors;
mod order;
mod sandbox;
mod status;
mod webhook;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/order", post(order::create_order))
        .route("/operations/{op_id}/qr-status", get(status::qr_status))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/test", post(sandbox::test_order))
}

/// The shared error envelope.
pub(crate) fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use steampay_core::entities::{ApiAccount, NewClient, Purchase, PurchaseStatus};
    use steampay_core::gateway::{GatewayError, GatewayPayment, PaymentGateway};
    use steampay_core::ledger::Limits;
    use steampay_core::store::MemoryStore;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct StaticGateway;

    #[async_trait]
    impl PaymentGateway for StaticGateway {
        async fn create_payment(
            &self,
            _endpoint: &str,
            _amount: Decimal,
        ) -> Result<GatewayPayment, GatewayError> {
            Ok(GatewayPayment {
                payment_id: "PAY-1".into(),
                payment_url: "https://pay.example/p/1".into(),
            })
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_account(ApiAccount {
            api_login: "shop".into(),
            api_key: "key".into(),
            second_server_url: "https://gateway.example/create".into(),
            test: false,
        });
        store.add_login("alpha", false);
        store
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        build_router(AppState::new(
            store,
            Arc::new(StaticGateway),
            Limits::default(),
        ))
    }

    fn pending_purchase(id: &str, api_login: &str) -> Purchase {
        let now = {
            let t = time::OffsetDateTime::now_utc();
            time::PrimitiveDateTime::new(t.date(), t.time())
        };
        Purchase {
            id: id.into(),
            amount: Decimal::from(50),
            steam_login: "alpha".into(),
            api_login: api_login.into(),
            status: PurchaseStatus::Pending,
            qr_id: Uuid::new_v4(),
            qr_payload: "https://pay.example/p/1".into(),
            commit: None,
            refund_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn order_without_credentials_is_rejected() {
        let (status, body) = send(
            app(seeded_store()),
            "POST",
            "/api/order",
            &[],
            Some(serde_json::json!({"sum": 5000, "client_id": "c1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing API credentials");
    }

    #[tokio::test]
    async fn order_with_wrong_key_is_unauthorized() {
        let (status, _) = send(
            app(seeded_store()),
            "POST",
            "/api/order",
            &[("X-Api-Key", "wrong")],
            Some(serde_json::json!({"sum": 5000, "client_id": "c1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn order_rejects_non_positive_sum() {
        let (status, body) = send(
            app(seeded_store()),
            "POST",
            "/api/order",
            &[("X-Api-Key", "key")],
            Some(serde_json::json!({"sum": -5, "client_id": "c1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid sum: must be positive number");
    }

    #[tokio::test]
    async fn order_happy_path_creates_payment_for_new_client() {
        let store = seeded_store();
        let (status, body) = send(
            app(store.clone()),
            "POST",
            "/api/order",
            &[("X-Api-Key", "key")],
            Some(serde_json::json!({"sum": 5000, "client_id": "c1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["operation_id"], "PAY-1");
        assert_eq!(body["results"]["qr_link"], "https://pay.example/p/1");

        let client = store.client_snapshot("c1").unwrap();
        assert_eq!(client.total_amount, Decimal::from(50));
        assert_eq!(client.steam_login, "alpha");
    }

    #[tokio::test]
    async fn order_over_quota_is_a_cancelled_200() {
        let store = seeded_store();
        store.add_client(NewClient {
            client_id: "c1".into(),
            steam_login: "alpha".into(),
            total_amount: Decimal::from(9_500),
            period_amount: Decimal::from(9_500),
        });

        let (status, body) = send(
            app(store),
            "POST",
            "/api/order",
            &[("X-Api-Login", "shop"), ("X-Api-Key", "key")],
            Some(serde_json::json!({"sum": 100000, "client_id": "c1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");
        let info = body["info"].as_str().unwrap();
        assert!(info.contains("день"));
        assert!(info.contains("500"));
    }

    #[tokio::test]
    async fn webhook_settlement_is_idempotent() {
        let store = seeded_store();
        store.add_purchase(pending_purchase("P1", "shop"), false);
        let payload = serde_json::json!({"id": "P1", "status": "settlement"});

        let (status, body) = send(
            app(store.clone()),
            "POST",
            "/api/webhook",
            &[],
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["new_status"], "success");

        // Duplicate delivery: same acknowledgment, state unchanged.
        let (status, body) = send(app(store.clone()), "POST", "/api/webhook", &[], Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["new_status"], "success");
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Success
        );
    }

    #[tokio::test]
    async fn webhook_unknown_status_is_rejected() {
        let store = seeded_store();
        store.add_purchase(pending_purchase("P1", "shop"), false);

        let (status, body) = send(
            app(store.clone()),
            "POST",
            "/api/webhook",
            &[],
            Some(serde_json::json!({"id": "P1", "status": "unknown_value"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown status value: unknown_value");
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Pending
        );
    }

    #[tokio::test]
    async fn webhook_missing_fields_is_rejected() {
        let (status, body) = send(
            app(seeded_store()),
            "POST",
            "/api/webhook",
            &[],
            Some(serde_json::json!({"id": "P1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields (id, status)");
    }

    #[tokio::test]
    async fn qr_status_maps_success_to_code_5() {
        let store = seeded_store();
        let mut purchase = pending_purchase("P1", "shop");
        purchase.status = PurchaseStatus::Success;
        store.add_purchase(purchase, false);

        let (status, body) = send(
            app(store),
            "GET",
            "/api/operations/P1/qr-status",
            &[("X-Api-Login", "shop"), ("X-Api-Key", "key")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["operation_status_code"], 5);
        assert_eq!(body["results"]["info"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn qr_status_with_bad_pair_is_forbidden() {
        let (status, body) = send(
            app(seeded_store()),
            "GET",
            "/api/operations/P1/qr-status",
            &[("X-Api-Login", "shop"), ("X-Api-Key", "wrong")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden: invalid API credentials");
    }

    #[tokio::test]
    async fn qr_status_unknown_operation_is_not_found() {
        let (status, _) = send(
            app(seeded_store()),
            "GET",
            "/api/operations/nope/qr-status",
            &[("X-Api-Key", "key")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sandbox_ping_answers_pong() {
        let (status, body) = send(
            app(seeded_store()),
            "POST",
            "/api/test",
            &[],
            Some(serde_json::json!({
                "steamId": "ping",
                "amount": 1,
                "api_login": "shop",
                "api_key": "key",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pong"], true);
    }

    #[tokio::test]
    async fn sandbox_order_lands_in_the_test_table() {
        let store = seeded_store();
        let (status, body) = send(
            app(store.clone()),
            "POST",
            "/api/test",
            &[],
            Some(serde_json::json!({
                "steamId": "steam-user-1",
                "amount": 5000,
                "api_login": "shop",
                "api_key": "key",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let operation_id = body["result"]["operation_id"].as_str().unwrap();
        let purchase = store.purchase_snapshot(operation_id, true).unwrap();
        assert_eq!(purchase.amount, Decimal::from(50));
        assert_eq!(purchase.steam_login, "steam-user-1");
        assert_eq!(purchase.status, PurchaseStatus::Pending);
    }

    #[tokio::test]
    async fn sandbox_missing_fields_is_rejected() {
        let (status, body) = send(
            app(seeded_store()),
            "POST",
            "/api/test",
            &[],
            Some(serde_json::json!({"steamId": "steam-user-1", "amount": 5000})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn unknown_route_answers_json_404() {
        let (status, body) = send(app(seeded_store()), "GET", "/api/nothing", &[], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
    }
}
