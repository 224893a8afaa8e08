use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use steampay_core::checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutOutcome, decline_info,
};
use uuid::Uuid;

use super::error_body;
use crate::api::extractors::ApiAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    /// Amount in minor currency units.
    pub sum: Option<f64>,
    pub client_id: Option<String>,
}

#[derive(Serialize)]
struct OrderResults {
    operation_id: String,
    qr_id: Uuid,
    qr_link: String,
}

/// `POST /api/order` — checkout.
///
/// A quota denial is a normal declined outcome: it answers 200 with
/// `{"status": "cancelled", "info": ...}`, not an error envelope.
pub(super) async fn create_order(
    State(state): State<AppState>,
    ApiAuth(account): ApiAuth,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Response, OrderApiError> {
    let Json(body) = body.map_err(|_| OrderApiError::MissingBody)?;

    let sum = body
        .sum
        .filter(|s| s.is_finite() && *s > 0.0)
        .ok_or(OrderApiError::InvalidSum)?;
    let amount = Decimal::try_from(sum).map_err(|_| OrderApiError::InvalidSum)?;
    let client_id = body
        .client_id
        .filter(|c| !c.is_empty())
        .ok_or(OrderApiError::MissingClientId)?;

    let orchestrator = CheckoutOrchestrator::new(
        state.store.clone(),
        state.gateway.clone(),
        state.limits().await,
    );

    match orchestrator.checkout(&account, &client_id, amount).await? {
        CheckoutOutcome::Created(created) => Ok(Json(serde_json::json!({
            "results": OrderResults {
                operation_id: created.operation_id,
                qr_id: created.qr_id,
                qr_link: created.qr_link,
            }
        }))
        .into_response()),
        CheckoutOutcome::Declined { scope, remaining } => Ok(Json(serde_json::json!({
            "status": "cancelled",
            "info": decline_info(scope, remaining),
        }))
        .into_response()),
    }
}

/// Errors that can occur in the order handler.
#[derive(Debug)]
pub(super) enum OrderApiError {
    MissingBody,
    InvalidSum,
    MissingClientId,
    Checkout(CheckoutError),
}

impl From<CheckoutError> for OrderApiError {
    fn from(err: CheckoutError) -> Self {
        OrderApiError::Checkout(err)
    }
}

impl IntoResponse for OrderApiError {
    fn into_response(self) -> Response {
        match self {
            OrderApiError::MissingBody => {
                (StatusCode::BAD_REQUEST, error_body("Missing JSON body")).into_response()
            }
            OrderApiError::InvalidSum => (
                StatusCode::BAD_REQUEST,
                error_body("Invalid sum: must be positive number"),
            )
                .into_response(),
            OrderApiError::MissingClientId => (
                StatusCode::BAD_REQUEST,
                error_body("Missing client_id in request body"),
            )
                .into_response(),
            OrderApiError::Checkout(CheckoutError::PoolExhausted) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("No available logins left"),
            )
                .into_response(),
            OrderApiError::Checkout(CheckoutError::Gateway(e)) => {
                tracing::error!(error = %e, "gateway call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    error_body("Failed to create payment with provider"),
                )
                    .into_response()
            }
            OrderApiError::Checkout(e) => {
                tracing::error!(error = %e, "checkout failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
                    .into_response()
            }
        }
    }
}
