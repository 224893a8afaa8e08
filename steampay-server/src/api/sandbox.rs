use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use steampay_core::entities::NewPurchase;
use uuid::Uuid;

use super::error_body;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SandboxRequest {
    #[serde(rename = "steamId")]
    pub steam_id: Option<String>,
    /// Amount in minor currency units.
    pub amount: Option<f64>,
    pub api_login: Option<String>,
    pub api_key: Option<String>,
}

/// `POST /api/test` — sandbox order.
///
/// The account travels in the body and is deliberately not verified; this
/// endpoint exists so integrators can exercise the wire format without a
/// provider. A `steamId` of `"ping"` short-circuits into a liveness answer.
/// Everything else lands in the sandbox purchase table with fabricated ids.
pub(super) async fn test_order(
    State(state): State<AppState>,
    body: Result<Json<SandboxRequest>, JsonRejection>,
) -> Result<Response, SandboxApiError> {
    let Json(body) = body.map_err(|_| SandboxApiError::MissingBody)?;

    let (steam_id, amount, api_login, _api_key) =
        match (body.steam_id, body.amount, body.api_login, body.api_key) {
            (Some(steam_id), Some(amount), Some(api_login), Some(api_key))
                if !steam_id.is_empty() && !api_login.is_empty() && !api_key.is_empty() =>
            {
                (steam_id, amount, api_login, api_key)
            }
            _ => return Err(SandboxApiError::MissingFields),
        };

    if steam_id == "ping" {
        tracing::debug!("sandbox ping received");
        return Ok(Json(serde_json::json!({ "pong": true })).into_response());
    }

    if !(amount.is_finite() && amount > 0.0) {
        return Err(SandboxApiError::InvalidAmount);
    }
    let amount = Decimal::try_from(amount).map_err(|_| SandboxApiError::InvalidAmount)?
        / Decimal::ONE_HUNDRED;

    let operation_id = Uuid::new_v4().to_string();
    let qr_id = Uuid::new_v4();
    let qr_payload = format!("https://fake-qr.com/{qr_id}");

    state
        .store
        .insert_purchase(
            NewPurchase {
                id: operation_id.clone(),
                amount,
                steam_login: steam_id,
                api_login,
                qr_id,
                qr_payload: qr_payload.clone(),
            },
            true,
        )
        .await
        .map_err(SandboxApiError::Store)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "result": {
                "operation_id": operation_id,
                "qr_id": qr_id,
                "qr_payload": qr_payload,
            }
        })),
    )
        .into_response())
}

#[derive(Debug)]
pub(super) enum SandboxApiError {
    MissingBody,
    MissingFields,
    InvalidAmount,
    Store(steampay_core::store::StoreError),
}

impl IntoResponse for SandboxApiError {
    fn into_response(self) -> Response {
        match self {
            SandboxApiError::MissingBody => {
                (StatusCode::BAD_REQUEST, error_body("Missing JSON body")).into_response()
            }
            SandboxApiError::MissingFields => {
                (StatusCode::BAD_REQUEST, error_body("Missing required fields")).into_response()
            }
            SandboxApiError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                error_body("Invalid amount: must be positive number"),
            )
                .into_response(),
            SandboxApiError::Store(e) => {
                tracing::error!(error = %e, "sandbox insert failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Database error"),
                )
                    .into_response()
            }
        }
    }
}
