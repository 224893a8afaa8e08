use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use steampay_core::reconcile::{ReconcileError, StatusReconciler};

use super::error_body;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub id: Option<String>,
    pub status: Option<String>,
}

/// `POST /api/webhook` — provider completion callback.
///
/// Unauthenticated by design (provider-trusted). Must stay safe under
/// duplicate and out-of-order delivery; the reconciler guarantees that, so
/// a repeated callback answers the same acknowledgment.
pub(super) async fn handle_webhook(
    State(state): State<AppState>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Response, WebhookApiError> {
    let Json(body) = body.map_err(|_| WebhookApiError::MissingBody)?;

    let (id, status) = match (body.id, body.status) {
        (Some(id), Some(status)) if !id.is_empty() && !status.is_empty() => (id, status),
        _ => return Err(WebhookApiError::MissingFields),
    };

    let new_status = StatusReconciler::new(state.store.clone())
        .apply_callback(&id, &status)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "id": id,
        "new_status": new_status.as_str(),
    }))
    .into_response())
}

#[derive(Debug)]
pub(super) enum WebhookApiError {
    MissingBody,
    MissingFields,
    Reconcile(ReconcileError),
}

impl From<ReconcileError> for WebhookApiError {
    fn from(err: ReconcileError) -> Self {
        WebhookApiError::Reconcile(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        match self {
            WebhookApiError::MissingBody => {
                (StatusCode::BAD_REQUEST, error_body("Missing JSON body")).into_response()
            }
            WebhookApiError::MissingFields => (
                StatusCode::BAD_REQUEST,
                error_body("Missing required fields (id, status)"),
            )
                .into_response(),
            WebhookApiError::Reconcile(ReconcileError::UnknownStatus(status)) => (
                StatusCode::BAD_REQUEST,
                error_body(&format!("Unknown status value: {status}")),
            )
                .into_response(),
            WebhookApiError::Reconcile(ReconcileError::NotFound) => {
                (StatusCode::NOT_FOUND, error_body("Purchase not found")).into_response()
            }
            WebhookApiError::Reconcile(ReconcileError::Store(e)) => {
                tracing::error!(error = %e, "webhook reconciliation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
                    .into_response()
            }
        }
    }
}
