use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use steampay_core::status::{StatusError, StatusQuery};

use super::error_body;
use crate::api::extractors::{self, AuthError};
use crate::state::AppState;

#[derive(Serialize)]
struct StatusResults {
    operation_status_code: i32,
    info: Option<String>,
}

/// `GET /api/operations/{op_id}/qr-status` — canonical status projection.
///
/// Credentials that do not verify answer 403 here (unlike the order
/// endpoint's 401), so the account is resolved by hand instead of through
/// the [`extractors::ApiAuth`] extractor.
pub(super) async fn qr_status(
    State(state): State<AppState>,
    Path(op_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusApiError> {
    let account = extractors::resolve_account(state.store.as_ref(), &headers)
        .await
        .map_err(StatusApiError::Auth)?;

    let view = StatusQuery::new(state.store.clone())
        .get_status(&account.api_login, &op_id, account.test)
        .await?;

    Ok(Json(serde_json::json!({
        "results": StatusResults {
            operation_status_code: view.code,
            info: view.info,
        }
    }))
    .into_response())
}

#[derive(Debug)]
pub(super) enum StatusApiError {
    Auth(AuthError),
    NotFound,
    Internal(steampay_core::store::StoreError),
}

impl From<StatusError> for StatusApiError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::NotFound => StatusApiError::NotFound,
            StatusError::Store(e) => StatusApiError::Internal(e),
        }
    }
}

impl IntoResponse for StatusApiError {
    fn into_response(self) -> Response {
        match self {
            StatusApiError::Auth(AuthError::InvalidCredentials) => (
                StatusCode::FORBIDDEN,
                error_body("Forbidden: invalid API credentials"),
            )
                .into_response(),
            StatusApiError::Auth(e) => e.into_response(),
            StatusApiError::NotFound => {
                (StatusCode::NOT_FOUND, error_body("Purchase not found")).into_response()
            }
            StatusApiError::Internal(e) => {
                tracing::error!(error = %e, "status lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
                    .into_response()
            }
        }
    }
}
