//! Request authentication for the account-facing endpoints.
//!
//! Accounts authenticate with the `X-Api-Key` / `X-Api-Login` headers.
//! Either header may stand alone: a key without a login is resolved to its
//! account first, then the pair is verified against the credential records.
//!
//! [`ApiAuth`] is the extractor form used by `/api/order`; the qr-status
//! route calls [`resolve_account`] directly because a failed pair check
//! answers 403 there instead of 401.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use steampay_core::entities::ApiAccount;
use steampay_core::store::{Store, StoreError};

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const API_LOGIN_HEADER: &str = "X-Api-Login";

/// Errors produced while resolving the calling account.
#[derive(Debug)]
pub enum AuthError {
    /// Neither credential header was provided.
    MissingCredentials,
    /// A key-only request referenced an unknown API key.
    InvalidApiKey,
    /// The (login, key) pair does not match any account.
    InvalidCredentials,
    Store(StoreError),
}

/// Resolve and verify the calling account from the credential headers.
pub async fn resolve_account(
    store: &dyn Store,
    headers: &HeaderMap,
) -> Result<ApiAccount, AuthError> {
    let api_key = header_value(headers, API_KEY_HEADER);
    let api_login = header_value(headers, API_LOGIN_HEADER);

    if api_key.is_none() && api_login.is_none() {
        return Err(AuthError::MissingCredentials);
    }

    // Key-only callers: look the login up by key first.
    let api_login = match (api_login, &api_key) {
        (Some(login), _) => login,
        (None, Some(key)) => store
            .api_client_by_key(key)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::InvalidApiKey)?
            .api_login,
        (None, None) => return Err(AuthError::MissingCredentials),
    };
    let api_key = api_key.unwrap_or_default();

    store
        .api_client(&api_login, &api_key)
        .await
        .map_err(AuthError::Store)?
        .ok_or(AuthError::InvalidCredentials)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// An Axum extractor that resolves the calling [`ApiAccount`].
///
/// Rejections follow the order-endpoint contract: 400 for absent
/// credentials, 401 for credentials that do not verify.
pub struct ApiAuth(pub ApiAccount);

impl FromRequestParts<AppState> for ApiAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_account(state.store.as_ref(), &parts.headers)
            .await
            .map(ApiAuth)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "Missing API credentials")
            }
            AuthError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Invalid API key"),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid API credentials")
            }
            AuthError::Store(e) => {
                tracing::error!(error = %e, "credential lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
