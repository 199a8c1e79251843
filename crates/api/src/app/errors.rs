use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use weeb_auth::{AuthzError, PasswordError, TokenError};
use weeb_core::DomainError;
use weeb_infra::StoreError;

/// Everything a handler can fail with, mapped onto the response envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Bad credentials or an unusable token.
    #[error("{0}")]
    Unauthenticated(String),

    /// A request that is well-formed but cannot be honored, with a
    /// human-readable reason (inactive login, bad logout token).
    #[error("{0}")]
    BadRequest(String),

    /// Named record is missing; the message says which.
    #[error("{0}")]
    NotFound(String),

    /// Nothing to show; reported under `results` rather than `message`.
    #[error("{0}")]
    NoResults(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for ApiError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing(msg) => ApiError::Internal(msg),
            other => ApiError::Unauthenticated(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(value: PasswordError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            ApiError::Domain(DomainError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Domain(DomainError::Conflict(_) | DomainError::Protected(_)) => StatusCode::CONFLICT,
            ApiError::Authz(e) if e.is_authentication() => StatusCode::UNAUTHORIZED,
            ApiError::Authz(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::NoResults(_) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Duplicate(_)) | ApiError::Store(StoreError::Protected(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(StoreError::Backend(_)) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(DomainError::Validation(_)) => "validation_error",
            ApiError::Domain(DomainError::InvalidId(_)) => "invalid_id",
            ApiError::Domain(DomainError::NotFound) => "not_found",
            ApiError::Domain(DomainError::Conflict(_)) => "conflict",
            ApiError::Domain(DomainError::Protected(_)) => "protected",
            ApiError::Authz(AuthzError::AuthenticationRequired) => "not_authenticated",
            ApiError::Authz(AuthzError::PendingActivation) => "account_inactive",
            ApiError::Authz(_) => "permission_denied",
            ApiError::Unauthenticated(_) => "not_authenticated",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) | ApiError::NoResults(_) => "not_found",
            ApiError::Store(StoreError::NotFound) => "not_found",
            ApiError::Store(StoreError::Duplicate(_)) => "conflict",
            ApiError::Store(StoreError::Protected(_)) => "protected",
            ApiError::Store(StoreError::Backend(_)) | ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        match self {
            ApiError::Domain(DomainError::Validation(errors)) => {
                let message = errors.first_message().unwrap_or("Invalid input.").to_string();
                (
                    status,
                    axum::Json(json!({
                        "success": false,
                        "error": code,
                        "message": message,
                        "errors": errors,
                    })),
                )
                    .into_response()
            }
            ApiError::NoResults(message) => (
                status,
                axum::Json(json!({
                    "success": false,
                    "results": message,
                })),
            )
                .into_response(),
            ApiError::Store(StoreError::Backend(e)) => {
                tracing::error!(error = ?e, "storage backend failure");
                json_error(status, code, "Internal server error.")
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json_error(status, code, "Internal server error.")
            }
            other => json_error(status, code, other.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(DomainError::validation("title", "too short")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(AuthzError::AuthenticationRequired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthzError::PendingActivation).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AuthzError::NotOwner).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(DomainError::protected("in use")).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::not_found("No article found.").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Backend(anyhow::anyhow!("db down"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn store_backend_details_are_hidden() {
        let err = ApiError::from(StoreError::Backend(anyhow::anyhow!("password=hunter2")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body(response).await;
        assert_eq!(body["success"], false);
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn validation_errors_carry_field_map() {
        let err = ApiError::from(DomainError::validation("category_id", "category_id is required."));
        let body = body(err.into_response()).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "category_id is required.");
        assert_eq!(body["errors"]["category_id"][0], "category_id is required.");
    }

    #[tokio::test]
    async fn empty_lists_use_results_key() {
        let body = body(ApiError::NoResults("No articles found.".to_string()).into_response()).await;
        assert_eq!(body, json!({"success": false, "results": "No articles found."}));
    }
}
