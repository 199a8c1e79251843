use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use weeb_auth::{JwtValidator, TokenKind};
use weeb_infra::UserStore;

use crate::app::errors::json_error;
use crate::context::ActorContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub users: Arc<dyn UserStore>,
}

/// Resolve the request's actor.
///
/// - no `Authorization` header: anonymous
/// - a header that is not a valid, unexpired access token for an existing
///   user: 401, whatever the route
/// - otherwise the live account, inactive ones included; activation is the
///   policy's concern
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let context = match extract_bearer(req.headers())? {
        None => ActorContext::anonymous(),
        Some(token) => {
            let claims = state
                .jwt
                .validate(token, TokenKind::Access, Utc::now())
                .map_err(|e| {
                    tracing::debug!(error = %e, "rejected bearer token");
                    unauthorized("Given token not valid for any token type")
                })?;

            let user = state.users.get_user(claims.sub).await.map_err(|e| {
                tracing::error!(error = %e, "user lookup failed during authentication");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error.")
            })?;

            match user {
                Some(user) => ActorContext::authenticated(user.principal()),
                None => return Err(unauthorized("User not found")),
            }
        }
    };

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, Response> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header."))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Authorization header must contain a Bearer token."))?
        .trim();

    if token.is_empty() {
        return Err(unauthorized("Authorization header must contain a Bearer token."));
    }

    Ok(Some(token))
}

fn unauthorized(message: &str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "not_authenticated", message)
}
