use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use weeb_auth::Registration;

use crate::app::dto::{JsonBody, LoginRequest, RefreshRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
        .route("/auth/token/refresh/", post(refresh))
        .route("/auth/logout/", post(logout))
        .route("/auth/me/", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<Registration>,
) -> Result<Response, ApiError> {
    let user = services.register(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful. Your account is pending activation by an administrator.",
            "user": user,
        })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let response = services.login(body).await?;
    Ok(Json(response).into_response())
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<JsonBody<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let token = body.and_then(|JsonBody(b)| b.refresh);
    let access = services.refresh(token).await?;
    Ok(Json(json!({ "access": access })).into_response())
}

/// An unreadable body is treated like a missing token.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    body: Option<JsonBody<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let token = body.and_then(|JsonBody(b)| b.refresh);
    services.logout(ctx.actor(), token).await?;
    Ok(Json(json!({ "success": true, "message": "Logout successful." })).into_response())
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Result<Response, ApiError> {
    let user = services.me(ctx.actor()).await?;
    Ok(Json(json!({ "success": true, "user": user })).into_response())
}
