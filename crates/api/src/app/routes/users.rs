use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use weeb_auth::{AdminUserInput, UserPatch};
use weeb_core::UserId;

use crate::app::dto::JsonBody;
use crate::app::errors::ApiError;
use crate::app::routes::common::{list_response, parse_id};
use crate::app::services::{AppServices, USER_NOT_FOUND};
use crate::context::ActorContext;

/// Staff-only account administration.
pub fn router() -> Router {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:id/",
            get(get_user).put(replace_user).patch(patch_user).delete(delete_user),
        )
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Result<Response, ApiError> {
    list_response(services.list_users(ctx.actor()).await?, "No users found.")
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&raw, USER_NOT_FOUND).map_err(|_| ApiError::NoResults(USER_NOT_FOUND.to_string()))?;
    let user = services.get_user(ctx.actor(), id).await?;
    Ok(Json(json!({ "success": true, "results": user })).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    JsonBody(body): JsonBody<AdminUserInput>,
) -> Result<Response, ApiError> {
    let user = services.create_user(ctx.actor(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully.",
            "results": user,
        })),
    )
        .into_response())
}

pub async fn replace_user(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<ActorContext>,
    path: Path<String>,
    body: JsonBody<UserPatch>,
) -> Result<Response, ApiError> {
    update(services, ctx, path, body, false).await
}

pub async fn patch_user(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<ActorContext>,
    path: Path<String>,
    body: JsonBody<UserPatch>,
) -> Result<Response, ApiError> {
    update(services, ctx, path, body, true).await
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<UserPatch>,
    partial: bool,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&raw, USER_NOT_FOUND)?;
    let user = services.update_user(ctx.actor(), id, body, partial).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully.",
        "results": user,
    }))
    .into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&raw, USER_NOT_FOUND)?;
    let user = services.delete_user(ctx.actor(), id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("User \"{}\" deleted successfully.", user.email),
        "results": user,
    }))
    .into_response())
}
