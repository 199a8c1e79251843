use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;

use weeb_blog::CategoryInput;
use weeb_core::CategoryId;

use crate::app::dto::JsonBody;
use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::{AppServices, CATEGORY_NOT_FOUND};
use crate::context::ActorContext;

/// Staff-only category maintenance.
pub fn router() -> Router {
    Router::new()
        .route("/admin/categories/", post(create_category))
        .route("/admin/categories/:id/", delete(delete_category))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    JsonBody(body): JsonBody<CategoryInput>,
) -> Result<Response, ApiError> {
    let category = services.create_category(ctx.actor(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Category created successfully.",
            "results": category,
        })),
    )
        .into_response())
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: CategoryId = parse_id(&raw, CATEGORY_NOT_FOUND)?;
    let category = services.delete_category(ctx.actor(), id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Category \"{}\" deleted successfully.", category.name),
    }))
    .into_response())
}
