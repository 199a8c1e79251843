use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use weeb_core::CategoryId;

use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::{AppServices, CATEGORY_NOT_FOUND};

/// Public, read-only. Writes live under `/admin/categories/`.
pub fn router() -> Router {
    Router::new()
        .route("/categories/", get(list_categories))
        .route("/categories/:id/", get(get_category))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, ApiError> {
    let categories = services.list_categories().await?;
    Ok(Json(json!({ "success": true, "results": categories })).into_response())
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: CategoryId = parse_id(&raw, CATEGORY_NOT_FOUND)?;
    let category = services.get_category(id).await?;
    Ok(Json(json!({ "success": true, "results": category })).into_response())
}
