use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use weeb_blog::ArticleWrite;
use weeb_core::ArticleId;

use crate::app::dto::JsonBody;
use crate::app::errors::ApiError;
use crate::app::routes::common::{list_response, parse_id};
use crate::app::services::{AppServices, ARTICLE_NOT_FOUND};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/articles/", get(list_articles).post(create_article))
        .route(
            "/articles/:id/",
            get(get_article)
                .put(replace_article)
                .patch(patch_article)
                .delete(delete_article),
        )
}

pub async fn list_articles(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, ApiError> {
    list_response(services.list_articles().await?, "No articles found.")
}

pub async fn get_article(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: ArticleId = parse_id(&raw, ARTICLE_NOT_FOUND)?;
    let article = services.get_article(id).await?;
    Ok(Json(json!({ "success": true, "results": article })).into_response())
}

pub async fn create_article(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    JsonBody(body): JsonBody<ArticleWrite>,
) -> Result<Response, ApiError> {
    let article = services.create_article(ctx.actor(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Article created successfully.",
            "results": article,
        })),
    )
        .into_response())
}

pub async fn replace_article(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<ActorContext>,
    path: Path<String>,
    body: JsonBody<ArticleWrite>,
) -> Result<Response, ApiError> {
    update(services, ctx, path, body, false).await
}

pub async fn patch_article(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<ActorContext>,
    path: Path<String>,
    body: JsonBody<ArticleWrite>,
) -> Result<Response, ApiError> {
    update(services, ctx, path, body, true).await
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<ArticleWrite>,
    partial: bool,
) -> Result<Response, ApiError> {
    let id: ArticleId = parse_id(&raw, ARTICLE_NOT_FOUND)?;
    let article = services.update_article(ctx.actor(), id, body, partial).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Article updated successfully.",
        "results": article,
    }))
    .into_response())
}

pub async fn delete_article(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: ArticleId = parse_id(&raw, ARTICLE_NOT_FOUND)?;
    let title = services.delete_article(ctx.actor(), id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Article \"{title}\" deleted successfully."),
    }))
    .into_response())
}
