use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use weeb_core::ReviewId;
use weeb_reviews::ReviewSubmission;

use crate::app::dto::{JsonBody, PredictRequest};
use crate::app::errors::ApiError;
use crate::app::routes::common::{counted, parse_id};
use crate::app::services::{AppServices, REVIEW_NOT_FOUND};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/review/", post(submit_review).get(list_reviews))
        .route("/review/:id/", get(get_review))
        .route("/predict/", post(predict))
}

pub async fn submit_review(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<ReviewSubmission>,
) -> Result<Response, ApiError> {
    let review = services.submit_review(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Review saved successfully.",
            "results": review,
        })),
    )
        .into_response())
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Result<Response, ApiError> {
    let reviews = services.list_reviews(ctx.actor()).await?;
    Ok(counted(reviews).into_response())
}

pub async fn get_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id: ReviewId = parse_id(&raw, REVIEW_NOT_FOUND)?;
    let review = services.get_review(ctx.actor(), id).await?;
    Ok(Json(json!({ "success": true, "results": review })).into_response())
}

/// Bare `{prediction}` / `{error}` bodies; this endpoint has no envelope.
pub async fn predict(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<JsonBody<PredictRequest>>,
) -> Response {
    let features = body.and_then(|JsonBody(b)| b.features);
    match services.predict(features) {
        Ok(prediction) => Json(json!({ "prediction": prediction })).into_response(),
        Err(error) => (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response(),
    }
}
