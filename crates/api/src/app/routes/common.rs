use std::str::FromStr;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::app::errors::ApiError;

/// Parse a path id. Anything that is not a positive integer cannot name a
/// row, so it reads as "not found" rather than a bad request.
pub fn parse_id<T: FromStr>(raw: &str, not_found: &str) -> Result<T, ApiError> {
    raw.parse::<T>().map_err(|_| ApiError::not_found(not_found))
}

/// `{success, count, results}`, or a 404 `results` message when empty.
pub fn list_response<T: Serialize>(items: Vec<T>, empty: &str) -> Result<axum::response::Response, ApiError> {
    if items.is_empty() {
        return Err(ApiError::NoResults(empty.to_string()));
    }
    Ok(counted(items).into_response())
}

/// `{success, count, results}` even when there is nothing to list.
pub fn counted<T: Serialize>(items: Vec<T>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": items.len(),
            "results": items,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use weeb_core::ArticleId;

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert!(matches!(parse_id::<ArticleId>("abc", "nope"), Err(ApiError::NotFound(m)) if m == "nope"));
        assert!(matches!(parse_id::<ArticleId>("0", "nope"), Err(ApiError::NotFound(_))));
        assert_eq!(parse_id::<ArticleId>("12", "nope").unwrap(), ArticleId::new(12));
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(list_response(Vec::<u8>::new(), "none"), Err(ApiError::NoResults(m)) if m == "none"));
        assert_eq!(list_response(vec![1, 2], "none").map(|r| r.status()).ok(), Some(StatusCode::OK));
    }
}
