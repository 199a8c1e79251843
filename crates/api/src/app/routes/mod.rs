use axum::{routing::get, Router};

pub mod admin;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod common;
pub mod reviews;
pub mod system;
pub mod users;

/// Every endpoint. Paths keep their trailing slash; there is no redirect
/// from the bare form.
pub fn router() -> Router {
    Router::new()
        .route("/health/", get(system::health))
        .merge(articles::router())
        .merge(categories::router())
        .merge(admin::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(reviews::router())
}
