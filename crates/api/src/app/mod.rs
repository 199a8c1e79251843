//! HTTP application wiring.
//!
//! - `services.rs`: the operations, over injected stores, token codec and classifier
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response shapes
//! - `errors.rs`: the error envelope

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Full router over an already-built service layer.
///
/// Every route sees an `ActorContext`; anonymous requests get the anonymous
/// actor and individual operations decide what that allows.
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt_validator(),
        users: services.stores().users.clone(),
    };

    routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware)),
    )
}
