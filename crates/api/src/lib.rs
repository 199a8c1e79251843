//! HTTP API: configuration, actor resolution, routing and the service layer.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
