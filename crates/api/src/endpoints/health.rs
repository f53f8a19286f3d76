//! Health check endpoint.

use axum::{Router, routing::get};
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::ok(Health {
        status: "healthy",
        service: "PolicyAI",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}
