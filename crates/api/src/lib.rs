//! HTTP API layer for PolicyAI.
//!
//! - **Endpoints**: policies, votes, results, comments, users and sign-in
//! - **Extractors**: access-token users and device identities
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8. Every success body is wrapped as `{"data": ...}`.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
