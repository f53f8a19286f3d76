//! API endpoints.

mod auth;
mod comments;
mod health;
mod policies;
mod users;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/policies",
            policies::router()
                .merge(votes::router())
                .merge(comments::policy_router()),
        )
        .nest("/comments", comments::router())
        .nest("/users", users::router())
        .nest("/auth", auth::router())
}
