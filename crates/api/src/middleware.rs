//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use policyai_core::{
    AuthService, CommentService, PolicyService, ResultsService, UserService, VoteService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub policy_service: PolicyService,
    pub vote_service: VoteService,
    pub results_service: ResultsService,
    pub comment_service: CommentService,
    pub user_service: UserService,
    pub auth_service: AuthService,
}

/// Authentication middleware.
///
/// A valid bearer token puts its user into the request extensions. A
/// malformed, expired or foreign token is rejected outright instead of
/// silently falling back to the device identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected access token");
                return e.into_response();
            }
        }
    }

    next.run(req).await
}
