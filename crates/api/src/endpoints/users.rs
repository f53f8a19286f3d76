//! User endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, put},
};
use policyai_common::AppResult;
use policyai_core::{Identity, UpdateProfileInput, UserProfile, VoteHistoryEntry};
use serde::{Deserialize, Serialize};

use crate::{extractors::MaybeAuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

/// Push token registration. A null token clears it.
#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VotingHistoryResponse {
    pub votes: Vec<VoteHistoryEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PushTokenResponse {
    pub registered: bool,
}

async fn me(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<ApiResponse<UserProfile>> {
    let identity = auth.identity(query.device_id)?;
    let profile = state.user_service.profile(&identity).await?;
    Ok(ApiResponse::ok(profile))
}

async fn voting_history(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<ApiResponse<VotingHistoryResponse>> {
    let identity = auth.identity(query.device_id)?;
    let votes = state.user_service.voting_history(&identity).await?;

    Ok(ApiResponse::ok(VotingHistoryResponse {
        total: votes.len(),
        votes,
    }))
}

async fn update_me(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserProfile>> {
    let identity = auth.identity(query.device_id)?;
    let user = state.user_service.update_name(&identity, input).await?;
    let profile = state.user_service.profile(&Identity::User(user)).await?;
    Ok(ApiResponse::ok(profile))
}

async fn push_token(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
    Json(req): Json<PushTokenRequest>,
) -> AppResult<ApiResponse<PushTokenResponse>> {
    let identity = auth.identity(query.device_id)?;
    let user = state.user_service.set_push_token(&identity, req.token).await?;

    Ok(ApiResponse::ok(PushTokenResponse {
        registered: user.push_token.is_some(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).put(update_me))
        .route("/me/voting-history", get(voting_history))
        .route("/me/push-token", put(push_token))
}
