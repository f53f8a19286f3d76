//! Vote and result endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use policyai_common::AppResult;
use policyai_core::PolicyResults;
use policyai_db::entities::vote::{self, Stance};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{ApiResponse, Message},
};

/// Cast vote request.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub device_id: Option<String>,
    pub stance: String,
}

/// Device identity passed in the query string.
#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

/// Vote response.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub id: i32,
    pub user_id: i32,
    pub policy_id: i32,
    pub stance: Stance,
    pub created_at: String,
}

impl From<vote::Model> for VoteResponse {
    fn from(v: vote::Model) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            policy_id: v.policy_id,
            stance: v.stance,
            created_at: v.created_at.to_rfc3339(),
        }
    }
}

/// Cast or change a vote.
async fn cast(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let identity = auth.identity(req.device_id)?;
    let vote = state
        .vote_service
        .cast_vote(&identity, policy_id, &req.stance)
        .await?;

    Ok(ApiResponse::ok(vote.into()))
}

/// Withdraw a vote.
async fn withdraw(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<ApiResponse<Message>> {
    let identity = auth.identity(query.device_id)?;
    state
        .vote_service
        .withdraw_vote(&identity, policy_id)
        .await?;

    Ok(ApiResponse::ok(Message::new("Vote withdrawn successfully")))
}

/// Vote results for a policy.
async fn results(
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
) -> AppResult<ApiResponse<PolicyResults>> {
    let results = state.results_service.results(policy_id).await?;
    Ok(ApiResponse::ok(results))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/vote", post(cast).delete(withdraw))
        .route("/{id}/results", get(results))
}
