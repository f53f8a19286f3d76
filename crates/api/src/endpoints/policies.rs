//! Policy endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use policyai_common::AppResult;
use policyai_core::services::results::time_left_label;
use policyai_core::{CreatePolicyInput, PolicyWithStats, VoteTally};
use policyai_db::entities::policy;
use policyai_db::repositories::SortOrder;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

// ==================== Request/Response Types ====================

/// Policy with its current voting stats.
#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub author_id: Option<i32>,
    pub ai_summary: Option<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub ends_at: Option<String>,
    pub updated_at: Option<String>,
    pub support_percentage: u32,
    pub oppose_percentage: u32,
    pub neutral_percentage: u32,
    pub total_votes: u64,
    pub time_left: String,
}

impl PolicyResponse {
    fn new(policy: policy::Model, tally: VoteTally, time_left: String) -> Self {
        Self {
            pros: policy.pros_list(),
            cons: policy.cons_list(),
            id: policy.id,
            title: policy.title,
            description: policy.description,
            category: policy.category,
            author_id: policy.author_id,
            ai_summary: policy.ai_summary,
            is_active: policy.is_active,
            created_at: policy.created_at.to_rfc3339(),
            ends_at: policy.ends_at.map(|dt| dt.to_rfc3339()),
            updated_at: policy.updated_at.map(|dt| dt.to_rfc3339()),
            support_percentage: tally.support_percentage(),
            oppose_percentage: tally.oppose_percentage(),
            neutral_percentage: tally.neutral_percentage(),
            total_votes: tally.total(),
            time_left,
        }
    }
}

impl From<PolicyWithStats> for PolicyResponse {
    fn from(p: PolicyWithStats) -> Self {
        Self::new(p.policy, p.tally, p.time_left)
    }
}

/// List policies query.
#[derive(Debug, Deserialize)]
pub struct ListPoliciesQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

fn time_left(policy: &policy::Model) -> String {
    time_left_label(policy.ends_at.map(|dt| dt.with_timezone(&Utc)), Utc::now())
}

// ==================== Handlers ====================

/// List active policies with their stats.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListPoliciesQuery>,
) -> AppResult<ApiResponse<Vec<PolicyResponse>>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let policies = state
        .results_service
        .list_active(category, query.order, Utc::now())
        .await?;

    Ok(ApiResponse::ok(
        policies.into_iter().map(PolicyResponse::from).collect(),
    ))
}

/// Show a policy with its stats.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<PolicyResponse>> {
    let policy = state.policy_service.get(id).await?;
    let tally = state.results_service.tally(id).await?;
    let time_left = time_left(&policy);

    Ok(ApiResponse::ok(PolicyResponse::new(policy, tally, time_left)))
}

/// Publish a policy. Signed-in callers become its author.
async fn create(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePolicyInput>,
) -> AppResult<ApiResponse<PolicyResponse>> {
    let author_id = user.map(|u| u.id);
    let policy = state.policy_service.create(author_id, input).await?;
    let time_left = time_left(&policy);

    Ok(ApiResponse::created(PolicyResponse::new(
        policy,
        VoteTally::default(),
        time_left,
    )))
}

/// Deactivate a policy.
async fn deactivate(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<PolicyResponse>> {
    let policy = state.policy_service.deactivate(user.id, id).await?;
    let tally = state.results_service.tally(id).await?;
    let time_left = time_left(&policy);

    Ok(ApiResponse::ok(PolicyResponse::new(policy, tally, time_left)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show))
        .route("/{id}/deactivate", post(deactivate))
}
