//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use policyai_common::AppResult;
use policyai_core::{CommentView, CreateCommentInput};
use policyai_db::repositories::SortOrder;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{ApiResponse, Message},
};

// ==================== Request/Response Types ====================

/// List comments query.
#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    pub device_id: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Comment on the policy in the path.
#[derive(Debug, Deserialize)]
pub struct PolicyCommentRequest {
    pub device_id: Option<String>,
    pub text: String,
}

/// Comment with the policy in the body.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub policy_id: i32,
    pub device_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentQuery {
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentCount {
    pub policy_id: i32,
    pub total_comments: u64,
}

// ==================== Handlers ====================

async fn list(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
    Query(query): Query<ListCommentsQuery>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let viewer = auth.optional_identity(query.device_id);
    let comments = state
        .comment_service
        .list(policy_id, viewer.as_ref(), query.sort)
        .await?;

    Ok(ApiResponse::ok(comments))
}

async fn count(
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
) -> AppResult<ApiResponse<CommentCount>> {
    let total_comments = state.comment_service.count(policy_id).await?;

    Ok(ApiResponse::ok(CommentCount {
        policy_id,
        total_comments,
    }))
}

async fn create_for_policy(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(policy_id): Path<i32>,
    Json(req): Json<PolicyCommentRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let identity = auth.identity(req.device_id)?;
    let comment = state
        .comment_service
        .create(&identity, policy_id, CreateCommentInput { text: req.text })
        .await?;

    Ok(ApiResponse::created(comment))
}

async fn create(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let identity = auth.identity(req.device_id)?;
    let comment = state
        .comment_service
        .create(&identity, req.policy_id, CreateCommentInput { text: req.text })
        .await?;

    Ok(ApiResponse::created(comment))
}

async fn remove(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
    Query(query): Query<DeleteCommentQuery>,
) -> AppResult<ApiResponse<Message>> {
    let identity = auth.identity(query.device_id)?;
    state.comment_service.delete(&identity, comment_id).await?;

    Ok(ApiResponse::ok(Message::new("Comment deleted successfully")))
}

/// Routes nested under `/policies`.
pub fn policy_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/comments", get(list).post(create_for_policy))
        .route("/{id}/comments/count", get(count))
}

/// Routes nested under `/comments`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}", delete(remove))
}
