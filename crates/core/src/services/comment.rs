//! Comment service.

use chrono::{DateTime, FixedOffset, Utc};
use policyai_common::{AppError, AppResult};
use policyai_db::entities::comment;
use policyai_db::repositories::{CommentRepository, PolicyRepository, SortOrder};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::identity::{Identity, IdentityService};

/// Display name used when a comment's author row is gone.
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

/// A comment as shown under a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub policy_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<FixedOffset>,
    pub is_own: bool,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    policy_repo: PolicyRepository,
    identity: IdentityService,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        policy_repo: PolicyRepository,
        identity: IdentityService,
    ) -> Self {
        Self {
            comment_repo,
            policy_repo,
            identity,
        }
    }

    /// List a policy's comments.
    ///
    /// `viewer` only drives the `is_own` flag; an unknown viewer is not
    /// created.
    pub async fn list(
        &self,
        policy_id: i32,
        viewer: Option<&Identity>,
        order: SortOrder,
    ) -> AppResult<Vec<CommentView>> {
        self.policy_repo.get_by_id(policy_id).await?;

        let viewer_id = match viewer {
            Some(identity) => self.identity.find(identity).await?.map(|u| u.id),
            None => None,
        };

        let rows = self.comment_repo.find_by_policy(policy_id, order).await?;
        Ok(rows
            .into_iter()
            .map(|(comment, author)| CommentView {
                is_own: viewer_id == Some(comment.user_id),
                user_name: author.map_or_else(|| UNKNOWN_AUTHOR.to_string(), |u| u.name),
                id: comment.id,
                policy_id: comment.policy_id,
                user_id: comment.user_id,
                text: comment.text,
                created_at: comment.created_at,
            })
            .collect())
    }

    /// Count a policy's comments.
    pub async fn count(&self, policy_id: i32) -> AppResult<u64> {
        self.policy_repo.get_by_id(policy_id).await?;
        self.comment_repo.count_by_policy(policy_id).await
    }

    /// Post a comment, creating the device user on first sight.
    pub async fn create(
        &self,
        identity: &Identity,
        policy_id: i32,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if input.text.trim().is_empty() {
            return Err(AppError::Validation(
                "Comment text cannot be blank".to_string(),
            ));
        }

        self.policy_repo.get_by_id(policy_id).await?;
        let user = self.identity.resolve(identity).await?;

        let model = comment::ActiveModel {
            policy_id: Set(policy_id),
            user_id: Set(user.id),
            text: Set(input.text),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let comment = self.comment_repo.create(model).await?;

        tracing::debug!(comment_id = comment.id, policy_id, user_id = user.id, "Comment created");

        Ok(CommentView {
            id: comment.id,
            policy_id: comment.policy_id,
            user_id: comment.user_id,
            user_name: user.name,
            text: comment.text,
            created_at: comment.created_at,
            is_own: true,
        })
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete(&self, identity: &Identity, comment_id: i32) -> AppResult<()> {
        let user = self
            .identity
            .find(identity)
            .await?
            .ok_or_else(|| AppError::UserNotFound("requesting user".to_string()))?;

        let comment = self.comment_repo.get_by_id(comment_id).await?;
        if comment.user_id != user.id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id).await?;
        tracing::info!(comment_id, user_id = user.id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use policyai_db::entities::{policy, user, user::AuthProvider};
    use policyai_db::repositories::UserRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    const DEVICE: &str = "device-commenter-1";

    fn service(db: DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(db.clone()),
            PolicyRepository::new(db.clone()),
            IdentityService::new(UserRepository::new(db)),
        )
    }

    fn test_policy(id: i32) -> policy::Model {
        policy::Model {
            id,
            title: "Farmers Income Support".to_string(),
            description: "Direct transfers".to_string(),
            category: "Agriculture".to_string(),
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
            ends_at: None,
            ai_summary: None,
            pros: json!([]),
            cons: json!([]),
            author_id: None,
        }
    }

    fn test_user(id: i32, name: &str) -> user::Model {
        user::Model {
            id,
            device_id: Some(DEVICE.to_string()),
            email: None,
            name: name.to_string(),
            avatar_url: None,
            auth_provider: AuthProvider::Device,
            is_verified: false,
            push_token: None,
            created_at: Utc::now().into(),
            last_login_at: None,
            updated_at: None,
        }
    }

    fn test_comment(id: i32, user_id: i32) -> comment::Model {
        comment::Model {
            id,
            policy_id: 1,
            user_id,
            text: "I support this".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_list_marks_own_comments() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_policy(1)]])
            .append_query_results([[test_user(1, "User_device-c")]])
            .append_query_results([vec![
                (test_comment(2, 1), test_user(1, "User_device-c")),
                (test_comment(3, 5), test_user(5, "Priya")),
            ]])
            .into_connection();

        let viewer = Identity::Device(DEVICE.to_string());
        let comments = service(db)
            .list(1, Some(&viewer), SortOrder::Newest)
            .await
            .unwrap();

        assert_eq!(comments.len(), 2);
        assert!(comments[0].is_own);
        assert!(!comments[1].is_own);
        assert_eq!(comments[1].user_name, "Priya");
    }

    #[tokio::test]
    async fn test_create_rejects_overlong_text() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .create(
                &Identity::Device(DEVICE.to_string()),
                1,
                CreateCommentInput {
                    text: "x".repeat(1001),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_text() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .create(
                &Identity::Device(DEVICE.to_string()),
                1,
                CreateCommentInput {
                    text: "   ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_returns_own_view() {
        let author = test_user(1, "User_device-c");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_policy(1)]])
            .append_query_results([[test_comment(9, 1)]])
            .into_connection();

        let view = service(db)
            .create(
                &Identity::User(author),
                1,
                CreateCommentInput {
                    text: "I support this".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.id, 9);
        assert!(view.is_own);
        assert_eq!(view.user_name, "User_device-c");
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(4, 7)]])
            .into_connection();

        let result = service(db)
            .delete(&Identity::User(test_user(1, "User_device-c")), 4)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_own_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(4, 1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = service(db)
            .delete(&Identity::User(test_user(1, "User_device-c")), 4)
            .await;

        assert!(result.is_ok());
    }
}
