//! Comment repository.

use std::sync::Arc;

use super::SortOrder;
use crate::db_err;
use crate::entities::{Comment, User, comment, user};
use policyai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Get a comment by ID, returning error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {id}")))
    }

    /// List a policy's comments with their authors.
    pub async fn find_by_policy(
        &self,
        policy_id: i32,
        order: SortOrder,
    ) -> AppResult<Vec<(comment::Model, Option<user::Model>)>> {
        let query = Comment::find()
            .find_also_related(User)
            .filter(comment::Column::PolicyId.eq(policy_id));

        let query = match order {
            SortOrder::Newest => query
                .order_by_desc(comment::Column::CreatedAt)
                .order_by_desc(comment::Column::Id),
            SortOrder::Oldest => query
                .order_by_asc(comment::Column::CreatedAt)
                .order_by_asc(comment::Column::Id),
        };

        query.all(self.db.as_ref()).await.map_err(db_err)
    }

    /// Count a policy's comments.
    pub async fn count_by_policy(&self, policy_id: i32) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::PolicyId.eq(policy_id))
            .count(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Delete a comment.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
