//! Policy repository.

use std::sync::Arc;

use super::SortOrder;
use crate::db_err;
use crate::entities::{Policy, policy};
use policyai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Policy repository for database operations.
#[derive(Clone)]
pub struct PolicyRepository {
    db: Arc<DatabaseConnection>,
}

impl PolicyRepository {
    /// Create a new policy repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a policy by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<policy::Model>> {
        Policy::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Get a policy by ID, returning error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<policy::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(AppError::PolicyNotFound(id))
    }

    /// List active policies, optionally restricted to one category.
    pub async fn find_active(
        &self,
        category: Option<&str>,
        order: SortOrder,
    ) -> AppResult<Vec<policy::Model>> {
        let mut query = Policy::find().filter(policy::Column::IsActive.eq(true));

        if let Some(category) = category {
            query = query.filter(policy::Column::Category.eq(category));
        }

        query = match order {
            SortOrder::Newest => query
                .order_by_desc(policy::Column::CreatedAt)
                .order_by_desc(policy::Column::Id),
            SortOrder::Oldest => query
                .order_by_asc(policy::Column::CreatedAt)
                .order_by_asc(policy::Column::Id),
        };

        query.all(self.db.as_ref()).await.map_err(db_err)
    }

    /// Create a new policy.
    pub async fn create(&self, model: policy::ActiveModel) -> AppResult<policy::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a policy.
    pub async fn update(&self, model: policy::ActiveModel) -> AppResult<policy::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Count all policies, active or not.
    pub async fn count(&self) -> AppResult<u64> {
        Policy::find().count(self.db.as_ref()).await.map_err(db_err)
    }
}
