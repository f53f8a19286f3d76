//! User repository.

use std::sync::Arc;

use crate::db_err;
use crate::entities::{User, user};
use policyai_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Get a user by ID, returning error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by device ID.
    pub async fn find_by_device_id(&self, device_id: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::DeviceId.eq(device_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Find a user by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Create a new user.
    ///
    /// A duplicate device ID or email surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Collect every registered push token.
    pub async fn find_push_tokens(&self) -> AppResult<Vec<String>> {
        let tokens: Vec<Option<String>> = User::find()
            .select_only()
            .column(user::Column::PushToken)
            .filter(user::Column::PushToken.is_not_null())
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(tokens
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .collect())
    }
}
