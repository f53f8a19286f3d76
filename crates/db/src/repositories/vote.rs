//! Vote repository.
//!
//! The `uq_vote_user_policy` unique index is the only guard against
//! duplicate votes; writes here lean on it instead of read-then-write.

use std::sync::Arc;

use crate::db_err;
use crate::entities::{Policy, Vote, policy, vote, vote::Stance};
use chrono::Utc;
use policyai_common::AppResult;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, OnConflict},
};

/// Number of votes cast for one stance.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct StanceCount {
    /// Stance.
    pub stance: Stance,
    /// Number of votes.
    pub count: i64,
}

/// Number of votes cast for one stance on one policy.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct PolicyStanceCount {
    /// Policy ID.
    pub policy_id: i32,
    /// Stance.
    pub stance: Stance,
    /// Number of votes.
    pub count: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote or overwrite the stance of the existing one.
    ///
    /// Runs as `INSERT .. ON CONFLICT (user_id, policy_id) DO UPDATE SET
    /// stance = excluded.stance RETURNING *`, so the row id and
    /// `created_at` of an existing vote are kept.
    pub async fn upsert(
        &self,
        user_id: i32,
        policy_id: i32,
        stance: Stance,
    ) -> AppResult<vote::Model> {
        let model = vote::ActiveModel {
            user_id: Set(user_id),
            policy_id: Set(policy_id),
            stance: Set(stance),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        Vote::insert(model)
            .on_conflict(
                OnConflict::columns([vote::Column::UserId, vote::Column::PolicyId])
                    .update_column(vote::Column::Stance)
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Overwrite the stance of an existing vote.
    ///
    /// Returns `None` when the user has no vote on the policy.
    pub async fn update_stance(
        &self,
        user_id: i32,
        policy_id: i32,
        stance: Stance,
    ) -> AppResult<Option<vote::Model>> {
        let updated = Vote::update_many()
            .col_expr(vote::Column::Stance, Expr::value(stance))
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PolicyId.eq(policy_id))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(updated.into_iter().next())
    }

    /// Delete the vote a user cast on a policy.
    ///
    /// Returns the number of deleted rows (0 or 1).
    pub async fn delete_by_user_and_policy(&self, user_id: i32, policy_id: i32) -> AppResult<u64> {
        let result = Vote::delete_many()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PolicyId.eq(policy_id))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Count votes per stance on one policy.
    pub async fn count_by_stance(&self, policy_id: i32) -> AppResult<Vec<StanceCount>> {
        Vote::find()
            .select_only()
            .column(vote::Column::Stance)
            .column_as(vote::Column::Id.count(), "count")
            .filter(vote::Column::PolicyId.eq(policy_id))
            .group_by(vote::Column::Stance)
            .into_model::<StanceCount>()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Count votes per (policy, stance) for many policies in one query.
    pub async fn count_by_policies(&self, policy_ids: &[i32]) -> AppResult<Vec<PolicyStanceCount>> {
        if policy_ids.is_empty() {
            return Ok(Vec::new());
        }

        Vote::find()
            .select_only()
            .column(vote::Column::PolicyId)
            .column(vote::Column::Stance)
            .column_as(vote::Column::Id.count(), "count")
            .filter(vote::Column::PolicyId.is_in(policy_ids.iter().copied()))
            .group_by(vote::Column::PolicyId)
            .group_by(vote::Column::Stance)
            .into_model::<PolicyStanceCount>()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Count a user's votes per stance.
    pub async fn count_by_stance_for_user(&self, user_id: i32) -> AppResult<Vec<StanceCount>> {
        Vote::find()
            .select_only()
            .column(vote::Column::Stance)
            .column_as(vote::Column::Id.count(), "count")
            .filter(vote::Column::UserId.eq(user_id))
            .group_by(vote::Column::Stance)
            .into_model::<StanceCount>()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// A user's votes with their policies, newest first.
    pub async fn find_history(
        &self,
        user_id: i32,
    ) -> AppResult<Vec<(vote::Model, Option<policy::Model>)>> {
        Vote::find()
            .find_also_related(Policy)
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::CreatedAt)
            .order_by_desc(vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }
}
