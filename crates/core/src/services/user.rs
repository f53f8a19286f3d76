//! User profile service.

use chrono::{DateTime, FixedOffset, Utc};
use policyai_common::{AppError, AppResult};
use policyai_db::entities::{
    user::{self, AuthProvider},
    vote::Stance,
};
use policyai_db::repositories::{UserRepository, VoteRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::identity::{Identity, IdentityService};
use super::results::VoteTally;

/// Points awarded per vote cast.
pub const POINTS_PER_VOTE: u64 = 10;

/// Input for renaming a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Voting statistics shown on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VotingStats {
    pub total_votes: u64,
    pub support_votes: u64,
    pub oppose_votes: u64,
    pub neutral_votes: u64,
    pub points: u64,
}

impl From<VoteTally> for VotingStats {
    fn from(tally: VoteTally) -> Self {
        Self {
            total_votes: tally.total(),
            support_votes: tally.support,
            oppose_votes: tally.oppose,
            neutral_votes: tally.neutral,
            points: tally.total() * POINTS_PER_VOTE,
        }
    }
}

/// A user with voting statistics.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub auth_provider: AuthProvider,
    pub is_verified: bool,
    pub created_at: DateTime<FixedOffset>,
    pub stats: VotingStats,
}

/// One entry of a user's voting history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteHistoryEntry {
    pub vote_id: i32,
    pub policy_id: i32,
    pub policy_title: String,
    pub policy_category: String,
    pub stance: Stance,
    pub voted_at: DateTime<FixedOffset>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    vote_repo: VoteRepository,
    identity: IdentityService,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        vote_repo: VoteRepository,
        identity: IdentityService,
    ) -> Self {
        Self {
            user_repo,
            vote_repo,
            identity,
        }
    }

    /// Profile of the requesting user.
    pub async fn profile(&self, identity: &Identity) -> AppResult<UserProfile> {
        let user = self.identity.resolve(identity).await?;
        let counts = self.vote_repo.count_by_stance_for_user(user.id).await?;
        let stats = VotingStats::from(VoteTally::from_counts(&counts));

        Ok(UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            auth_provider: user.auth_provider,
            is_verified: user.is_verified,
            created_at: user.created_at,
            stats,
        })
    }

    /// Votes cast by the requesting user, newest first.
    pub async fn voting_history(&self, identity: &Identity) -> AppResult<Vec<VoteHistoryEntry>> {
        let user = self.identity.resolve(identity).await?;
        let rows = self.vote_repo.find_history(user.id).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(vote, policy)| {
                let policy = policy?;
                Some(VoteHistoryEntry {
                    vote_id: vote.id,
                    policy_id: policy.id,
                    policy_title: policy.title,
                    policy_category: policy.category,
                    stance: vote.stance,
                    voted_at: vote.created_at,
                })
            })
            .collect())
    }

    /// Rename the requesting user.
    pub async fn update_name(
        &self,
        identity: &Identity,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be blank".to_string()));
        }

        let user = self.identity.resolve(identity).await?;
        let mut model: user::ActiveModel = user.into();
        model.name = Set(name);
        model.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(model).await
    }

    /// Register or clear the push token of the requesting user.
    pub async fn set_push_token(
        &self,
        identity: &Identity,
        token: Option<String>,
    ) -> AppResult<user::Model> {
        let token = token.filter(|t| !t.trim().is_empty());
        let user = self.identity.resolve(identity).await?;

        let mut model: user::ActiveModel = user.into();
        model.push_token = Set(token);
        model.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(model).await?;

        tracing::debug!(user_id = user.id, registered = user.push_token.is_some(), "Push token updated");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use policyai_db::entities::{policy, vote};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use serde_json::json;
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> UserService {
        let db = Arc::new(db);
        UserService::new(
            UserRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            IdentityService::new(UserRepository::new(db)),
        )
    }

    fn test_user(id: i32) -> user::Model {
        user::Model {
            id,
            device_id: Some("device-profile-01".to_string()),
            email: None,
            name: "User_device-p".to_string(),
            avatar_url: None,
            auth_provider: AuthProvider::Device,
            is_verified: false,
            push_token: None,
            created_at: Utc::now().into(),
            last_login_at: None,
            updated_at: None,
        }
    }

    fn test_policy(id: i32, title: &str) -> policy::Model {
        policy::Model {
            id,
            title: title.to_string(),
            description: "desc".to_string(),
            category: "Housing".to_string(),
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

    #[test]
    fn test_points_are_ten_per_vote() {
        let stats = VotingStats::from(VoteTally {
            support: 2,
            oppose: 1,
            neutral: 1,
        });
        assert_eq!(stats.total_votes, 4);
        assert_eq!(stats.points, 40);
    }

    #[tokio::test]
    async fn test_profile_counts_votes_by_stance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                maplit::btreemap! {
                    "stance" => Value::from("support"),
                    "count" => Value::BigInt(Some(3)),
                },
                maplit::btreemap! {
                    "stance" => Value::from("neutral"),
                    "count" => Value::BigInt(Some(1)),
                },
            ]])
            .into_connection();

        let profile = service(db)
            .profile(&Identity::User(test_user(1)))
            .await
            .unwrap();

        assert_eq!(profile.stats.support_votes, 3);
        assert_eq!(profile.stats.oppose_votes, 0);
        assert_eq!(profile.stats.points, 40);
    }

    #[tokio::test]
    async fn test_voting_history_joins_policy() {
        let vote = vote::Model {
            id: 11,
            user_id: 1,
            policy_id: 6,
            stance: Stance::Oppose,
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(vote, test_policy(6, "Affordable Housing Mission"))]])
            .into_connection();

        let history = service(db)
            .voting_history(&Identity::User(test_user(1)))
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].policy_title, "Affordable Housing Mission");
        assert_eq!(history[0].policy_category, "Housing");
        assert_eq!(history[0].stance, Stance::Oppose);
    }

    #[tokio::test]
    async fn test_update_name_rejects_blank() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .update_name(
                &Identity::User(test_user(1)),
                UpdateProfileInput {
                    name: "   ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_push_token_clears_on_empty() {
        let mut with_token = test_user(1);
        with_token.push_token = Some("fcm-token".to_string());
        let cleared = test_user(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[cleared]])
            .into_connection();

        let user = service(db)
            .set_push_token(&Identity::User(with_token), Some(String::new()))
            .await
            .unwrap();

        assert!(user.push_token.is_none());
    }
}
