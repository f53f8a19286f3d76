//! Vote ledger: one stance per user per policy.

use chrono::{DateTime, Utc};
use policyai_common::{AppError, AppResult};
use policyai_db::entities::{policy, vote, vote::Stance};
use policyai_db::repositories::{PolicyRepository, VoteRepository};

use super::identity::{Identity, IdentityService};
use super::results::has_ended;

/// Parse a client-supplied stance.
pub fn parse_stance(raw: &str) -> AppResult<Stance> {
    raw.parse::<Stance>().map_err(AppError::Validation)
}

/// Reject votes on deactivated or ended policies.
pub fn ensure_open(policy: &policy::Model, now: DateTime<Utc>) -> AppResult<()> {
    if !policy.is_active {
        return Err(AppError::BadRequest(format!(
            "Policy {} is no longer active",
            policy.id
        )));
    }
    if has_ended(policy.ends_at.map(|t| t.with_timezone(&Utc)), now) {
        return Err(AppError::BadRequest(format!(
            "Voting on policy {} has ended",
            policy.id
        )));
    }
    Ok(())
}

/// Vote service.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    policy_repo: PolicyRepository,
    identity: IdentityService,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        policy_repo: PolicyRepository,
        identity: IdentityService,
    ) -> Self {
        Self {
            vote_repo,
            policy_repo,
            identity,
        }
    }

    /// Cast or change a vote.
    ///
    /// The stance is validated before anything is read or written. An
    /// existing vote keeps its id and `created_at`; only the stance changes.
    pub async fn cast_vote(
        &self,
        identity: &Identity,
        policy_id: i32,
        stance: &str,
    ) -> AppResult<vote::Model> {
        let stance = parse_stance(stance)?;
        if let Identity::Device(device_id) = identity {
            super::identity::validate_device_id(device_id)?;
        }

        let policy = self.policy_repo.get_by_id(policy_id).await?;
        ensure_open(&policy, Utc::now())?;

        let user = self.identity.resolve(identity).await?;

        let vote = match self.vote_repo.upsert(user.id, policy_id, stance).await {
            Ok(vote) => vote,
            Err(AppError::Conflict(_)) => self
                .vote_repo
                .update_stance(user.id, policy_id, stance)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Vote by user {} on policy {policy_id} vanished after conflict",
                        user.id
                    ))
                })?,
            Err(e) => return Err(e),
        };

        tracing::info!(
            user_id = user.id,
            policy_id = policy_id,
            stance = %vote.stance,
            "Vote recorded"
        );
        Ok(vote)
    }

    /// Withdraw a vote.
    ///
    /// Reports `NotFound` when the policy, the user or the vote is missing,
    /// so a second withdrawal fails.
    pub async fn withdraw_vote(&self, identity: &Identity, policy_id: i32) -> AppResult<()> {
        if let Identity::Device(device_id) = identity {
            super::identity::validate_device_id(device_id)?;
        }

        self.policy_repo.get_by_id(policy_id).await?;

        let user = self
            .identity
            .find(identity)
            .await?
            .ok_or_else(|| AppError::UserNotFound(describe(identity)))?;

        let deleted = self
            .vote_repo
            .delete_by_user_and_policy(user.id, policy_id)
            .await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!(
                "No vote by user {} on policy {policy_id}",
                user.id
            )));
        }

        tracing::info!(user_id = user.id, policy_id = policy_id, "Vote withdrawn");
        Ok(())
    }
}

fn describe(identity: &Identity) -> String {
    match identity {
        Identity::User(user) => user.id.to_string(),
        Identity::Device(device_id) => format!("device {device_id}"),
    }
}
