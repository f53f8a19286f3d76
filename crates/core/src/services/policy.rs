//! Policy service.

use chrono::{DateTime, Utc};
use policyai_common::{AppError, AppResult};
use policyai_db::entities::policy;
use policyai_db::repositories::PolicyRepository;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::ai::AiService;
use super::push::PushService;

/// Input for creating a policy.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePolicyInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    /// End of the voting window (UTC).
    pub ends_at: Option<DateTime<Utc>>,
    /// Skips summary generation when present.
    #[validate(length(max = 2000))]
    pub ai_summary: Option<String>,
}

/// Service for publishing and reading policies.
#[derive(Clone)]
pub struct PolicyService {
    policy_repo: PolicyRepository,
    ai: AiService,
    push: PushService,
}

impl PolicyService {
    /// Create a new policy service.
    #[must_use]
    pub const fn new(policy_repo: PolicyRepository, ai: AiService, push: PushService) -> Self {
        Self {
            policy_repo,
            ai,
            push,
        }
    }

    /// Get a policy by ID.
    pub async fn get(&self, id: i32) -> AppResult<policy::Model> {
        self.policy_repo.get_by_id(id).await
    }

    /// Publish a policy.
    ///
    /// AI enrichment runs inline with a bounded timeout and falls back to
    /// fixed text. Subscribers are notified in the background once the row
    /// is committed; delivery failures never reach the caller.
    pub async fn create(
        &self,
        author_id: Option<i32>,
        input: CreatePolicyInput,
    ) -> AppResult<policy::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let enrichment = self
            .ai
            .enrich(
                &input.title,
                &input.description,
                &input.category,
                input.ai_summary.clone(),
            )
            .await;

        let now = Utc::now();
        let model = policy::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(None),
            ends_at: Set(input.ends_at.map(Into::into)),
            ai_summary: Set(Some(enrichment.summary)),
            pros: Set(serde_json::json!(enrichment.pros_cons.pros)),
            cons: Set(serde_json::json!(enrichment.pros_cons.cons)),
            author_id: Set(author_id),
            ..Default::default()
        };

        let policy = self.policy_repo.create(model).await?;
        tracing::info!(policy_id = policy.id, category = %policy.category, "Policy created");

        self.push.spawn_new_policy(policy.title.clone());

        Ok(policy)
    }

    /// Take a policy out of the active listing. Its votes are kept.
    ///
    /// Only the author may deactivate. Anonymous and seeded policies have
    /// no author and cannot be deactivated here.
    pub async fn deactivate(&self, user_id: i32, id: i32) -> AppResult<policy::Model> {
        let policy = self.policy_repo.get_by_id(id).await?;
        if policy.author_id != Some(user_id) {
            return Err(AppError::Forbidden(
                "Only the author can deactivate this policy".to_string(),
            ));
        }
        if !policy.is_active {
            return Ok(policy);
        }

        let mut model: policy::ActiveModel = policy.into();
        model.is_active = Set(false);
        model.updated_at = Set(Some(Utc::now().into()));
        let policy = self.policy_repo.update(model).await?;

        tracing::info!(policy_id = policy.id, user_id, "Policy deactivated");
        Ok(policy)
    }
}
