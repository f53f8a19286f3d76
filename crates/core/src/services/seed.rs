//! Sample data for an empty database.

use chrono::{Duration, Utc};
use policyai_common::AppResult;
use policyai_db::entities::policy;
use policyai_db::repositories::PolicyRepository;
use sea_orm::Set;

use super::ai::{ProsCons, fallback_summary};

/// (title, description, category, days until voting ends)
const SAMPLE_POLICIES: [(&str, &str, &str, i64); 6] = [
    (
        "National Education Reform Act 2025",
        "Comprehensive reform focusing on digital literacy, teacher training, and infrastructure development in rural schools.",
        "Education",
        15,
    ),
    (
        "Universal Healthcare Expansion",
        "Expansion of government healthcare coverage to include mental health services and preventive care for all citizens.",
        "Healthcare",
        20,
    ),
    (
        "Smart City Infrastructure Development",
        "₹50,000 crore investment in upgrading urban infrastructure with focus on sustainable transportation and waste management.",
        "Infrastructure",
        10,
    ),
    (
        "Digital India 2.0 Initiative",
        "Accelerating digital transformation with focus on AI, blockchain adoption in government services, and cybersecurity.",
        "Technology",
        25,
    ),
    (
        "Farmers Income Support Scheme",
        "Direct income support of ₹12,000 per year to small and marginal farmers with crop insurance coverage.",
        "Agriculture",
        18,
    ),
    (
        "Affordable Housing Mission 2025",
        "Construction of 2 million affordable housing units in urban areas with focus on sustainable building practices.",
        "Housing",
        30,
    ),
];

/// Insert the sample policies when no policy exists yet.
///
/// Returns the number of inserted policies.
pub async fn seed_sample_policies(policy_repo: &PolicyRepository) -> AppResult<usize> {
    if policy_repo.count().await? > 0 {
        tracing::debug!("Policies present, skipping seed");
        return Ok(0);
    }

    let now = Utc::now();
    let pros_cons = ProsCons::fallback();
    for (title, description, category, days) in SAMPLE_POLICIES {
        let model = policy::ActiveModel {
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            category: Set(category.to_string()),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(None),
            ends_at: Set(Some((now + Duration::days(days)).into())),
            ai_summary: Set(Some(fallback_summary(description))),
            pros: Set(serde_json::json!(pros_cons.pros)),
            cons: Set(serde_json::json!(pros_cons.cons)),
            author_id: Set(None),
            ..Default::default()
        };
        policy_repo.create(model).await?;
    }

    tracing::info!(count = SAMPLE_POLICIES.len(), "Seeded sample policies");
    Ok(SAMPLE_POLICIES.len())
}
