//! Vote result aggregation.
//!
//! Every read recomputes the tally from current vote rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use policyai_common::AppResult;
use policyai_db::entities::{policy, vote::Stance};
use policyai_db::repositories::{PolicyRepository, SortOrder, StanceCount, VoteRepository};
use serde::Serialize;

const SECONDS_PER_DAY: i64 = 86_400;

/// Vote counts for one policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub support: u64,
    pub oppose: u64,
    pub neutral: u64,
}

impl VoteTally {
    /// Build a tally from grouped stance counts.
    #[must_use]
    pub fn from_counts(counts: &[StanceCount]) -> Self {
        let mut tally = Self::default();
        for c in counts {
            tally.add(c.stance, c.count);
        }
        tally
    }

    /// Add `count` votes for `stance`. Negative counts are ignored.
    pub fn add(&mut self, stance: Stance, count: i64) {
        let count = u64::try_from(count).unwrap_or(0);
        match stance {
            Stance::Support => self.support += count,
            Stance::Oppose => self.oppose += count,
            Stance::Neutral => self.neutral += count,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.support + self.oppose + self.neutral
    }

    #[must_use]
    pub const fn support_percentage(&self) -> u32 {
        percentage(self.support, self.total())
    }

    #[must_use]
    pub const fn oppose_percentage(&self) -> u32 {
        percentage(self.oppose, self.total())
    }

    #[must_use]
    pub const fn neutral_percentage(&self) -> u32 {
        percentage(self.neutral, self.total())
    }
}

/// Share of `count` in `total` as a whole percentage, half rounding up.
///
/// Each stance is rounded independently, so the three values may sum to 99
/// or 101.
#[must_use]
pub const fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count * 100 + total / 2) / total) as u32
}

/// Whole days remaining until `ends_at`, floored. Negative once past.
#[must_use]
pub fn days_left(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (ends_at - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// A policy is closed once less than a full day remains.
///
/// Voting and the "Ended" label share this rule.
#[must_use]
pub fn has_ended(ends_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    ends_at.is_some_and(|ends_at| days_left(ends_at, now) <= 0)
}

/// Human-readable time remaining until `ends_at`.
#[must_use]
pub fn time_left_label(ends_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ends_at) = ends_at else {
        return "No deadline".to_string();
    };

    if has_ended(Some(ends_at), now) {
        "Ended".to_string()
    } else {
        format!("{} days left", days_left(ends_at, now))
    }
}

/// Results for one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyResults {
    pub policy_id: i32,
    pub total_votes: u64,
    pub support_count: u64,
    pub oppose_count: u64,
    pub neutral_count: u64,
    pub support_percentage: u32,
    pub oppose_percentage: u32,
    pub neutral_percentage: u32,
}

impl PolicyResults {
    #[must_use]
    pub const fn new(policy_id: i32, tally: VoteTally) -> Self {
        Self {
            policy_id,
            total_votes: tally.total(),
            support_count: tally.support,
            oppose_count: tally.oppose,
            neutral_count: tally.neutral,
            support_percentage: tally.support_percentage(),
            oppose_percentage: tally.oppose_percentage(),
            neutral_percentage: tally.neutral_percentage(),
        }
    }
}

/// A policy with its current tally, as shown in listings.
#[derive(Debug, Clone)]
pub struct PolicyWithStats {
    pub policy: policy::Model,
    pub tally: VoteTally,
    pub time_left: String,
}

/// Computes vote results for one or many policies.
#[derive(Clone)]
pub struct ResultsService {
    policy_repo: PolicyRepository,
    vote_repo: VoteRepository,
}

impl ResultsService {
    #[must_use]
    pub const fn new(policy_repo: PolicyRepository, vote_repo: VoteRepository) -> Self {
        Self {
            policy_repo,
            vote_repo,
        }
    }

    /// Tally for a single existing policy.
    pub async fn results(&self, policy_id: i32) -> AppResult<PolicyResults> {
        self.policy_repo.get_by_id(policy_id).await?;
        let tally = self.tally(policy_id).await?;
        Ok(PolicyResults::new(policy_id, tally))
    }

    /// Tally for a policy already known to exist.
    pub async fn tally(&self, policy_id: i32) -> AppResult<VoteTally> {
        let counts = self.vote_repo.count_by_stance(policy_id).await?;
        Ok(VoteTally::from_counts(&counts))
    }

    /// Active policies with their tallies, using one grouped vote query.
    pub async fn list_active(
        &self,
        category: Option<&str>,
        order: SortOrder,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<PolicyWithStats>> {
        let policies = self.policy_repo.find_active(category, order).await?;
        let ids: Vec<i32> = policies.iter().map(|p| p.id).collect();
        let counts = self.vote_repo.count_by_policies(&ids).await?;

        let mut tallies: HashMap<i32, VoteTally> = HashMap::with_capacity(ids.len());
        for row in counts {
            tallies
                .entry(row.policy_id)
                .or_default()
                .add(row.stance, row.count);
        }

        Ok(policies
            .into_iter()
            .map(|policy| {
                let tally = tallies.get(&policy.id).copied().unwrap_or_default();
                let time_left =
                    time_left_label(policy.ends_at.map(|t| t.with_timezone(&Utc)), now);
                PolicyWithStats {
                    policy,
                    tally,
                    time_left,
                }
            })
            .collect())
    }
}
