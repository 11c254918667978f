// SPDX-License-Identifier: Apache-2.0

use crate::invite::Referral;
use crate::validation::{check_len, optional_text, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum registered referrals to appear in the achievers list.
pub const ACHIEVER_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    #[default]
    Active,
    Inactive,
}

wire_enum!(RewardStatus, "reward status", {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Pending,
    Granted,
}

wire_enum!(ClaimStatus, "claim status", {
    Pending => "pending",
    Granted => "granted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTier {
    pub required_referrals: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const DEFAULT_REWARD_TIERS: [RewardTier; 3] = [
    RewardTier {
        required_referrals: 10,
        title: "Original merchandise",
        description: "Limited junkan goods for members who brought in 10 people.",
        icon: "Gift",
    },
    RewardTier {
        required_referrals: 100,
        title: "Private dinner invitation",
        description: "A seat at the members-only dinner for 100 referrals.",
        icon: "Star",
    },
    RewardTier {
        required_referrals: 1000,
        title: "Lifetime diamond membership",
        description: "Permanent diamond rank for 1000 referrals.",
        icon: "Crown",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub required_referrals: u32,
    pub icon: String,
    pub status: RewardStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardWithStats {
    #[serde(flatten)]
    pub reward: Reward,
    pub achieved_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achiever {
    pub id: String,
    pub name: String,
    pub referrals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaim {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub status: ClaimStatus,
    pub claimed_at: DateTime<Utc>,
    pub granted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRewardView {
    #[serde(flatten)]
    pub reward: Reward,
    pub referral_count: u32,
    pub achieved: bool,
    pub claim: Option<RewardClaim>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewardUpdateInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardUpdate {
    pub title: String,
    pub description: Option<String>,
}

impl RewardUpdateInput {
    pub fn validate(self) -> Result<RewardUpdate, ValidationError> {
        let mut errors = Vec::new();
        let title = self.title.trim().to_string();
        check_len(&mut errors, "title", &title, 1, 200);
        let description = optional_text(self.description);
        if let Some(d) = &description {
            check_len(&mut errors, "description", d, 0, 1000);
        }
        ValidationError::check(errors)?;
        Ok(RewardUpdate { title, description })
    }
}

/// Registered referrals per referrer.
#[must_use]
pub fn referral_counts(referrals: &[Referral]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for referral in referrals.iter().filter(|r| r.registered_at.is_some()) {
        *counts.entry(referral.referrer_id.clone()).or_insert(0) += 1;
    }
    counts
}

#[must_use]
pub fn achieved_count(counts: &BTreeMap<String, u32>, required: u32) -> usize {
    counts.values().filter(|count| **count >= required).count()
}

/// Referrers at or above [`ACHIEVER_THRESHOLD`], most referrals first.
#[must_use]
pub fn achievers(
    counts: &BTreeMap<String, u32>,
    names: &BTreeMap<String, String>,
) -> Vec<Achiever> {
    let mut out: Vec<Achiever> = counts
        .iter()
        .filter(|(_, count)| **count >= ACHIEVER_THRESHOLD)
        .map(|(id, count)| Achiever {
            id: id.clone(),
            name: names
                .get(id)
                .cloned()
                .unwrap_or_else(|| "(unset)".to_string()),
            referrals: *count,
        })
        .collect();
    out.sort_by(|a, b| b.referrals.cmp(&a.referrals).then_with(|| a.id.cmp(&b.id)));
    out
}
