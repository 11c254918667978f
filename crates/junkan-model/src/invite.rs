// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uppercase letters and digits without 0/O/1/I.
pub const INVITE_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;
pub const INITIAL_INVITE_SLOTS: u32 = 2;

#[must_use]
pub fn invite_code_from_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(INVITE_CODE_LEN)
        .map(|b| char::from(INVITE_CODE_ALPHABET[usize::from(*b) % INVITE_CODE_ALPHABET.len()]))
        .collect()
}

/// Codes match case-insensitively; the stored form is uppercase.
#[must_use]
pub fn normalize_invite_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    pub id: String,
    pub code: String,
    pub created_by: String,
    pub used_by: Option<String>,
    pub is_used: bool,
    pub click_count: u64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSlots {
    pub initial_slots: u32,
    pub bonus_slots: u32,
    pub used_slots: u32,
}

impl InviteSlots {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.initial_slots.saturating_add(self.bonus_slots)
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total().saturating_sub(self.used_slots)
    }
}

impl Default for InviteSlots {
    fn default() -> Self {
        Self {
            initial_slots: INITIAL_INVITE_SLOTS,
            bonus_slots: 0,
            used_slots: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_id: Option<String>,
    pub invite_code_id: Option<String>,
    pub clicked_at: DateTime<Utc>,
    pub registered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteVerification {
    pub valid: bool,
    pub referrer_name: Option<String>,
}

impl InviteVerification {
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            referrer_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    pub referral_count: u64,
    pub click_count: u64,
    /// Percentage with one decimal, `"0"` when nothing was clicked.
    pub conversion_rate: String,
}

impl ReferralStats {
    #[must_use]
    pub fn from_referrals(referrals: &[Referral]) -> Self {
        let click_count = referrals.len() as u64;
        let referral_count = referrals
            .iter()
            .filter(|r| r.registered_at.is_some())
            .count() as u64;
        let conversion_rate = if click_count == 0 {
            "0".to_string()
        } else {
            format!("{:.1}", referral_count as f64 / click_count as f64 * 100.0)
        };
        Self {
            referral_count,
            click_count,
            conversion_rate,
        }
    }
}

/// Actions that each earn one bonus invite slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockCondition {
    #[serde(rename = "content_views_3")]
    ContentViews3,
    ProfileCompleted,
    FirstShare,
    FeedbackSent,
}

wire_enum!(UnlockCondition, "unlock condition", {
    ContentViews3 => "content_views_3",
    ProfileCompleted => "profile_completed",
    FirstShare => "first_share",
    FeedbackSent => "feedback_sent",
});

impl UnlockCondition {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ContentViews3 => "View 3 contents",
            Self::ProfileCompleted => "Complete your profile",
            Self::FirstShare => "Share content for the first time",
            Self::FeedbackSent => "Send feedback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockConditionState {
    pub key: UnlockCondition,
    pub label: String,
    pub done: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn referral(registered: bool) -> Referral {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().expect("ts");
        Referral {
            id: "r".to_string(),
            referrer_id: "u1".to_string(),
            referred_id: None,
            invite_code_id: None,
            clicked_at: at,
            registered_at: registered.then_some(at),
        }
    }

    #[test]
    fn conversion_rate_has_one_decimal() {
        let stats = ReferralStats::from_referrals(&[referral(true), referral(false), referral(false)]);
        assert_eq!(stats.click_count, 3);
        assert_eq!(stats.referral_count, 1);
        assert_eq!(stats.conversion_rate, "33.3");
        assert_eq!(ReferralStats::from_referrals(&[]).conversion_rate, "0");
        assert_eq!(
            ReferralStats::from_referrals(&[referral(true)]).conversion_rate,
            "100.0"
        );
    }

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        let code = invite_code_from_bytes(&[0, 31, 32, 255, 7, 8, 9, 10, 11, 12]);
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert_eq!(&code[..3], "A9A");
        assert!(code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b)));
        assert_eq!(normalize_invite_code(" abcd2345 "), "ABCD2345");
    }

    #[test]
    fn slots_and_redeemability() {
        let slots = InviteSlots {
            initial_slots: 2,
            bonus_slots: 1,
            used_slots: 4,
        };
        assert_eq!(slots.remaining(), 0);
        assert_eq!(InviteSlots::default().remaining(), 2);

        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().expect("ts");
        let mut code = InviteCode {
            id: "i".to_string(),
            code: "ABCD2345".to_string(),
            created_by: "u1".to_string(),
            used_by: None,
            is_used: false,
            click_count: 0,
            expires_at: Some(now + Duration::days(1)),
            created_at: now,
        };
        assert!(code.is_redeemable(now));
        code.expires_at = Some(now);
        assert!(!code.is_redeemable(now));
        code.expires_at = None;
        code.is_used = true;
        assert!(!code.is_redeemable(now));
    }

    #[test]
    fn unlock_condition_wire_names() {
        assert_eq!(UnlockCondition::ContentViews3.as_str(), "content_views_3");
        let json = serde_json::to_string(&UnlockCondition::ContentViews3).expect("json");
        assert_eq!(json, "\"content_views_3\"");
        assert_eq!(UnlockCondition::ALL.len(), 4);
    }
}
