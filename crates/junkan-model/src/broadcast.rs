use crate::member::MemberRank;
use crate::validation::{check_len, ValidationError};
use crate::wire::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    #[default]
    Sent,
    Failed,
    Scheduled,
}

wire_enum!(BroadcastStatus, "broadcast status", {
    Sent => "sent",
    Failed => "failed",
    Scheduled => "scheduled",
});

/// Audience of a broadcast. `premium` means every rank above standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BroadcastTarget {
    #[default]
    All,
    Premium,
    Rank(MemberRank),
}

impl BroadcastTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Premium => "premium",
            Self::Rank(rank) => rank.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw.trim() {
            "all" => Ok(Self::All),
            "premium" => Ok(Self::Premium),
            other => MemberRank::parse(other)
                .map(Self::Rank)
                .map_err(|_| ParseError {
                    kind: "broadcast target",
                    value: raw.to_string(),
                }),
        }
    }

    /// Whether a member of `rank` receives the broadcast.
    #[must_use]
    pub fn reaches(self, rank: MemberRank) -> bool {
        match self {
            Self::All => true,
            Self::Premium => rank > MemberRank::Standard,
            Self::Rank(min) => rank >= min,
        }
    }
}

impl std::fmt::Display for BroadcastTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BroadcastTarget {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BroadcastTarget> for String {
    fn from(value: BroadcastTarget) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: String,
    pub title: String,
    pub body: String,
    pub target_rank: BroadcastTarget,
    pub status: BroadcastStatus,
    pub recipient_count: u32,
    pub sent_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BroadcastInput {
    pub title: String,
    pub body: String,
    pub target_rank: Option<BroadcastTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastDraft {
    pub title: String,
    pub body: String,
    pub target_rank: BroadcastTarget,
}

impl BroadcastInput {
    pub fn validate(self) -> Result<BroadcastDraft, ValidationError> {
        let mut errors = Vec::new();
        let title = self.title.trim().to_string();
        check_len(&mut errors, "title", &title, 1, 200);
        let body = self.body.trim().to_string();
        check_len(&mut errors, "body", &body, 1, 10_000);
        ValidationError::check(errors)?;
        Ok(BroadcastDraft {
            title,
            body,
            target_rank: self.target_rank.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_reach_expected_ranks() {
        assert!(BroadcastTarget::All.reaches(MemberRank::Standard));
        assert!(!BroadcastTarget::Premium.reaches(MemberRank::Standard));
        assert!(BroadcastTarget::Premium.reaches(MemberRank::Gold));
        assert!(BroadcastTarget::Rank(MemberRank::Platinum).reaches(MemberRank::Diamond));
        assert!(!BroadcastTarget::Rank(MemberRank::Platinum).reaches(MemberRank::Gold));
    }

    #[test]
    fn target_parses_wire_text() {
        assert_eq!(BroadcastTarget::parse("premium"), Ok(BroadcastTarget::Premium));
        assert_eq!(
            BroadcastTarget::parse("gold"),
            Ok(BroadcastTarget::Rank(MemberRank::Gold))
        );
        assert!(BroadcastTarget::parse("everyone").is_err());
        let input: BroadcastInput =
            serde_json::from_str(r#"{"title":"Hi","body":"News","target_rank":"diamond"}"#)
                .expect("json");
        let draft = input.validate().expect("valid");
        assert_eq!(draft.target_rank, BroadcastTarget::Rank(MemberRank::Diamond));
    }

    #[test]
    fn empty_body_is_rejected() {
        let err = BroadcastInput {
            title: "Hi".to_string(),
            body: "   ".to_string(),
            target_rank: None,
        }
        .validate()
        .expect_err("invalid");
        assert_eq!(err.fields[0].field, "body");
    }
}
