// SPDX-License-Identifier: Apache-2.0

use crate::validation::{check_len, optional_text, FieldError, ValidationError};
use crate::wire::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tiered access level. Declaration order is rank order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemberRank {
    #[default]
    Standard,
    Gold,
    Platinum,
    Diamond,
}

wire_enum!(MemberRank, "member rank", {
    Standard => "standard",
    Gold => "gold",
    Platinum => "platinum",
    Diamond => "diamond",
});

impl MemberRank {
    #[must_use]
    pub fn satisfies(self, required: RequiredRank) -> bool {
        match required {
            RequiredRank::All => true,
            RequiredRank::Rank(min) => self >= min,
        }
    }
}

/// Minimum rank a content item asks for; `all` admits everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RequiredRank {
    #[default]
    All,
    Rank(MemberRank),
}

impl RequiredRank {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Rank(rank) => rank.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw.trim() {
            "all" => Ok(Self::All),
            other => MemberRank::parse(other)
                .map(Self::Rank)
                .map_err(|_| ParseError {
                    kind: "required rank",
                    value: raw.to_string(),
                }),
        }
    }
}

impl std::fmt::Display for RequiredRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RequiredRank {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequiredRank> for String {
    fn from(value: RequiredRank) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Member,
    Admin,
}

wire_enum!(UserRole, "user role", {
    Member => "member",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Pending,
    Active,
    Suspended,
}

wire_enum!(UserStatus, "user status", {
    Pending => "pending",
    Active => "active",
    Suspended => "suspended",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub member_id: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub avatar_url: Option<String>,
    pub rank: MemberRank,
    pub role: UserRole,
    pub status: UserStatus,
    pub screening_answer: Option<String>,
    pub invited_by: Option<String>,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// All contact and career fields are filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.phone,
            &self.bio,
            &self.location,
            &self.company,
            &self.position,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub email_new_content: bool,
    pub email_newsletter: bool,
    pub email_invite_update: bool,
    pub line_new_content: bool,
    pub line_reward: bool,
    pub push_browser: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_new_content: true,
            email_newsletter: true,
            email_invite_update: true,
            line_new_content: false,
            line_reward: false,
            push_browser: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    pub id: String,
    pub user_id: String,
    pub device: Option<String>,
    pub ip_address: Option<String>,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdateInput {
    pub display_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}

/// Normalised profile edit; blank optional fields are cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}

impl ProfileUpdateInput {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationError> {
        let mut errors = Vec::new();
        let display_name = self.display_name.trim().to_string();
        check_len(&mut errors, "display_name", &display_name, 1, 100);
        let phone = optional_text(self.phone);
        if let Some(phone) = &phone {
            if !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '(' | ')'))
            {
                errors.push(FieldError::new(
                    "phone",
                    "phone may only contain digits, '-', '+', '(' and ')'",
                ));
            }
        }
        let bio = optional_text(self.bio);
        let location = optional_text(self.location);
        let company = optional_text(self.company);
        let position = optional_text(self.position);
        for (field, value, max) in [
            ("bio", &bio, 500),
            ("location", &location, 100),
            ("company", &company, 100),
            ("position", &position, 100),
        ] {
            if let Some(value) = value {
                check_len(&mut errors, field, value, 0, max);
            }
        }
        ValidationError::check(errors)?;
        Ok(ProfileUpdate {
            display_name,
            phone,
            bio,
            location,
            company,
            position,
        })
    }
}
