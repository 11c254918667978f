// SPDX-License-Identifier: Apache-2.0

use junkan_model::{
    validate_password, Content, FieldError, InteractionState, InviteCode, MemberRank, Profile,
    UserStatus, ValidationError,
};
use junkan_store::StoredMedia;
use serde::{Deserialize, Serialize};

pub const REDIRECT_ADMIN: &str = "/admin";
pub const REDIRECT_FEED: &str = "/feed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponseEnvelope<T> {
    pub data: T,
}

impl<T> ApiResponseEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyDto {
    pub status: String,
    pub schema_version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDto {
    pub name: String,
    pub version: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResponseDto {
    pub user_id: String,
    pub member_id: String,
    pub status: UserStatus,
    pub confirmation_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInResponseDto {
    pub redirect: String,
}

impl SignInResponseDto {
    #[must_use]
    pub fn for_profile(profile: &Profile) -> Self {
        let redirect = if profile.is_admin() {
            REDIRECT_ADMIN
        } else {
            REDIRECT_FEED
        };
        Self {
            redirect: redirect.to_string(),
        }
    }
}

/// Where a member lands after confirming their address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    Feed,
    Pending,
    Suspended,
    Screening,
}

impl NextStep {
    #[must_use]
    pub fn for_profile(profile: &Profile) -> Self {
        match profile.status {
            UserStatus::Active => Self::Feed,
            UserStatus::Suspended => Self::Suspended,
            UserStatus::Pending if profile.screening_answer.is_none() => Self::Screening,
            UserStatus::Pending => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmEmailResponseDto {
    pub next: NextStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequestDto {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetDto {
    pub token: String,
    pub password: String,
}

impl PasswordResetDto {
    /// Returns `(token, password)`.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let token = self.token.trim().to_string();
        let mut fields = Vec::new();
        if token.is_empty() {
            fields.push(FieldError::new("token", "token is required"));
        }
        if let Err(e) = validate_password(&self.password) {
            fields.extend(e.fields);
        }
        if fields.is_empty() {
            Ok((token, self.password))
        } else {
            Err(ValidationError { fields })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckDto {
    pub ok: bool,
}

impl AckDto {
    #[must_use]
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCodeDto {
    pub code: Option<InviteCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleDto {
    pub active: bool,
}

/// `condition_completed` is true when this call fulfilled an unlock condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDto {
    pub condition_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItemDto {
    #[serde(flatten)]
    pub content: Content,
    pub locked: bool,
}

impl FeedItemDto {
    /// Withholds body and link when the viewer's rank does not reach the item.
    #[must_use]
    pub fn for_viewer(content: Content, viewer: &Profile) -> Self {
        let locked = content.locked_for(viewer.rank, viewer.role);
        Self {
            content: if locked { content.without_body() } else { content },
            locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDetailDto {
    pub content: FeedItemDto,
    pub related: Vec<FeedItemDto>,
    pub interaction: InteractionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateDto {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankUpdateDto {
    pub rank: MemberRank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailUpdateDto {
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUploadDto {
    pub bucket: String,
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

impl From<StoredMedia> for MediaUploadDto {
    fn from(stored: StoredMedia) -> Self {
        Self {
            bucket: stored.bucket,
            path: stored.path,
            url: stored.public_url,
            content_type: stored.content_type,
            size: stored.size,
        }
    }
}
