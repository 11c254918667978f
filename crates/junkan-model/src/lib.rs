#![forbid(unsafe_code)]
//! Junkan membership model SSOT.
//!
//! Domain vocabulary shared by the store, the wire layer and the CLI:
//! ranks and statuses, persisted records, input validation and the small
//! aggregations (referral stats, reward tiers, dashboard) computed over
//! query results.

#[macro_use]
mod wire;

mod broadcast;
mod content;
mod dashboard;
mod invite;
mod member;
mod reward;
mod time;
mod validation;

pub use broadcast::{Broadcast, BroadcastDraft, BroadcastInput, BroadcastStatus, BroadcastTarget};
pub use content::{
    Content, ContentDraft, ContentFilter, ContentInput, ContentStatus, ContentType,
    InteractionState, InteractionType, CONTENT_TAGS_MAX,
};
pub use dashboard::{DailyRegistrations, DashboardStats, GrowthPoint, ProfileSnapshot};
pub use invite::{
    invite_code_from_bytes, normalize_invite_code, InviteCode, InviteSlots, InviteVerification,
    Referral, ReferralStats, UnlockCondition, UnlockConditionState, INITIAL_INVITE_SLOTS,
    INVITE_CODE_ALPHABET, INVITE_CODE_LEN,
};
pub use member::{
    LoginEntry, MemberRank, NotificationPreferences, Profile, ProfileUpdate, ProfileUpdateInput,
    RequiredRank, UserRole, UserStatus,
};
pub use reward::{
    achieved_count, achievers, referral_counts, Achiever, ClaimStatus, MemberRewardView, Reward,
    RewardClaim, RewardStatus, RewardTier, RewardUpdate, RewardUpdateInput, RewardWithStats,
    ACHIEVER_THRESHOLD, DEFAULT_REWARD_TIERS,
};
pub use time::{format_ts, parse_ts};
pub use validation::{
    validate_email, validate_password, validate_ref_code, ChangePassword, ChangePasswordInput,
    FeedbackInput, FieldError, ScreeningAnswerInput, SignIn, SignInInput, SignUp, SignUpInput,
    ValidationError, PASSWORD_MAX_LEN, PASSWORD_MIN_LEN,
};
pub use wire::ParseError;

pub const CRATE_NAME: &str = "junkan-model";
