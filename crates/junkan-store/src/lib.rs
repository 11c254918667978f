#![forbid(unsafe_code)]
//! Persistence for the junkan membership service.
//!
//! [`MembershipStore`] owns the SQLite database (accounts, profiles,
//! invites, referrals, contents, rewards, broadcasts). [`MediaStore`]
//! abstracts binary uploads; [`LocalFsMediaStore`] keeps them on disk.

use std::fmt::{Display, Formatter};

mod media;
mod membership;
mod rows;
mod schema;

pub use media::{
    media_object_path, LocalFsMediaStore, MediaError, MediaErrorCode, MediaObject, MediaStore,
    StoredMedia, UploadPolicy, THUMBNAIL_POLICY, VIDEO_POLICY,
};
pub use membership::{
    AdminUser, MembershipStore, Registration, RewardsOverview, CONFIRM_TOKEN_TTL_HOURS,
    RESET_TOKEN_TTL_HOURS,
};
pub use schema::SCHEMA_VERSION;

pub const CRATE_NAME: &str = "junkan-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    InvalidInvite,
    InvalidCredentials,
    Conflict,
    Forbidden,
    Io,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::InvalidInvite => "invalid_invite_code",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::Io => "io_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(StoreErrorCode::NotFound, format!("{what} not found"))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::QueryReturnedNoRows => Self::new(StoreErrorCode::NotFound, "row not found"),
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::new(StoreErrorCode::Conflict, e.to_string())
            }
            _ => Self::new(StoreErrorCode::Internal, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_errors_map_to_store_codes() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.code, StoreErrorCode::NotFound);
        let err = StoreError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.code, StoreErrorCode::Internal);
        assert!(err.to_string().starts_with("internal_error: "));
    }
}
