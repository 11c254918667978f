use crate::{ApiError, ApiErrorCode};
use junkan_model::ValidationError;
use junkan_store::{MediaError, MediaErrorCode, StoreError, StoreErrorCode};
use serde_json::json;

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::validation_failed(&error)
    }
}

/// Internal and I/O failures keep their detail out of the response body.
impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        let code = match error.code {
            StoreErrorCode::NotFound => ApiErrorCode::NotFound,
            StoreErrorCode::Validation => ApiErrorCode::ValidationFailed,
            StoreErrorCode::InvalidInvite => ApiErrorCode::InvalidInviteCode,
            StoreErrorCode::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            StoreErrorCode::Conflict => ApiErrorCode::Conflict,
            StoreErrorCode::Forbidden => ApiErrorCode::Forbidden,
            _ => return Self::internal(),
        };
        Self::new(code, error.message, json!({}))
    }
}

impl From<MediaError> for ApiError {
    fn from(error: MediaError) -> Self {
        let code = match error.code {
            MediaErrorCode::InvalidPath => ApiErrorCode::InvalidRequest,
            MediaErrorCode::NotFound => ApiErrorCode::NotFound,
            MediaErrorCode::UnsupportedType => ApiErrorCode::UnsupportedMediaType,
            MediaErrorCode::TooLarge => ApiErrorCode::PayloadTooLarge,
            _ => return Self::internal(),
        };
        Self::new(code, error.message, json!({}))
    }
}
