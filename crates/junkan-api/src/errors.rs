// SPDX-License-Identifier: Apache-2.0

use junkan_model::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

pub const UNKNOWN_REQUEST_ID: &str = "req-unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidRequest,
    ValidationFailed,
    InvalidInviteCode,
    Unauthenticated,
    InvalidCredentials,
    EmailNotConfirmed,
    AccountPending,
    AccountSuspended,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    PayloadTooLarge,
    UnsupportedMediaType,
    NotReady,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: [Self; 16] = [
        Self::InvalidRequest,
        Self::ValidationFailed,
        Self::InvalidInviteCode,
        Self::Unauthenticated,
        Self::InvalidCredentials,
        Self::EmailNotConfirmed,
        Self::AccountPending,
        Self::AccountSuspended,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::RateLimited,
        Self::PayloadTooLarge,
        Self::UnsupportedMediaType,
        Self::NotReady,
        Self::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::ValidationFailed => "validation_failed",
            Self::InvalidInviteCode => "invalid_invite_code",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::AccountPending => "account_pending",
            Self::AccountSuspended => "account_suspended",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::PayloadTooLarge => "payload_too_large",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::NotReady => "not_ready",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: UNKNOWN_REQUEST_ID.to_string(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidRequest,
            format!("invalid query parameter: {name}"),
            json!({"parameter": name, "value": value}),
        )
    }

    #[must_use]
    pub fn missing_param(name: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidRequest,
            format!("missing query parameter: {name}"),
            json!({"parameter": name}),
        )
    }

    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ApiErrorCode::InvalidRequest,
            "request body could not be parsed",
            json!({"reason": reason}),
        )
    }

    #[must_use]
    pub fn validation_failed(error: &ValidationError) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            error.message(),
            json!({"field_errors": error.fields}),
        )
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(
            ApiErrorCode::Unauthenticated,
            "sign in required",
            json!({}),
        )
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message, json!({}))
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            json!({}),
        )
    }

    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            ApiErrorCode::RateLimited,
            "too many attempts, try again later",
            json!({"retry_after_secs": retry_after_secs}),
        )
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}))
    }

    /// Wire shape: `{"error": {...}}`.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({ "error": self })
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_their_wire_names() {
        for code in ApiErrorCode::ALL {
            let encoded = serde_json::to_value(code).expect("encode");
            assert_eq!(encoded, Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn validation_errors_keep_field_details() {
        let err = ApiError::validation_failed(&ValidationError::single("email", "email is required"))
            .with_request_id("req-1");
        let body = err.to_body();
        assert_eq!(body["error"]["code"], "validation_failed");
        assert_eq!(body["error"]["message"], "email is required");
        assert_eq!(body["error"]["request_id"], "req-1");
        assert_eq!(body["error"]["details"]["field_errors"][0]["field"], "email");
    }
}
