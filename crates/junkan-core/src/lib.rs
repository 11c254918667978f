#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::fmt;

mod clock;
mod password;
mod token;

pub use clock::{ClockPort, FixedClock, SystemClock};
pub use password::{hash_password, hash_password_with_iterations, verify_password, PASSWORD_ITERATIONS};
pub use token::{mint_token, random_bytes, token_digest};

pub const CRATE_NAME: &str = "junkan-core";

pub const ENV_JUNKAN_LOG_LEVEL: &str = "JUNKAN_LOG_LEVEL";
pub const ENV_JUNKAN_DB_PATH: &str = "JUNKAN_DB_PATH";
pub const DEFAULT_DB_PATH: &str = "artifacts/junkan.sqlite";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError(pub String);

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CoreError {}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[must_use]
pub fn resolve_db_path() -> std::path::PathBuf {
    match std::env::var(ENV_JUNKAN_DB_PATH) {
        Ok(explicit) if !explicit.trim().is_empty() => std::path::PathBuf::from(explicit.trim()),
        _ => std::path::PathBuf::from(DEFAULT_DB_PATH),
    }
}
