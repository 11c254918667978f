use junkan_core::resolve_db_path;
use junkan_store::VIDEO_POLICY;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COOKIE_NAME: &str = "junkan_session";

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10.0,
            refill_per_sec: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub media_root: PathBuf,
    /// Prefix of links placed in outgoing mail.
    pub public_base_url: String,
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub secure_cookies: bool,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub auth_rate_limit: RateLimitConfig,
    pub log_json: bool,
    pub shutdown_drain: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: PathBuf::from(junkan_core::DEFAULT_DB_PATH),
            media_root: PathBuf::from("artifacts/media"),
            public_base_url: "http://localhost:8080".to_string(),
            session_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookies: false,
            max_body_bytes: 110 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            auth_rate_limit: RateLimitConfig::default(),
            log_json: true,
            shutdown_drain: Duration::from_secs(2),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("JUNKAN_BIND", &defaults.bind_addr),
            db_path: resolve_db_path(),
            media_root: PathBuf::from(env_string("JUNKAN_MEDIA_ROOT", "artifacts/media")),
            public_base_url: env_string("JUNKAN_PUBLIC_BASE_URL", &defaults.public_base_url)
                .trim_end_matches('/')
                .to_string(),
            session_ttl: Duration::from_secs(env_u64(
                "JUNKAN_SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
            cookie_name: env_string("JUNKAN_COOKIE_NAME", DEFAULT_COOKIE_NAME),
            secure_cookies: env_bool("JUNKAN_SECURE_COOKIES", false),
            max_body_bytes: env_usize("JUNKAN_MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout: Duration::from_millis(env_u64("JUNKAN_REQUEST_TIMEOUT_MS", 30_000)),
            auth_rate_limit: RateLimitConfig {
                capacity: env_f64("JUNKAN_AUTH_RATE_LIMIT_CAPACITY", 10.0),
                refill_per_sec: env_f64("JUNKAN_AUTH_RATE_LIMIT_REFILL_PER_SEC", 0.2),
            },
            log_json: env_bool("JUNKAN_LOG_JSON", true),
            shutdown_drain: Duration::from_millis(env_u64("JUNKAN_SHUTDOWN_DRAIN_MS", 2_000)),
        }
    }
}

pub fn validate_startup_config_contract(cfg: &ServerConfig) -> Result<(), String> {
    if cfg.session_ttl.is_zero() {
        return Err("session ttl must be > 0".to_string());
    }
    if cfg.cookie_name.trim().is_empty()
        || !cfg
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("cookie name must be a non-empty token".to_string());
    }
    if cfg.max_body_bytes < VIDEO_POLICY.max_bytes {
        return Err(format!(
            "max body bytes must be >= the video upload limit ({})",
            VIDEO_POLICY.max_bytes
        ));
    }
    if cfg.request_timeout.is_zero() {
        return Err("request timeout must be > 0".to_string());
    }
    let limit = &cfg.auth_rate_limit;
    if limit.capacity.is_nan()
        || limit.capacity < 1.0
        || !limit.refill_per_sec.is_finite()
        || limit.refill_per_sec <= 0.0
    {
        return Err("auth rate limit requires capacity >= 1 and refill > 0".to_string());
    }
    if cfg.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind address {}", cfg.bind_addr));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_the_startup_contract() {
        let cfg = ServerConfig::default();
        assert!(validate_startup_config_contract(&cfg).is_ok());
        assert_eq!(cfg.session_ttl.as_secs(), 1_209_600);
        assert_eq!(cfg.cookie_name, "junkan_session");
    }

    #[test]
    fn startup_contract_rejects_broken_limits() {
        let cases = [
            (
                ServerConfig {
                    session_ttl: Duration::ZERO,
                    ..ServerConfig::default()
                },
                "session ttl",
            ),
            (
                ServerConfig {
                    cookie_name: " ".to_string(),
                    ..ServerConfig::default()
                },
                "cookie name",
            ),
            (
                ServerConfig {
                    max_body_bytes: 1024,
                    ..ServerConfig::default()
                },
                "video upload limit",
            ),
            (
                ServerConfig {
                    auth_rate_limit: RateLimitConfig {
                        capacity: 0.0,
                        refill_per_sec: 1.0,
                    },
                    ..ServerConfig::default()
                },
                "rate limit",
            ),
            (
                ServerConfig {
                    auth_rate_limit: RateLimitConfig {
                        capacity: 5.0,
                        refill_per_sec: f64::NAN,
                    },
                    ..ServerConfig::default()
                },
                "rate limit",
            ),
        ];
        for (cfg, needle) in cases {
            let err = validate_startup_config_contract(&cfg).expect_err("invalid config");
            assert!(err.contains(needle), "{err}");
        }
    }
}
