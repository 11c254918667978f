use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

/// Buckets beyond this count trigger a sweep of fully refilled ones.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-key token bucket.
#[derive(Default)]
pub(crate) struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        self.allow_at(key, cfg, Instant::now()).await
    }

    pub(crate) async fn allow_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        if lock.len() >= MAX_TRACKED_KEYS && !lock.contains_key(key) {
            lock.retain(|_, b| {
                let elapsed = now.saturating_duration_since(b.last_refill).as_secs_f64();
                b.tokens + elapsed * cfg.refill_per_sec < cfg.capacity
            });
        }
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
