use crate::error::HttpAppError;
use crate::utils::ip_extraction::client_ip;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use drivedeal_core::config::RateLimitSettings;
use drivedeal_core::AppError;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

const DEFAULT_SHARD_COUNT: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

/// Fixed-window counter for one key.
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded rate limiter to reduce lock contention
///
/// Keys are hashed onto shards; each check-and-increment runs under its shard's lock so
/// concurrent requests for the same key are counted exactly once each.
pub struct HttpRateLimiter {
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
    limit: u32,
    window: Duration,
    max_buckets: usize,
    trusted_proxy_count: usize,
}

impl HttpRateLimiter {
    pub fn new(settings: &RateLimitSettings, trusted_proxy_count: usize) -> Self {
        Self::with_shards(settings, trusted_proxy_count, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(
        settings: &RateLimitSettings,
        trusted_proxy_count: usize,
        shard_count: usize,
    ) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            limit: settings.max_requests,
            window: settings.window,
            max_buckets: MAX_BUCKETS_PER_SHARD,
            trusted_proxy_count,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Count one request against `key`. Returns the remaining allowance, or the time until
    /// the window resets when the key is over its limit.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard_index = self.shard_index(key);
        let mut buckets = self.shards[shard_index].lock().await;

        if buckets.len() >= self.max_buckets {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);

            // Still full: evict the bucket closest to expiry
            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest_key) = oldest_key {
                    buckets.remove(&oldest_key);
                    tracing::debug!(
                        shard_index,
                        remaining_buckets = buckets.len(),
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let window = self.window;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Drop buckets whose window has elapsed.
    pub async fn cleanup_expired_buckets(&self) -> usize {
        let now = Instant::now();
        let mut total_cleaned = 0;
        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.reset_at > now);
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
        total_cleaned
    }

    #[cfg(test)]
    async fn bucket_count(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: impl ToString) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, header_value);
    }
}

/// Per-IP fixed-window rate limiting.
///
/// Every response carries `X-RateLimit-Limit` and `X-RateLimit-Remaining`. Over the limit
/// the request is answered with 429 and `Retry-After` and never reaches the handler.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, rate_limiter.trusted_proxy_count);
    let key = format!("ip:{}", ip);
    let limit = rate_limiter.limit();

    match rate_limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            set_header(headers, "X-RateLimit-Limit", limit);
            set_header(headers, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(reset_in) => {
            tracing::warn!(
                ip = %ip,
                path = %request.uri().path(),
                limit,
                "Rate limit exceeded"
            );

            let mut response =
                HttpAppError(AppError::TooManyRequests(RATE_LIMIT_MESSAGE.to_string()))
                    .into_response();
            let headers = response.headers_mut();
            set_header(headers, "X-RateLimit-Limit", limit);
            set_header(headers, "X-RateLimit-Remaining", 0);
            set_header(headers, "Retry-After", reset_in.as_secs().max(1));
            response
        }
    }
}
