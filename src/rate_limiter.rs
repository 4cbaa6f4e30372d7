//! Rate limiter for calls to the external analysis service
//!
//! This module implements token bucket admission control across two time
//! windows (requests per minute and requests per day), plus a cooldown mode
//! that refuses all tokens for a fixed window after the remote service
//! signals quota exhaustion.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// How long a bucket refuses tokens after the remote service reported a
/// quota error
pub const EXHAUSTION_COOLDOWN: Duration = Duration::from_secs(60);

/// Poll interval while a bucket is cooling down
const COOLDOWN_POLL: Duration = Duration::from_secs(5);

/// How many cooldown polls an `acquire` call tolerates before giving up
const COOLDOWN_MAX_WAITS: u32 = 3;

/// Pacing sleep when the bucket is below 20% capacity
const HEAVY_CAUTION_SLEEP: Duration = Duration::from_secs(3);

/// Pacing sleep when the bucket is below 50% capacity
const LIGHT_CAUTION_SLEEP: Duration = Duration::from_secs(1);

/// Longest token-deficit wait `acquire` will sleep through. A deficit that
/// takes longer to clear (an empty day bucket refills one token every ~173s
/// at default capacity) is reported as denied so the caller can skip the
/// unit of work instead of stalling on it.
const MAX_TOKEN_WAIT: Duration = Duration::from_secs(30);

/// The two admission windows every external call must clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Minute,
    Day,
}

impl BucketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::Minute => "minute",
            BucketKind::Day => "day",
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute
    pub max_requests_per_minute: u32,
    /// Maximum requests per day
    pub max_requests_per_day: u32,
    /// Whether to enable rate limiting (can be disabled for testing)
    pub enabled: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 10,
            max_requests_per_day: 500,
            enabled: true,
        }
    }
}

/// Token bucket for one admission window
struct TokenBucket {
    /// Maximum tokens in bucket
    capacity: u32,
    /// Current tokens available
    tokens: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
    /// Refill rate (tokens per second)
    refill_rate: f64,
    /// Set when the remote service reported quota exhaustion
    exhausted: bool,
    exhausted_at: Option<Instant>,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            last_refill: Instant::now(),
            refill_rate,
            exhausted: false,
            exhausted_at: None,
        }
    }

    /// Refill tokens based on elapsed time, capped at capacity
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        let tokens_to_add = elapsed * self.refill_rate;
        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }

    /// Remaining cooldown, clearing the exhausted flag once it has elapsed
    fn cooldown_remaining(&mut self) -> Option<Duration> {
        if !self.exhausted {
            return None;
        }
        let elapsed = self
            .exhausted_at
            .map(|at| Instant::now().duration_since(at))
            .unwrap_or(EXHAUSTION_COOLDOWN);
        if elapsed >= EXHAUSTION_COOLDOWN {
            self.exhausted = false;
            self.exhausted_at = None;
            None
        } else {
            Some(EXHAUSTION_COOLDOWN - elapsed)
        }
    }

    /// Pacing delay for a bucket running low on headroom
    fn caution_delay(&self) -> Option<Duration> {
        let capacity = self.capacity as f64;
        if self.tokens < 0.2 * capacity {
            Some(HEAVY_CAUTION_SLEEP)
        } else if self.tokens < 0.5 * capacity {
            Some(LIGHT_CAUTION_SLEEP)
        } else {
            None
        }
    }

    /// Try to consume one token, returns true if successful
    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until the next token accrues
    fn time_until_available(&mut self) -> Option<Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            None
        } else {
            let tokens_needed = 1.0 - self.tokens;
            let seconds_needed = tokens_needed / self.refill_rate;
            Some(Duration::from_secs_f64(seconds_needed))
        }
    }
}

/// Dual-window rate limiter shared by every running scan job
///
/// `acquire` suspends the caller until a token is granted, or returns
/// `false` after bounded waiting; the caller should skip or fail that unit
/// of work, never crash. Buckets are independent; an external call must
/// clear both (see [`RateLimiter::acquire_all`]).
pub struct RateLimiter {
    minute_bucket: Arc<Mutex<TokenBucket>>,
    day_bucket: Arc<Mutex<TokenBucket>>,
    config: RateLimiterConfig,
    /// Track total granted external calls for monitoring
    total_calls: Arc<Mutex<u64>>,
}

impl RateLimiter {
    /// Create new rate limiter with default config
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    /// Create new rate limiter with custom config
    pub fn with_config(config: RateLimiterConfig) -> Self {
        // Refill rates in tokens per second
        let minute_rate = config.max_requests_per_minute as f64 / 60.0;
        let day_rate = config.max_requests_per_day as f64 / 86_400.0;

        Self {
            minute_bucket: Arc::new(Mutex::new(TokenBucket::new(
                config.max_requests_per_minute,
                minute_rate,
            ))),
            day_bucket: Arc::new(Mutex::new(TokenBucket::new(
                config.max_requests_per_day,
                day_rate,
            ))),
            config,
            total_calls: Arc::new(Mutex::new(0)),
        }
    }

    fn bucket(&self, kind: BucketKind) -> &Arc<Mutex<TokenBucket>> {
        match kind {
            BucketKind::Minute => &self.minute_bucket,
            BucketKind::Day => &self.day_bucket,
        }
    }

    /// Acquire one token from the named bucket, waiting as needed
    ///
    /// Explicit bounded loop; the lock is never held across a sleep so
    /// concurrent jobs contend fairly. Returns `false` when the bucket is
    /// cooling down past the bounded poll budget, or when the token deficit
    /// would take longer than [`MAX_TOKEN_WAIT`] to clear.
    pub async fn acquire(&self, kind: BucketKind) -> bool {
        if !self.config.enabled {
            return true;
        }

        let bucket = self.bucket(kind);
        let mut cooldown_waits = 0u32;

        loop {
            // Quota-exhaustion cooldown trumps nominal refill
            let cooling = {
                let mut b = bucket.lock().await;
                b.refill();
                b.cooldown_remaining().is_some()
            };
            if cooling {
                if cooldown_waits >= COOLDOWN_MAX_WAITS {
                    log::warn!(
                        "rate limiter: {} bucket still cooling down after {} waits, denying",
                        kind.as_str(),
                        cooldown_waits
                    );
                    return false;
                }
                cooldown_waits += 1;
                sleep(COOLDOWN_POLL).await;
                continue;
            }

            // Pacing when headroom is low
            let caution = {
                let b = bucket.lock().await;
                b.caution_delay()
            };
            if let Some(delay) = caution {
                sleep(delay).await;
            }

            // Consume, or wait out the exact token deficit
            let wait = {
                let mut b = bucket.lock().await;
                if b.try_consume() {
                    return true;
                }
                b.time_until_available()
            };
            match wait {
                None => continue,
                Some(deficit) if deficit > MAX_TOKEN_WAIT => {
                    log::warn!(
                        "rate limiter: {} bucket empty, next token in {:.0}s, denying",
                        kind.as_str(),
                        deficit.as_secs_f64()
                    );
                    return false;
                }
                Some(deficit) => {
                    sleep(deficit).await;
                    // Another job may have raced us to the refilled token;
                    // loop and re-check rather than going negative.
                }
            }
        }
    }

    /// Acquire from both windows; an external call proceeds only if both
    /// grants succeed. Failure on either aborts the call attempt.
    pub async fn acquire_all(&self) -> bool {
        if !self.config.enabled {
            return true;
        }
        if !self.acquire(BucketKind::Minute).await {
            return false;
        }
        if !self.acquire(BucketKind::Day).await {
            return false;
        }

        let mut total = self.total_calls.lock().await;
        *total += 1;
        true
    }

    /// Trip the cooldown circuit breaker for one bucket
    ///
    /// Called when the remote service reports a quota error. Once tripped,
    /// the bucket refuses all tokens for [`EXHAUSTION_COOLDOWN`] regardless
    /// of nominal refill.
    pub async fn mark_exhausted(&self, kind: BucketKind) {
        let mut b = self.bucket(kind).lock().await;
        b.exhausted = true;
        b.exhausted_at = Some(Instant::now());
        log::warn!("rate limiter: {} bucket marked exhausted", kind.as_str());
    }

    /// Trip the cooldown for both windows; the quota signal does not say
    /// which window the remote service metered.
    pub async fn mark_all_exhausted(&self) {
        self.mark_exhausted(BucketKind::Minute).await;
        self.mark_exhausted(BucketKind::Day).await;
    }

    /// Whether the named bucket is currently in its cooldown window
    pub async fn is_exhausted(&self, kind: BucketKind) -> bool {
        let mut b = self.bucket(kind).lock().await;
        b.cooldown_remaining().is_some()
    }

    /// Get current statistics
    pub async fn stats(&self) -> RateLimiterStats {
        let mut minute = self.minute_bucket.lock().await;
        let mut day = self.day_bucket.lock().await;
        let total = self.total_calls.lock().await;

        minute.refill();
        day.refill();

        RateLimiterStats {
            minute_tokens_available: minute.tokens as u32,
            day_tokens_available: day.tokens as u32,
            minute_exhausted: minute.exhausted,
            day_exhausted: day.exhausted,
            total_calls: *total,
        }
    }

    /// Reset both buckets to full capacity (useful for testing)
    pub async fn reset(&self) {
        let mut minute = self.minute_bucket.lock().await;
        let mut day = self.day_bucket.lock().await;
        let mut total = self.total_calls.lock().await;

        minute.tokens = minute.capacity as f64;
        minute.exhausted = false;
        minute.exhausted_at = None;
        day.tokens = day.capacity as f64;
        day.exhausted = false;
        day.exhausted_at = None;
        *total = 0;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub minute_tokens_available: u32,
    pub day_tokens_available: u32,
    pub minute_exhausted: bool,
    pub day_exhausted: bool,
    pub total_calls: u64,
}
