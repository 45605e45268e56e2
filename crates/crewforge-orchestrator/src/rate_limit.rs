use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket capping worker invocations per minute for one crew.
///
/// Unlike a request limiter this never rejects: callers wait until a token is
/// available. A ceiling of zero disables throttling.
pub struct RateCeiling {
    max_per_minute: u32,
    bucket: Mutex<Bucket>,
}

impl RateCeiling {
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(max_per_minute),
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn max_per_minute(&self) -> u32 {
        self.max_per_minute
    }

    fn refill_rate(&self) -> f64 {
        f64::from(self.max_per_minute) / 60.0
    }

    /// Take one token if available, otherwise report how long until one is.
    async fn take(&self) -> Result<(), Duration> {
        if self.max_per_minute == 0 {
            return Ok(());
        }
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.refill_rate())
            .min(f64::from(self.max_per_minute));
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64(
                (1.0 - bucket.tokens) / self.refill_rate(),
            ))
        }
    }

    /// Try to consume one token without waiting.
    pub async fn try_acquire(&self) -> bool {
        self.take().await.is_ok()
    }

    /// Consume one token, sleeping until one is available.
    pub async fn acquire(&self) {
        while let Err(wait) = self.take().await {
            tokio::time::sleep(wait).await;
        }
    }
}
