//! Token bucket pacing the announcement loop.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Token bucket holding up to `capacity` permits and regaining one every `interval`.
///
/// The bucket starts full, so the first `capacity` acquisitions never wait.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    interval: Duration,
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket regaining one permit every `interval`.
    pub fn new(capacity: u32, interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            interval: interval.max(Duration::from_nanos(1)),
            tokens: capacity.max(1),
            last_refill: Instant::now(),
        }
    }

    /// Create a bucket admitting `permits` per second with bursts of up to `burst`.
    pub fn per_second(permits: u32, burst: u32) -> Self {
        Self::new(burst, ONE_SECOND / permits.max(1))
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let periods = (elapsed.as_nanos() / self.interval.as_nanos())
            .min(u128::from(self.capacity)) as u32;
        if periods == 0 {
            return;
        }

        self.tokens = self.tokens.saturating_add(periods).min(self.capacity);
        if self.tokens == self.capacity {
            self.last_refill = now;
        } else {
            self.last_refill += self.interval * periods;
        }
    }

    /// Take a permit if one is available right now.
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    /// Wait until a permit is available and take it.
    pub async fn acquire(&mut self) {
        while !self.try_acquire() {
            sleep_until(self.last_refill + self.interval).await;
        }
    }
}
