//! Per-provider request limiter.
//!
//! Two rules, both shared by every worker:
//! * at most `ceiling` requests in flight (a semaphore)
//! * request starts spaced at least `min_interval` apart in aggregate
//!   (a shared next-slot schedule; each worker reserves a slot under the
//!   lock and sleeps until that slot after releasing it)

use crate::error::GeocodeError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

pub struct RateLimiter {
    semaphore: Semaphore,
    ceiling: usize,
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

/// Held for the duration of one provider request.
pub struct RequestPermit<'a> {
    limiter: &'a RateLimiter,
    _permit: SemaphorePermit<'a>,
}

impl Drop for RequestPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RateLimiter {
    pub fn new(ceiling: usize, min_interval: Duration) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            semaphore: Semaphore::new(ceiling),
            ceiling,
            min_interval,
            next_slot: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for a free request slot and the next start time.
    pub async fn acquire(&self) -> Result<RequestPermit<'_>, GeocodeError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GeocodeError::Transport("rate limiter closed".into()))?;

        let start_at = {
            let mut next = self
                .next_slot
                .lock()
                .map_err(|_| GeocodeError::Transport("rate limiter lock poisoned".into()))?;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(start_at).await;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);
        Ok(RequestPermit {
            limiter: self,
            _permit: permit,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Largest number of simultaneously held permits so far.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[tokio::test]
    async fn never_exceeds_ceiling() {
        let limiter = RateLimiter::new(2, Duration::ZERO);
        let tasks = (0..8).map(|_| async {
            let _p = limiter.acquire().await.expect("permit");
            assert!(limiter.in_flight() <= 2);
            tokio::time::sleep(Duration::from_millis(5)).await;
        });
        join_all(tasks).await;
        assert_eq!(limiter.high_water_mark(), 2);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_request_starts() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1100));
        let begin = Instant::now();
        let starts = join_all((0..3).map(|_| async {
            let _p = limiter.acquire().await.expect("permit");
            Instant::now() - begin
        }))
        .await;
        let mut starts = starts;
        starts.sort();
        assert!(starts[0] < Duration::from_millis(10));
        assert!(starts[1] >= Duration::from_millis(1100));
        assert!(starts[2] >= Duration::from_millis(2200));
    }
}
