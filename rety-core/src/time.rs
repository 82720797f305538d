//! Injectable time and randomness
//!
//! Recording measures idle gaps and replay sleeps between actions. Both go
//! through a [`Clock`] so tests can substitute a [`ManualClock`] and run
//! without real delays. Replay jitter draws from a [`JitterSource`].

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Relative deviation applied to the base replay delay
pub const JITTER_DEVIATION: f64 = 0.15;

/// Monotonic time source with cooperative sleeping
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch
    fn now(&self) -> Duration;

    /// Suspend the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by tokio's timer
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to; sleeps advance it instantly
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        *lock(&self.now) += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    /// Sum of all requested sleeps
    pub fn total_slept(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *lock(&self.now)
    }

    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Source of uniform samples in `[0, 1)`
pub trait JitterSource: Send {
    fn sample(&mut self) -> f64;
}

/// Jitter drawn from a seedable PRNG
#[derive(Debug, Clone)]
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible jitter
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for RandomJitter {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Scale `base` uniformly within ±[`JITTER_DEVIATION`]; `unit` is a sample
/// in `[0, 1)`
pub fn jittered(base: Duration, unit: f64) -> Duration {
    let unit = unit.clamp(0.0, 1.0);
    let factor = 1.0 - JITTER_DEVIATION + unit * 2.0 * JITTER_DEVIATION;
    Duration::from_nanos((base.as_nanos() as f64 * factor).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_millis(100);
        assert_eq!(jittered(base, 0.0), Duration::from_millis(85));
        assert_eq!(jittered(base, 0.5), Duration::from_millis(100));
        assert!(jittered(base, 0.999) < Duration::from_millis(115));
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let mut jitter = RandomJitter::seeded(7);
        for _ in 0..1000 {
            let sample = jitter.sample();
            assert!((0.0..1.0).contains(&sample));
        }
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let mut a = RandomJitter::seeded(42);
        let mut b = RandomJitter::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[tokio::test]
    async fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(5));
        clock.sleep(Duration::from_millis(20)).await;
        clock.sleep(Duration::from_millis(30)).await;

        assert_eq!(clock.now(), Duration::from_millis(55));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(20), Duration::from_millis(30)]
        );
        assert_eq!(clock.total_slept(), Duration::from_millis(50));
    }
}
