//! Per-instance randomness for cursor placement and jitter.
//!
//! Host providers and watchers each own a [`Randomness`] rather than
//! reaching for a process-global generator, so tests can pin the starting
//! server and the jitter delay.

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of uniform random choices.
pub trait Randomness: Send + fmt::Debug {
    /// Returns an index in `[0, upper)`, or 0 when `upper` is 0.
    fn index(&mut self, upper: usize) -> usize;

    /// Returns a duration in `[0, upper)`, or zero when `upper` is zero.
    fn jitter(&mut self, upper: Duration) -> Duration;
}

/// [`Randomness`] backed by a seeded [`StdRng`].
pub struct SeededRandomness {
    rng: StdRng,
}

impl SeededRandomness {
    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Creates a generator seeded from the wall clock.
    ///
    /// Independent clients started at different instants pick different
    /// first servers.
    #[must_use]
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::from_seed(nanos)
    }
}

impl fmt::Debug for SeededRandomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandomness").finish_non_exhaustive()
    }
}

impl Randomness for SeededRandomness {
    fn index(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        self.rng.random_range(0..upper)
    }

    fn jitter(&mut self, upper: Duration) -> Duration {
        let nanos = u64::try_from(upper.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.rng.random_range(0..nanos))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_index_stays_in_range() {
        let mut randomness = SeededRandomness::from_seed(7);
        for _ in 0..1000 {
            assert!(randomness.index(5) < 5);
        }
    }

    #[test]
    fn test_index_of_empty_range_is_zero() {
        let mut randomness = SeededRandomness::from_seed(7);
        assert_eq!(randomness.index(0), 0);
    }

    #[test]
    fn test_jitter_stays_below_ceiling() {
        let mut randomness = SeededRandomness::from_seed(11);
        let ceiling = Duration::from_millis(250);
        for _ in 0..1000 {
            assert!(randomness.jitter(ceiling) < ceiling);
        }
    }

    #[test]
    fn test_zero_ceiling_gives_zero_jitter() {
        let mut randomness = SeededRandomness::from_seed(11);
        assert_eq!(randomness.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRandomness::from_seed(42);
        let mut b = SeededRandomness::from_seed(42);
        let left: Vec<usize> = (0..32).map(|_| a.index(1000)).collect();
        let right: Vec<usize> = (0..32).map(|_| b.index(1000)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_index_covers_range() {
        let mut randomness = SeededRandomness::from_seed(3);
        let seen: HashSet<usize> = (0..500).map(|_| randomness.index(4)).collect();
        assert_eq!(seen.len(), 4);
    }
}
