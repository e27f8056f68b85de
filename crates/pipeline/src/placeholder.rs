use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Source of the randomized counts, picks and delays used by the simulator.
///
/// Seed it to make a whole run reproducible.
pub struct PlaceholderGenerator {
    rng: StdRng,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Integer in `[min, min + span)`.
    pub fn count(&mut self, min: u32, span: u32) -> u32 {
        if span == 0 {
            return min;
        }
        self.rng.gen_range(min..min + span)
    }

    /// Uniform choice from a non-empty list.
    pub fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        match options.len() {
            0 => "",
            n => options[self.rng.gen_range(0..n)],
        }
    }

    /// Delay drawn uniformly from `[min_ms, max_ms)`.
    pub fn delay(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        if max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(self.rng.gen_range(min_ms..max_ms))
    }
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = PlaceholderGenerator::with_seed(7);
        let mut b = PlaceholderGenerator::with_seed(7);

        for _ in 0..20 {
            assert_eq!(a.count(20, 15), b.count(20, 15));
            assert_eq!(a.pick(&["PDF", "Scan"]), b.pick(&["PDF", "Scan"]));
            assert_eq!(a.delay(3000, 5000), b.delay(3000, 5000));
        }
    }

    #[test]
    fn test_ranges() {
        let mut generator = PlaceholderGenerator::with_seed(1);
        for _ in 0..200 {
            let n = generator.count(8, 5);
            assert!((8..13).contains(&n));

            let d = generator.delay(1000, 2000);
            assert!(d >= Duration::from_millis(1000) && d < Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut generator = PlaceholderGenerator::with_seed(1);
        assert_eq!(generator.count(4, 0), 4);
        assert_eq!(generator.pick(&[]), "");
        assert_eq!(generator.delay(500, 500), Duration::from_millis(500));
    }
}
