//! Randomized cycle parameters: swap counts, waits, pair and bin-step picks.
//!
//! Every helper takes the RNG explicitly so callers can seed it in tests.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::token::TokenDescriptor;

/// Inclusive `[min, max]` range, configured as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct RangeInclusive {
    pub min: u64,
    pub max: u64,
}

impl RangeInclusive {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl From<[u64; 2]> for RangeInclusive {
    fn from(value: [u64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<RangeInclusive> for [u64; 2] {
    fn from(value: RangeInclusive) -> Self {
        [value.min, value.max]
    }
}

/// Uniform integer in `[min, max]`, both ends inclusive. Swaps inverted bounds.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}

/// Uniform wait in a millisecond window
pub fn random_wait<R: Rng + ?Sized>(rng: &mut R, window_ms: RangeInclusive) -> Duration {
    Duration::from_millis(random_int(rng, window_ms.min, window_ms.max))
}

/// Two distinct random tokens, kept in configuration order so the first one
/// owns `token_x_amount`. `None` with fewer than two tokens.
pub fn select_token_pair<'a, R: Rng + ?Sized>(
    rng: &mut R,
    tokens: &'a [TokenDescriptor],
) -> Option<(&'a TokenDescriptor, &'a TokenDescriptor)> {
    if tokens.len() < 2 {
        return None;
    }
    let mut picked = rand::seq::index::sample(rng, tokens.len(), 2).into_vec();
    picked.sort_unstable();
    Some((&tokens[picked[0]], &tokens[picked[1]]))
}

pub fn select_bin_step<R: Rng + ?Sized>(rng: &mut R, bin_steps: &[u16]) -> Option<u16> {
    bin_steps.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_int_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for (min, max) in [(0u64, 0u64), (3, 3), (1, 2), (5, 10), (0, 1_000)] {
            for _ in 0..2_000 {
                let v = random_int(&mut rng, min, max);
                assert!(v >= min && v <= max, "{} outside [{}, {}]", v, min, max);
            }
        }
    }

    #[test]
    fn test_random_int_hits_both_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<u64> = (0..1_000).map(|_| random_int(&mut rng, 2, 4)).collect();
        assert!(samples.contains(&2));
        assert!(samples.contains(&4));
    }

    #[test]
    fn test_random_int_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let v = random_int(&mut rng, 9, 3);
        assert!((3..=9).contains(&v));
    }

    #[test]
    fn test_random_wait_window() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let wait = random_wait(&mut rng, RangeInclusive::new(5_000, 15_000));
            assert!(wait >= Duration::from_millis(5_000));
            assert!(wait <= Duration::from_millis(15_000));
        }
    }

    #[test]
    fn test_select_token_pair_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        let tokens = vec![
            TokenDescriptor::new("A", "a", 6),
            TokenDescriptor::new("B", "b", 6),
            TokenDescriptor::new("C", "c", 9),
        ];
        for _ in 0..200 {
            let (x, y) = select_token_pair(&mut rng, &tokens).unwrap();
            assert_ne!(x.symbol, y.symbol);
            assert!(x.symbol < y.symbol, "pair {}-{} out of configuration order", x.symbol, y.symbol);
        }
        assert!(select_token_pair(&mut rng, &tokens[..1]).is_none());
    }

    #[test]
    fn test_select_bin_step() {
        let mut rng = StdRng::seed_from_u64(5);
        let steps = [10u16, 20, 80];
        for _ in 0..100 {
            assert!(steps.contains(&select_bin_step(&mut rng, &steps).unwrap()));
        }
        assert!(select_bin_step(&mut rng, &[]).is_none());
    }

    #[test]
    fn test_range_deserializes_from_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            range: RangeInclusive,
        }
        let w: Wrapper = toml::from_str("range = [2, 5]").unwrap();
        assert_eq!(w.range, RangeInclusive::new(2, 5));
        assert!(w.range.is_valid());
        assert!(!RangeInclusive::new(5, 2).is_valid());
    }
}
