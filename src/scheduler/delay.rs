//! Next-delay policy: fixed interval with a floor, or a uniform draw from a
//! fixed candidate set (each draw independent).

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Config;
use crate::constants::{MIN_INTERVAL_FLOOR_MS, RANDOM_INTERVALS_MS};

pub fn next_delay<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Duration {
    if config.proactive_random_enabled {
        let ms = RANDOM_INTERVALS_MS
            .choose(rng)
            .copied()
            .unwrap_or(RANDOM_INTERVALS_MS[0]);
        return Duration::from_millis(ms);
    }
    fixed_delay(config.interval_ms)
}

pub fn fixed_delay(interval_ms: i64) -> Duration {
    if interval_ms > 0 {
        Duration::from_millis(interval_ms as u64)
    } else {
        Duration::from_millis(MIN_INTERVAL_FLOOR_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_mode_uses_interval() {
        let config = Config {
            interval_ms: 5000,
            proactive_random_enabled: false,
            ..Config::default()
        };
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            assert_eq!(next_delay(&config, &mut rng), Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_fixed_mode_floor_for_non_positive() {
        assert_eq!(fixed_delay(0), Duration::from_millis(MIN_INTERVAL_FLOOR_MS));
        assert_eq!(fixed_delay(-250), Duration::from_millis(MIN_INTERVAL_FLOOR_MS));
    }

    #[test]
    fn test_random_mode_draws_from_candidates() {
        let config = Config {
            interval_ms: 5000,
            proactive_random_enabled: true,
            ..Config::default()
        };
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let ms = next_delay(&config, &mut rng).as_millis() as u64;
            assert!(RANDOM_INTERVALS_MS.contains(&ms), "unexpected delay {}", ms);
        }
    }
}
