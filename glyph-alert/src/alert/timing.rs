//! Pure timing math for the Active stage.
//!
//! Each function maps elapsed time to one derived output. They are total
//! (defined for every input, including past the end of the alert) so a late
//! or repeated tick never trips over them.

use std::time::Duration;

/// Fraction of the alert that has elapsed, saturating at exactly 1.0.
pub fn progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() || elapsed >= total {
        return 1.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0) as f32
}

/// Square wave with period `2 * interval`: on for the first half of each
/// period, off for the second.
///
/// A zero interval has no period; the lights stay on.
pub fn should_blink(elapsed: Duration, interval: Duration) -> bool {
    let half = interval.as_millis();
    if half == 0 {
        return true;
    }
    elapsed.as_millis() % (2 * half) < half
}

/// Whole seconds left in the alert, floored, never negative.
pub fn remaining_seconds(elapsed: Duration, total: Duration) -> u64 {
    total.saturating_sub(elapsed).as_secs()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test_case(0, 30_000, 0.0)]
    #[test_case(15_000, 30_000, 0.5)]
    #[test_case(30_000, 30_000, 1.0)]
    #[test_case(90_000, 30_000, 1.0)]
    fn progress_values(elapsed: u64, total: u64, expected: f32) {
        assert_eq!(progress(ms(elapsed), ms(total)), expected);
    }

    #[test]
    fn progress_is_bounded_and_non_decreasing() {
        for total in [1u64, 7, 1_000, 20_000, 45_000] {
            let mut previous = 0.0f32;
            for elapsed in (0..=total * 2).step_by((total as usize / 50).max(1)) {
                let p = progress(ms(elapsed), ms(total));
                assert!((0.0..=1.0).contains(&p), "progress {p} out of bounds");
                assert!(p >= previous, "progress went backwards at {elapsed}ms");
                previous = p;
            }
        }
    }

    #[test]
    fn progress_saturates_past_the_end() {
        let total = ms(20_000);
        for extra in [0, 1, 999, 1_000_000] {
            assert_eq!(progress(total + ms(extra), total), 1.0);
        }
    }

    #[test]
    fn progress_with_zero_total_is_complete() {
        assert_eq!(progress(Duration::ZERO, Duration::ZERO), 1.0);
    }

    #[test_case(0, 200, true)]
    #[test_case(199, 200, true)]
    #[test_case(200, 200, false)]
    #[test_case(399, 200, false)]
    #[test_case(400, 200, true)]
    fn blink_phase(elapsed: u64, interval: u64, expected: bool) {
        assert_eq!(should_blink(ms(elapsed), ms(interval)), expected);
    }

    #[test]
    fn blink_has_period_of_twice_the_interval() {
        for interval in [1u64, 3, 100, 200, 500] {
            for t in 0..interval * 6 {
                assert_eq!(
                    should_blink(ms(t), ms(interval)),
                    should_blink(ms(t + 2 * interval), ms(interval)),
                    "t={t} interval={interval}"
                );
            }
        }
    }

    #[test]
    fn blink_keeps_oscillating_after_the_end() {
        let interval = ms(100);
        let end = ms(45_000);
        assert!(should_blink(end, interval));
        assert!(!should_blink(end + interval, interval));
    }

    #[test]
    fn zero_interval_stays_on() {
        assert!(should_blink(ms(12_345), Duration::ZERO));
    }

    #[test_case(0, 30_000, 30)]
    #[test_case(1, 30_000, 29)]
    #[test_case(12_000, 30_000, 18)]
    #[test_case(29_999, 30_000, 0)]
    fn remaining_is_floored(elapsed: u64, total: u64, expected: u64) {
        assert_eq!(remaining_seconds(ms(elapsed), ms(total)), expected);
    }

    #[test]
    fn remaining_is_zero_past_the_end() {
        let total = ms(30_000);
        for extra in [0, 1, 60_000] {
            assert_eq!(remaining_seconds(total + ms(extra), total), 0);
        }
    }

    #[test]
    fn standard_mode_at_full_duration() {
        let total = ms(30_000);
        assert_eq!(progress(ms(30_000), total), 1.0);
        assert_eq!(remaining_seconds(ms(30_000), total), 0);
    }
}
