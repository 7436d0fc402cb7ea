//! Counter-to-rate conversion with reboot detection.
//!
//! A decrease between two consecutive counter samples means the device
//! restarted. The interval spanning the restart cannot be measured, so it is
//! dropped and counted instead of estimated.

use crate::core::types::ensure_ascending;
use crate::core::Point;
use serde::Serialize;
use std::borrow::Cow;

/// Classification of one counter transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterDelta {
    /// Non-negative change since the previous sample
    Increase(f64),
    /// The counter went backwards
    Reset,
}

/// Classifies the change between two consecutive counter readings.
///
/// Any negative delta is exactly one reset, even if the device rebooted more
/// than once between the samples.
#[inline]
pub fn counter_delta(prev: f64, next: f64) -> CounterDelta {
    let delta = next - prev;
    if delta >= 0.0 {
        CounterDelta::Increase(delta)
    } else {
        CounterDelta::Reset
    }
}

/// Rates produced from a counter series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedCounter {
    /// One rate per measurable interval, stamped with the later sample
    pub points: Vec<Point>,
    /// Number of resets detected
    pub reboot_count: u32,
}

/// Converts monotonic counter samples into scaled per-interval rates.
#[derive(Debug, Clone, Copy)]
pub struct CounterNormalizer {
    scale: f64,
    min_interval_secs: f64,
}

impl CounterNormalizer {
    /// Rates are `delta / elapsed_seconds * scale`
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            min_interval_secs: 0.0,
        }
    }

    /// Ignore samples that arrive sooner than `secs` after the previous
    /// accepted sample. The skipped sample does not become the new baseline.
    pub fn with_min_interval(mut self, secs: f64) -> Self {
        self.min_interval_secs = secs.max(0.0);
        self
    }

    /// Normalizes a counter series. Unordered input is sorted first.
    pub fn normalize(&self, samples: &[Point]) -> NormalizedCounter {
        let samples: Cow<'_, [Point]> = if samples.windows(2).all(|w| w[0].ts <= w[1].ts) {
            Cow::Borrowed(samples)
        } else {
            let mut owned = samples.to_vec();
            ensure_ascending(&mut owned);
            Cow::Owned(owned)
        };

        let mut out = NormalizedCounter::default();
        let Some((first, rest)) = samples.split_first() else {
            return out;
        };

        let mut prev = *first;
        for &curr in rest {
            let elapsed = curr.ts - prev.ts;
            if elapsed <= 0 || (elapsed as f64) < self.min_interval_secs {
                continue;
            }

            match counter_delta(prev.value, curr.value) {
                CounterDelta::Increase(delta) => {
                    out.points.push(Point::new(curr.ts, delta / elapsed as f64 * self.scale));
                },
                CounterDelta::Reset => out.reboot_count += 1,
            }
            prev = curr;
        }

        out
    }
}

/// Normalizes with no minimum interval.
pub fn normalize_counter(samples: &[Point], scale: f64) -> NormalizedCounter {
    CounterNormalizer::new(scale).normalize(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: i64, step: i64, values: &[f64]) -> Vec<Point> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Point::new(start + i as i64 * step, v))
            .collect()
    }

    #[test]
    fn test_reset_drops_one_interval() {
        let samples = series(0, 60, &[100.0, 150.0, 200.0, 50.0, 90.0]);
        let out = normalize_counter(&samples, 1.0);

        assert_eq!(out.reboot_count, 1);
        let ts: Vec<_> = out.points.iter().map(|p| p.ts).collect();
        assert_eq!(ts, vec![60, 120, 240]);
        assert!((out.points[0].value - 50.0 / 60.0).abs() < 1e-12);
        assert!((out.points[2].value - 40.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic_counter_yields_len_minus_one() {
        let samples = series(1_000, 900, &[10.0, 10.0, 25.0, 400.0, 401.0, 900.0]);
        let out = normalize_counter(&samples, 60.0);

        assert_eq!(out.reboot_count, 0);
        assert_eq!(out.points.len(), samples.len() - 1);
        assert!(out.points.iter().all(|p| p.value >= 0.0));
        assert_eq!(out.points[0].value, 0.0);
        assert!((out.points[1].value - 15.0 / 900.0 * 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_and_empty_input() {
        assert_eq!(normalize_counter(&[], 1.0), NormalizedCounter::default());
        let out = normalize_counter(&[Point::new(5, 42.0)], 1.0);
        assert!(out.points.is_empty());
        assert_eq!(out.reboot_count, 0);
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let samples = vec![Point::new(120, 200.0), Point::new(0, 100.0), Point::new(60, 150.0)];
        let out = normalize_counter(&samples, 60.0);

        assert_eq!(out.reboot_count, 0);
        assert_eq!(out.points, vec![Point::new(60, 50.0), Point::new(120, 50.0)]);
    }

    #[test]
    fn test_min_interval_keeps_baseline() {
        // The sample at 10s is jitter; the rate at 60s is measured from 0s.
        let samples = vec![Point::new(0, 0.0), Point::new(10, 30.0), Point::new(60, 120.0)];
        let out = CounterNormalizer::new(60.0).with_min_interval(54.0).normalize(&samples);

        assert_eq!(out.points, vec![Point::new(60, 120.0)]);
    }

    #[test]
    fn test_duplicate_timestamps_skipped() {
        let samples = vec![Point::new(0, 0.0), Point::new(0, 5.0), Point::new(60, 60.0)];
        let out = normalize_counter(&samples, 1.0);
        assert_eq!(out.points, vec![Point::new(60, 1.0)]);
    }

    #[test]
    fn test_counter_delta() {
        assert_eq!(counter_delta(5.0, 5.0), CounterDelta::Increase(0.0));
        assert_eq!(counter_delta(5.0, 8.0), CounterDelta::Increase(3.0));
        assert_eq!(counter_delta(8.0, 5.0), CounterDelta::Reset);
    }
}
