//! Fixed-width time bucketing for long chart periods.

use crate::core::Point;
use std::collections::BTreeMap;

/// Averages points into fixed-width time buckets.
///
/// A point lands in bucket `floor(ts / width)`. Each non-empty bucket becomes
/// one point at the bucket midpoint holding the arithmetic mean of its
/// members, and the output is ordered by bucket. Empty buckets produce
/// nothing.
///
/// A missing or zero width, or fewer than two points, returns the input
/// unchanged.
pub fn bin_points(points: &[Point], width_secs: Option<u32>) -> Vec<Point> {
    let width = match width_secs {
        Some(w) if w > 0 && points.len() > 1 => i64::from(w),
        _ => return points.to_vec(),
    };

    let mut buckets: BTreeMap<i64, (f64, u32)> = BTreeMap::new();
    for point in points {
        let slot = buckets.entry(point.ts.div_euclid(width)).or_insert((0.0, 0));
        slot.0 += point.value;
        slot.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(index, (sum, count))| Point::new(index * width + width / 2, sum / f64::from(count)))
        .collect()
}
