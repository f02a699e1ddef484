//! Bucketed downsampling of raw series
//!
//! Reduces a raw ordered point sequence to a fixed number of per-bucket
//! avg/min/max summaries for a requested window. Buckets are half-open
//! `[start + i*w, start + (i+1)*w)` with `w = (end - start) / bucket_count`,
//! walked left to right; a raw point belongs to the first bucket whose upper
//! edge exceeds its timestamp.
//!
//! Empty buckets are emitted as all-missing summaries at their time key.
//! Dropping them instead would make a renderer interpolate across the gap,
//! which misrepresents absent data.
//!
//! Complexity is O(points in window + bucket_count). The raw sequence is
//! assumed time-ordered (guaranteed at generation time) and is consumed in a
//! single forward pass; no sorting, no retained state between calls.

use crate::types::{RawPoint, SummaryPoint, TimeRange};

/// Downsample `raw` over `window` into `buckets` summaries.
///
/// Each summary is stamped at its bucket's lower edge, and output timestamps
/// are strictly ascending. A window shorter than the requested bucket count
/// yields one bucket per millisecond instead, since sub-millisecond buckets
/// cannot carry distinct integer timestamps.
///
/// With `include_min_max == false` only the mean is computed and `min`/`max`
/// stay `None` on every output point.
///
/// Returns an empty vector for `buckets == 0`; coordinators validate bucket
/// counts before issuing requests, so this path only guards direct callers.
pub fn downsample(
    raw: &[RawPoint],
    window: TimeRange,
    buckets: u32,
    include_min_max: bool,
) -> Vec<SummaryPoint> {
    // A bucket narrower than one millisecond would truncate to a duplicate
    // timestamp; cap the count so every bucket spans at least 1 ms.
    let buckets = i64::from(buckets).min(window.duration_ms()).max(0) as u32;
    if buckets == 0 {
        return Vec::new();
    }

    // Edges are computed in f64 so the remainder of an inexact division
    // spreads across buckets instead of piling into the last one.
    let width = window.duration_ms() as f64 / buckets as f64;
    let mut points = Vec::with_capacity(buckets as usize);

    // Skip raw points before the window.
    let mut idx = raw.partition_point(|p| p.timestamp < window.start);

    for bucket in 0..buckets {
        let lower = window.start as f64 + bucket as f64 * width;
        let upper = if bucket == buckets - 1 {
            // Pin the final edge so float error cannot leak a point at
            // end - 1 out of the window or admit one at end.
            window.end as f64
        } else {
            window.start as f64 + (bucket + 1) as f64 * width
        };

        let mut count: u64 = 0;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        while idx < raw.len() && (raw[idx].timestamp as f64) < upper {
            let value = raw[idx].value;
            sum += value;
            if include_min_max {
                min = min.min(value);
                max = max.max(value);
            }
            count += 1;
            idx += 1;
        }

        let timestamp = lower as i64;
        if count == 0 {
            points.push(SummaryPoint::empty(timestamp));
        } else {
            let avg = sum / count as f64;
            if include_min_max {
                points.push(SummaryPoint::full(timestamp, avg, min, max));
            } else {
                points.push(SummaryPoint::avg_only(timestamp, avg));
            }
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(points: &[(i64, f64)]) -> Vec<RawPoint> {
        points.iter().map(|&(t, v)| RawPoint::new(t, v)).collect()
    }

    #[test]
    fn test_exact_bucket_count_and_means() {
        // 3 buckets of width 10 over [0, 30)
        let data = raw(&[(0, 1.0), (5, 3.0), (10, 10.0), (25, 7.0)]);
        let window = TimeRange::new_unchecked(0, 30);

        let out = downsample(&data, window, 3, true);
        assert_eq!(out.len(), 3);

        // Bucket [0, 10): values 1.0 and 3.0
        assert_eq!(out[0].timestamp, 0);
        assert_eq!(out[0].avg, Some(2.0));
        assert_eq!(out[0].min, Some(1.0));
        assert_eq!(out[0].max, Some(3.0));

        // Bucket [10, 20): value 10.0 only
        assert_eq!(out[1].timestamp, 10);
        assert_eq!(out[1].avg, Some(10.0));
        assert_eq!(out[1].min, Some(10.0));
        assert_eq!(out[1].max, Some(10.0));

        // Bucket [20, 30): value 7.0 only
        assert_eq!(out[2].timestamp, 20);
        assert_eq!(out[2].avg, Some(7.0));
    }

    #[test]
    fn test_empty_bucket_is_missing_not_zero() {
        let data = raw(&[(0, 5.0), (25, 5.0)]);
        let window = TimeRange::new_unchecked(0, 30);

        let out = downsample(&data, window, 3, true);
        assert_eq!(out.len(), 3);
        assert!(!out[0].is_missing());
        assert!(out[1].is_missing());
        assert_eq!(out[1].timestamp, 10);
        assert_eq!(out[1].avg, None);
        assert!(!out[2].is_missing());
    }

    #[test]
    fn test_points_outside_window_ignored() {
        let data = raw(&[(-5, 100.0), (5, 1.0), (30, 100.0), (35, 100.0)]);
        let window = TimeRange::new_unchecked(0, 30);

        let out = downsample(&data, window, 3, true);
        assert_eq!(out[0].avg, Some(1.0));
        assert!(out[1].is_missing());
        assert!(out[2].is_missing());
    }

    #[test]
    fn test_boundary_point_belongs_to_next_bucket() {
        // t == 10 sits on the edge between [0,10) and [10,20): next bucket.
        let data = raw(&[(10, 4.0)]);
        let window = TimeRange::new_unchecked(0, 20);

        let out = downsample(&data, window, 2, true);
        assert!(out[0].is_missing());
        assert_eq!(out[1].avg, Some(4.0));
    }

    #[test]
    fn test_avg_only_mode() {
        let data = raw(&[(0, 1.0), (5, 3.0)]);
        let window = TimeRange::new_unchecked(0, 10);

        let out = downsample(&data, window, 1, false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].avg, Some(2.0));
        assert_eq!(out[0].min, None);
        assert_eq!(out[0].max, None);
    }

    #[test]
    fn test_uneven_division_spreads_remainder() {
        // Width 100/3: edges at 33.33 and 66.67, not 33/66 with a fat tail.
        let data = raw(&[(33, 1.0), (34, 2.0), (66, 3.0), (67, 4.0)]);
        let window = TimeRange::new_unchecked(0, 100);

        let out = downsample(&data, window, 3, true);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].avg, Some(1.0)); // 33 < 33.33
        assert_eq!(out[1].avg, Some(2.5)); // 34 and 66
        assert_eq!(out[2].avg, Some(4.0)); // 67 > 66.67
    }

    #[test]
    fn test_empty_raw_yields_all_missing() {
        let out = downsample(&[], TimeRange::new_unchecked(0, 40), 4, true);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p.is_missing()));
        assert_eq!(
            out.iter().map(|p| p.timestamp).collect::<Vec<_>>(),
            vec![0, 10, 20, 30]
        );
    }

    #[test]
    fn test_window_shorter_than_bucket_count_keeps_timestamps_unique() {
        // 5 ms window, 10 buckets requested: one bucket per millisecond.
        let data = raw(&[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0), (4, 5.0)]);
        let window = TimeRange::new_unchecked(0, 5);

        let out = downsample(&data, window, 10, true);
        let ts: Vec<i64> = out.iter().map(|p| p.timestamp).collect();
        assert_eq!(ts, vec![0, 1, 2, 3, 4]);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(out[0].avg, Some(1.0));
        assert_eq!(out[4].avg, Some(5.0));
    }

    #[test]
    fn test_zero_buckets() {
        let data = raw(&[(0, 1.0)]);
        assert!(downsample(&data, TimeRange::new_unchecked(0, 10), 0, true).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let data = raw(&[(0, 1.0), (7, 2.0), (13, -4.0), (28, 9.5)]);
        let window = TimeRange::new_unchecked(0, 30);

        let first = downsample(&data, window, 5, true);
        let second = downsample(&data, window, 5, true);
        assert_eq!(first, second);
    }
}
