//! Core data types used throughout the engine
//!
//! # Key Types
//!
//! - **`RawPoint`**: A single raw measurement (timestamp + value)
//! - **`SummaryPoint`**: One downsampled bucket (avg/min/max, tri-state)
//! - **`TimeRange`**: Half-open time window for requests
//! - **`LoadRequest` / `LoadResponse`**: The request/response contract
//!   between a coordinator and a [`SeriesSource`](crate::source::SeriesSource)
//! - **`GraphData`**: The caller-facing, render-ready result
//!
//! A missing value is always an explicit `None`, never zero: a bucket with no
//! raw points must render as a gap, not as a dip to zero.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single raw data point in a time-series
///
/// Immutable once generated. Raw sequences are strictly ordered by
/// `timestamp`; every consumer in this crate relies on that ordering and
/// never sorts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Unix timestamp in milliseconds since epoch
    pub timestamp: i64,

    /// Measurement value
    pub value: f64,
}

impl RawPoint {
    /// Create a new raw point
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One downsampled bucket of a series
///
/// `avg`, `min` and `max` are tri-state: `None` marks a bucket that contained
/// no raw points. Such buckets are still emitted at their time key so a
/// renderer can draw a gap instead of interpolating across it.
///
/// When a summary was requested without min/max
/// (`LoadRequest::include_min_max == false`), `min` and `max` are `None`
/// for every bucket and only `avg` carries data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryPoint {
    /// Bucket timestamp in milliseconds (lower bucket edge)
    pub timestamp: i64,

    /// Arithmetic mean of the bucket's raw values, `None` if empty
    pub avg: Option<f64>,

    /// Minimum raw value in the bucket, `None` if empty or not requested
    pub min: Option<f64>,

    /// Maximum raw value in the bucket, `None` if empty or not requested
    pub max: Option<f64>,
}

impl SummaryPoint {
    /// Create a summary carrying avg, min and max
    pub fn full(timestamp: i64, avg: f64, min: f64, max: f64) -> Self {
        Self {
            timestamp,
            avg: Some(avg),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Create an avg-only summary (min/max not requested)
    pub fn avg_only(timestamp: i64, avg: f64) -> Self {
        Self {
            timestamp,
            avg: Some(avg),
            min: None,
            max: None,
        }
    }

    /// Create an all-missing summary for an empty bucket
    pub fn empty(timestamp: i64) -> Self {
        Self {
            timestamp,
            avg: None,
            min: None,
            max: None,
        }
    }

    /// True if this bucket contained no raw points
    pub fn is_missing(&self) -> bool {
        self.avg.is_none()
    }
}

/// Time window for requests
///
/// Request windows are half-open `[start, end)`: the aggregator walks buckets
/// from `start` and the final bucket's upper edge is `end`.
///
/// # Example
///
/// ```rust
/// use graphsource::types::TimeRange;
///
/// let range = TimeRange::new(1000, 2000).unwrap();
/// assert!(range.contains(1000));
/// assert!(range.contains(1999));
/// assert!(!range.contains(2000));
/// assert_eq!(range.duration_ms(), 1000);
///
/// // end must be strictly after start
/// assert!(TimeRange::new(2000, 1000).is_err());
/// assert!(TimeRange::new(1000, 1000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp in milliseconds (inclusive)
    pub start: i64,

    /// End timestamp in milliseconds (exclusive)
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range, validating that `start < end`
    pub fn new(start: i64, end: i64) -> crate::error::Result<Self> {
        if start >= end {
            return Err(crate::error::Error::InvalidRequest(format!(
                "Invalid time range: start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Create a time range without validation
    ///
    /// Only for inputs already known to satisfy `start < end`; the range
    /// operations misbehave on inverted ranges.
    pub fn new_unchecked(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Check whether a timestamp falls within this range (`start <= t < end`)
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Duration of the range in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Which half of a paired data load a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Coarse long-range overview window
    Range,
    /// Fine zoomed-in detail window
    Detail,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Range => write!(f, "range"),
            RequestKind::Detail => write!(f, "detail"),
        }
    }
}

/// A summary request issued by a coordinator against a series source
///
/// `seq` is assigned by the issuing coordinator and increases monotonically
/// per `(series, kind)` pair. It is the sole staleness mechanism: a response
/// whose `seq` no longer matches the latest issued number for its pair is
/// discarded unread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Name of the requested series
    pub series: String,

    /// Range or detail half of the request pair
    pub kind: RequestKind,

    /// Monotonic sequence number per `(series, kind)`
    pub seq: u64,

    /// Window to summarize, half-open
    pub window: TimeRange,

    /// Number of downsampling buckets to produce
    pub buckets: u32,

    /// Whether to compute per-bucket extrema in addition to the mean
    pub include_min_max: bool,
}

/// Response to a [`LoadRequest`]
///
/// Travels through the response channel together with its originating
/// request; correlation is by that pairing, never reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResponse {
    /// Downsampled points, ascending by timestamp, no duplicates
    pub points: Vec<SummaryPoint>,
}

/// One rendered value of one series at one time key
///
/// A band (`min`/`avg`/`max`) when extrema were requested, a scalar
/// (`avg` only) otherwise. All fields `None` marks a series with no point at
/// this time key (a gap, or an outer-join hole in multi-series output).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Lower band edge
    pub min: Option<f64>,
    /// Mean value
    pub avg: Option<f64>,
    /// Upper band edge
    pub max: Option<f64>,
}

impl Cell {
    /// A cell with no data for its series at this time key
    pub const MISSING: Cell = Cell {
        min: None,
        avg: None,
        max: None,
    };

    /// True if this series carried no value at this time key
    pub fn is_missing(&self) -> bool {
        self.avg.is_none() && self.min.is_none() && self.max.is_none()
    }
}

impl From<&SummaryPoint> for Cell {
    fn from(p: &SummaryPoint) -> Self {
        Cell {
            min: p.min,
            avg: p.avg,
            max: p.max,
        }
    }
}

/// One output row: a time key plus one cell per requested series
///
/// Cells appear in the order the series were requested. Single-series
/// results carry exactly one cell per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRow {
    /// Time key in milliseconds
    pub timestamp: i64,

    /// One cell per series, in request order
    pub cells: Vec<Cell>,
}

impl GraphRow {
    /// Create a row
    pub fn new(timestamp: i64, cells: Vec<Cell>) -> Self {
        Self { timestamp, cells }
    }
}

/// Caller-facing result of a completed load generation
///
/// Emitted at most once per completed request generation, never partially.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphData {
    /// Ordered rows, one per distinct time key
    pub rows: Vec<GraphRow>,

    /// The detail window this generation was loaded for, if one was requested
    pub detail_window: Option<TimeRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range() {
        let range = TimeRange::new(100, 200).unwrap();
        assert!(range.contains(150));
        assert!(range.contains(100));
        assert!(!range.contains(200));
        assert!(!range.contains(50));
        assert_eq!(range.duration_ms(), 100);

        assert!(TimeRange::new(200, 100).is_err());
        assert!(TimeRange::new(100, 100).is_err());
    }

    #[test]
    fn test_summary_point_tri_state() {
        let empty = SummaryPoint::empty(1000);
        assert!(empty.is_missing());
        assert_eq!(empty.avg, None);

        let full = SummaryPoint::full(1000, 5.0, 1.0, 9.0);
        assert!(!full.is_missing());

        let scalar = SummaryPoint::avg_only(1000, 5.0);
        assert!(!scalar.is_missing());
        assert_eq!(scalar.min, None);
        assert_eq!(scalar.max, None);
    }

    #[test]
    fn test_cell_from_summary() {
        let cell = Cell::from(&SummaryPoint::full(0, 5.0, 1.0, 9.0));
        assert_eq!(cell.avg, Some(5.0));
        assert!(!cell.is_missing());

        let gap = Cell::from(&SummaryPoint::empty(0));
        assert!(gap.is_missing());
        assert_eq!(gap, Cell::MISSING);
    }
}
