//! Multi-series alignment onto a common time axis
//!
//! Independently requested series are sampled on independent timelines; a
//! tabular consumer (a chart with one column group per series) needs them on
//! one axis. [`combine`] full-outer-joins N spliced sequences on timestamp
//! equality: the result has one row per distinct timestamp appearing in any
//! series, and every row carries one cell per series, with an explicit
//! missing cell where a series had no point at that time.

use crate::types::{Cell, GraphRow, SummaryPoint};

/// Outer-join spliced per-series sequences into ordered rows.
///
/// Series are folded in one at a time against the accumulated rows, both
/// sides already time-ordered, so each fold is a linear merge. Cells end up
/// in input order: `rows[_].cells[i]` belongs to `series[i]`.
pub fn combine(series: &[Vec<SummaryPoint>]) -> Vec<GraphRow> {
    let mut rows: Vec<GraphRow> = Vec::new();

    for (series_idx, points) in series.iter().enumerate() {
        let mut merged = Vec::with_capacity(rows.len() + points.len());
        let mut existing = rows.into_iter().peekable();

        for point in points {
            // Existing rows earlier than this point pass through with a
            // missing cell for the current series.
            while let Some(mut row) = existing.next_if(|row| row.timestamp < point.timestamp) {
                row.cells.push(Cell::MISSING);
                merged.push(row);
            }

            if let Some(mut row) = existing.next_if(|row| row.timestamp == point.timestamp) {
                // Same time key: this series joins the existing row.
                row.cells.push(Cell::from(point));
                merged.push(row);
            } else {
                // New time key: fresh row, padded with missing cells for
                // every series already folded in.
                let mut cells = vec![Cell::MISSING; series_idx];
                cells.push(Cell::from(point));
                merged.push(GraphRow::new(point.timestamp, cells));
            }
        }

        // Tail rows not matched by this series.
        for mut row in existing {
            row.cells.push(Cell::MISSING);
            merged.push(row);
        }

        rows = merged;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(times: &[i64]) -> Vec<SummaryPoint> {
        times
            .iter()
            .map(|&t| SummaryPoint::full(t, t as f64, t as f64, t as f64))
            .collect()
    }

    #[test]
    fn test_outer_join_two_series() {
        // A at [0,10,20], B at [10,20,30]
        let rows = combine(&[pts(&[0, 10, 20]), pts(&[10, 20, 30])]);

        assert_eq!(
            rows.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
            vec![0, 10, 20, 30]
        );
        assert!(rows.iter().all(|r| r.cells.len() == 2));

        // Row 0: A present, B missing
        assert_eq!(rows[0].cells[0].avg, Some(0.0));
        assert!(rows[0].cells[1].is_missing());

        // Rows 10 and 20: both present
        assert_eq!(rows[1].cells[0].avg, Some(10.0));
        assert_eq!(rows[1].cells[1].avg, Some(10.0));
        assert_eq!(rows[2].cells[0].avg, Some(20.0));
        assert_eq!(rows[2].cells[1].avg, Some(20.0));

        // Row 30: A missing, B present
        assert!(rows[3].cells[0].is_missing());
        assert_eq!(rows[3].cells[1].avg, Some(30.0));
    }

    #[test]
    fn test_identical_timelines_keep_row_count() {
        let rows = combine(&[pts(&[0, 10, 20]), pts(&[0, 10, 20]), pts(&[0, 10, 20])]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.cells.len() == 3));
        assert!(rows
            .iter()
            .all(|r| r.cells.iter().all(|c| !c.is_missing())));
    }

    #[test]
    fn test_disjoint_timelines_union_rows() {
        let rows = combine(&[pts(&[0, 20]), pts(&[5, 25])]);
        assert_eq!(
            rows.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
            vec![0, 5, 20, 25]
        );
        // Exactly one cell present per row.
        for row in &rows {
            assert_eq!(row.cells.iter().filter(|c| !c.is_missing()).count(), 1);
        }
    }

    #[test]
    fn test_single_series_passthrough() {
        let rows = combine(&[pts(&[0, 10])]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells.len(), 1);
        assert_eq!(rows[0].cells[0].avg, Some(0.0));
    }

    #[test]
    fn test_empty_series_contributes_missing_column() {
        let rows = combine(&[pts(&[0, 10]), Vec::new()]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.cells.len() == 2));
        assert!(rows.iter().all(|r| r.cells[1].is_missing()));
    }

    #[test]
    fn test_no_input_series() {
        assert!(combine(&[]).is_empty());
    }

    #[test]
    fn test_gap_cells_distinct_from_join_holes() {
        // An empty bucket inside a series stays a missing cell at its own
        // time key, exactly like an outer-join hole looks for other series.
        let a = vec![SummaryPoint::full(0, 1.0, 1.0, 1.0), SummaryPoint::empty(10)];
        let b = pts(&[10]);

        let rows = combine(&[a, b]);
        assert_eq!(rows.len(), 2);
        assert!(rows[1].cells[0].is_missing());
        assert_eq!(rows[1].cells[1].avg, Some(10.0));
    }
}
