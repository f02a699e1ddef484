//! Request coordination
//!
//! Coordinators front the asynchronous request/response traffic between a
//! caller and one or more [`SeriesSource`](crate::source::SeriesSource)s:
//!
//! - [`GraphDataProvider`] drives paired range+detail loads for a single
//!   series and splices the two halves once both have arrived.
//! - [`MultiSeriesGraphDataProvider`] runs the same state machine per series,
//!   waits on a completion barrier across all of them, then aligns the
//!   spliced sequences onto a common time axis.
//!
//! Both detect superseded responses by sequence number: every `load_data`
//! call bumps a per-kind counter, and a reply whose sequence number no longer
//! matches the latest issued one is discarded silently. In-flight work is
//! never cancelled; the sequence check is the cooperative substitute.
//!
//! Results are published on a broadcast channel, fired exactly once per
//! completed generation and never partially. Backend failures travel on a
//! separate error broadcast channel and leave their half incomplete.

pub mod align;
pub mod multi;
pub mod single;

pub use multi::{MultiSeriesGraphDataProvider, SeriesConfig};
pub use single::GraphDataProvider;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{GraphRow, SummaryPoint};

/// Counters shared by both coordinator flavors.
///
/// Supersession leaves no other trace, so the discard counter is the only
/// direct way to observe it.
#[derive(Debug, Default)]
pub struct ProviderStats {
    /// Summary requests issued
    pub requests_issued: AtomicU64,

    /// Replies accepted as current
    pub responses_accepted: AtomicU64,

    /// Replies discarded as superseded (or from an unrequested series)
    pub responses_discarded: AtomicU64,

    /// Backend failures forwarded on the error channel
    pub load_failures: AtomicU64,

    /// Completed generations, i.e. notifications fired
    pub generations_completed: AtomicU64,
}

impl ProviderStats {
    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> ProviderStatsSnapshot {
        ProviderStatsSnapshot {
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            responses_accepted: self.responses_accepted.load(Ordering::Relaxed),
            responses_discarded: self.responses_discarded.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            generations_completed: self.generations_completed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ProviderStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatsSnapshot {
    /// Summary requests issued
    pub requests_issued: u64,
    /// Replies accepted as current
    pub responses_accepted: u64,
    /// Replies discarded as superseded
    pub responses_discarded: u64,
    /// Backend failures forwarded on the error channel
    pub load_failures: u64,
    /// Completed generations
    pub generations_completed: u64,
}

/// Convert a single spliced sequence into one-cell rows.
pub(crate) fn single_series_rows(points: &[SummaryPoint]) -> Vec<GraphRow> {
    points
        .iter()
        .map(|p| GraphRow::new(p.timestamp, vec![p.into()]))
        .collect()
}
