//! graphsource - Time-series aggregation, splicing and alignment engine
//!
//! This library sits between a raw time-series backend and a charting
//! frontend. Charts typically show two views of the same series at once: a
//! coarse long-range overview (the "range" selector) and a fine zoomed-in
//! span (the "detail" view). graphsource turns raw, irregularly dense series
//! into render-ready rows:
//!
//! - Bucketed downsampling to avg/min/max summaries for arbitrary windows
//! - Splicing a coarse range summary with a fine detail summary into one
//!   ordered, gap-free sequence
//! - Aligning independently sampled series onto a common time axis
//!   (full outer join on timestamp)
//! - Sequence-numbered supersession so late responses to stale requests are
//!   discarded without explicit cancellation
//!
//! # Architecture
//!
//! ```text
//! caller
//!   │ load_data(series, range?, detail?, pixel_width)
//!   ▼
//! ┌──────────────────────────┐
//! │ GraphDataProvider /      │  sequence numbers, completion flags
//! │ MultiSeriesGraphData-    │
//! │ Provider                 │
//! └───────────┬──────────────┘
//!             │ LoadRequest (range + detail, per series)
//!             ▼
//! ┌──────────────────────────┐
//! │ SeriesSource             │  lazy raw cache, bucketed downsampling,
//! │  └─ SeriesBackend        │  randomized delivery delay
//! └───────────┬──────────────┘
//!             │ LoadResponse (async, any order)
//!             ▼
//! ┌──────────────────────────┐
//! │ supersession check       │  stale responses silently dropped
//! │ splice range + detail    │
//! │ align series (multi)     │
//! └───────────┬──────────────┘
//!             │ GraphData
//!             ▼
//! broadcast subscribers
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use graphsource::provider::GraphDataProvider;
//! use graphsource::types::TimeRange;
//!
//! let provider = GraphDataProvider::new(Config::default());
//! let mut rx = provider.subscribe();
//!
//! provider.load_data(
//!     "temperature",
//!     Some(TimeRange::new(range_start, range_end)?),
//!     Some(TimeRange::new(detail_start, detail_end)?),
//!     1200, // pixel width of the chart
//! )?;
//!
//! let graph_data = rx.recv().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod generate;
pub mod provider;
pub mod source;
pub mod splice;
pub mod types;

// Re-export main types
pub use config::{Config, GeneratorConfig, LatencyConfig, ProviderConfig};
pub use error::{Error, LoadFailure, Result};
pub use generate::{SeriesBackend, StaticBackend, TrendWalkGenerator};
pub use provider::{GraphDataProvider, MultiSeriesGraphDataProvider, ProviderStats, SeriesConfig};
pub use source::{FixedLatency, LatencyModel, SeriesSource, UniformLatency};
pub use types::{Cell, GraphData, GraphRow, LoadRequest, LoadResponse, RawPoint, RequestKind, SummaryPoint, TimeRange};
