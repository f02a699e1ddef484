//! Single-series request coordinator

use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{trace, warn};

use crate::config::{Config, ProviderConfig};
use crate::error::{Error, LoadFailure, Result};
use crate::generate::{SeriesBackend, TrendWalkGenerator};
use crate::provider::{single_series_rows, ProviderStats, ProviderStatsSnapshot};
use crate::source::{
    LatencyModel, ReplyReceiver, ReplySender, SeriesSource, SourceReply, UniformLatency,
};
use crate::splice::splice;
use crate::types::{
    GraphData, LoadRequest, LoadResponse, RequestKind, TimeRange,
};

/// Coordinates paired range+detail loads for one series at a time.
///
/// `load_data` issues up to two summary requests and returns immediately;
/// once both halves of the *current* request generation have arrived, the
/// accepted responses are spliced and the result is broadcast to
/// subscribers, exactly once per generation. Replies to superseded requests
/// are discarded silently.
///
/// One [`SeriesSource`](crate::source::SeriesSource) is created lazily per
/// series name and kept for the provider's lifetime, so a series' raw data
/// is generated once no matter how often it is reloaded.
///
/// Must be created inside a tokio runtime: the reply-handling loop is a
/// spawned task, which is also the only place coordinator state is mutated.
pub struct GraphDataProvider {
    shared: Arc<Shared>,
    sources: DashMap<String, Arc<SeriesSource>>,
    backend: Arc<dyn SeriesBackend>,
    latency: Arc<dyn LatencyModel>,
    reply_tx: ReplySender,
    config: ProviderConfig,
}

struct Shared {
    state: Mutex<State>,
    data_tx: broadcast::Sender<GraphData>,
    error_tx: broadcast::Sender<LoadFailure>,
    stats: ProviderStats,
}

/// Per-generation coordinator state. Only ever touched by `load_data` and
/// the reply loop, both under the one mutex.
#[derive(Default)]
struct State {
    last_range_seq: u64,
    last_detail_seq: u64,
    range_complete: bool,
    detail_complete: bool,
    last_range_resp: Option<LoadResponse>,
    last_detail_resp: Option<LoadResponse>,
    last_detail_window: Option<TimeRange>,
}

impl GraphDataProvider {
    /// Create a provider backed by the configured synthetic generator and
    /// uniform random latency.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;
        Ok(Self::with_parts(
            config.provider.clone(),
            Arc::new(TrendWalkGenerator::new(config.generator)),
            Arc::new(UniformLatency::from_config(&config.latency)),
        ))
    }

    /// Create a provider with an explicit backend and latency model.
    ///
    /// This is the injection seam: tests pass a
    /// [`StaticBackend`](crate::generate::StaticBackend) and a scripted
    /// latency model; a real deployment passes its transport-backed backend.
    pub fn with_parts(
        config: ProviderConfig,
        backend: Arc<dyn SeriesBackend>,
        latency: Arc<dyn LatencyModel>,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (data_tx, _) = broadcast::channel(config.channel_buffer_size);
        let (error_tx, _) = broadcast::channel(config.channel_buffer_size);

        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            data_tx,
            error_tx,
            stats: ProviderStats::default(),
        });

        tokio::spawn(run_reply_loop(reply_rx, Arc::clone(&shared)));

        Self {
            shared,
            sources: DashMap::new(),
            backend,
            latency,
            reply_tx,
            config,
        }
    }

    /// Subscribe to completed graph data generations
    pub fn subscribe(&self) -> broadcast::Receiver<GraphData> {
        self.shared.data_tx.subscribe()
    }

    /// Subscribe to asynchronous load failures
    pub fn subscribe_errors(&self) -> broadcast::Receiver<LoadFailure> {
        self.shared.error_tx.subscribe()
    }

    /// Counter snapshot
    pub fn stats(&self) -> ProviderStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Start a load generation for `series`.
    ///
    /// `range` reloads the coarse overview window; when `None`, the most
    /// recently accepted range response is reused for splicing. `detail`
    /// loads the fine window; when `None`, the generation completes from the
    /// range half alone. `pixel_width` sets the downsampling density,
    /// `bucket_count = pixel_width / points_per_pixel`.
    ///
    /// Validation failures are returned synchronously and nothing is issued.
    /// The result arrives via [`subscribe`](Self::subscribe) once both
    /// halves of this generation have been accepted; a newer `load_data`
    /// call supersedes any half still in flight.
    pub fn load_data(
        &self,
        series: &str,
        range: Option<TimeRange>,
        detail: Option<TimeRange>,
        pixel_width: u32,
    ) -> Result<()> {
        let buckets = validate_request(range, detail, pixel_width, &self.config)?;
        let source = self.source_for(series);

        let mut issue = Vec::with_capacity(2);
        {
            let mut state = self.shared.state.lock();

            match range {
                Some(window) => {
                    state.last_range_seq += 1;
                    state.range_complete = false;
                    issue.push(LoadRequest {
                        series: series.to_string(),
                        kind: RequestKind::Range,
                        seq: state.last_range_seq,
                        window,
                        buckets,
                        include_min_max: self.config.include_min_max,
                    });
                },
                // Keep the previously accepted range response for splicing.
                None => state.range_complete = true,
            }

            match detail {
                Some(window) => {
                    state.last_detail_seq += 1;
                    state.detail_complete = false;
                    state.last_detail_window = Some(window);
                    issue.push(LoadRequest {
                        series: series.to_string(),
                        kind: RequestKind::Detail,
                        seq: state.last_detail_seq,
                        window,
                        buckets,
                        include_min_max: self.config.include_min_max,
                    });
                },
                None => {
                    state.detail_complete = true;
                    state.last_detail_resp = None;
                    state.last_detail_window = None;
                },
            }
        }

        for req in issue {
            self.shared
                .stats
                .requests_issued
                .fetch_add(1, Ordering::Relaxed);
            source.request_summary(req);
        }
        Ok(())
    }

    fn source_for(&self, series: &str) -> Arc<SeriesSource> {
        self.sources
            .entry(series.to_string())
            .or_insert_with(|| {
                Arc::new(SeriesSource::new(
                    series,
                    Arc::clone(&self.backend),
                    Arc::clone(&self.latency),
                    self.reply_tx.clone(),
                ))
            })
            .clone()
    }
}

/// Shared request validation for both coordinator flavors.
pub(crate) fn validate_request(
    range: Option<TimeRange>,
    detail: Option<TimeRange>,
    pixel_width: u32,
    config: &ProviderConfig,
) -> Result<u32> {
    if range.is_none() && detail.is_none() {
        return Err(Error::InvalidRequest(
            "neither a range nor a detail window was supplied".to_string(),
        ));
    }

    for (name, window) in [("range", range), ("detail", detail)] {
        if let Some(w) = window {
            if w.start >= w.end {
                return Err(Error::InvalidRequest(format!(
                    "{} window start {} is not before end {}",
                    name, w.start, w.end
                )));
            }
        }
    }

    let buckets = pixel_width / config.points_per_pixel;
    if buckets == 0 {
        return Err(Error::InvalidRequest(format!(
            "pixel width {} yields zero buckets at {} points per pixel",
            pixel_width, config.points_per_pixel
        )));
    }
    Ok(buckets)
}

async fn run_reply_loop(mut rx: ReplyReceiver, shared: Arc<Shared>) {
    while let Some(reply) = rx.recv().await {
        handle_reply(&shared, reply);
    }
}

fn handle_reply(shared: &Shared, reply: SourceReply) {
    let SourceReply { request, result } = reply;
    let mut state = shared.state.lock();

    let current_seq = match request.kind {
        RequestKind::Range => state.last_range_seq,
        RequestKind::Detail => state.last_detail_seq,
    };
    if request.seq != current_seq {
        // A newer request was issued while this one was in flight.
        shared
            .stats
            .responses_discarded
            .fetch_add(1, Ordering::Relaxed);
        trace!(
            series = %request.series,
            kind = %request.kind,
            seq = request.seq,
            current = current_seq,
            "discarding superseded reply"
        );
        return;
    }

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            // The failed half stays incomplete; no partial data is emitted.
            shared.stats.load_failures.fetch_add(1, Ordering::Relaxed);
            warn!(series = %request.series, kind = %request.kind, %err, "load failed");
            let _ = shared.error_tx.send(LoadFailure {
                series: request.series,
                kind: request.kind,
                seq: request.seq,
                message: err.to_string(),
            });
            return;
        },
    };

    shared
        .stats
        .responses_accepted
        .fetch_add(1, Ordering::Relaxed);
    match request.kind {
        RequestKind::Range => {
            state.last_range_resp = Some(response);
            state.range_complete = true;
        },
        RequestKind::Detail => {
            state.last_detail_resp = Some(response);
            state.detail_complete = true;
        },
    }

    if state.range_complete && state.detail_complete {
        let range_points = state
            .last_range_resp
            .as_ref()
            .map(|r| r.points.as_slice())
            .unwrap_or(&[]);
        let detail_points = state
            .last_detail_resp
            .as_ref()
            .map(|r| r.points.as_slice())
            .unwrap_or(&[]);

        let spliced = splice(range_points, detail_points);
        let data = GraphData {
            rows: single_series_rows(&spliced),
            detail_window: state.last_detail_window,
        };

        shared
            .stats
            .generations_completed
            .fetch_add(1, Ordering::Relaxed);
        // Send fails only when no subscriber is listening, which is fine.
        let _ = shared.data_tx.send(data);
    }
}
