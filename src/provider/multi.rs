//! Multi-series request coordinator

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};

use crate::config::{Config, ProviderConfig};
use crate::error::{Error, LoadFailure, Result};
use crate::generate::{SeriesBackend, TrendWalkGenerator};
use crate::provider::align::combine;
use crate::provider::single::validate_request;
use crate::provider::{ProviderStats, ProviderStatsSnapshot};
use crate::source::{
    LatencyModel, ReplyReceiver, ReplySender, SeriesSource, SourceReply, UniformLatency,
};
use crate::splice::splice;
use crate::types::{GraphData, LoadRequest, LoadResponse, RequestKind, TimeRange};

/// Configuration of one requested series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesConfig {
    /// Name of the series to load
    pub series_name: String,
}

impl SeriesConfig {
    /// Create a series configuration
    pub fn new(series_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
        }
    }
}

/// Coordinates range+detail loads across N series at once.
///
/// Each `load_data` call resets the per-series state wholesale; halves of a
/// previous generation still in flight are dropped by the sequence check
/// when they eventually resolve. Every requested series independently runs
/// the range/detail state machine; a completion barrier holds the combined
/// result back until *all* series report both halves complete, and only
/// then are the spliced sequences aligned onto a common time axis and
/// broadcast.
///
/// The barrier has no timeout: a request that never resolves (the backend
/// neither replies nor fails) stalls the whole combined result. Callers
/// wanting progress under loss must re-invoke `load_data`, which starts a
/// fresh generation.
///
/// Must be created inside a tokio runtime, like
/// [`GraphDataProvider`](crate::provider::GraphDataProvider).
pub struct MultiSeriesGraphDataProvider {
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

/// Range/detail progress of one series within the current generation.
#[derive(Default)]
struct SeriesHolder {
    range_complete: bool,
    detail_complete: bool,
    last_range_req: Option<LoadRequest>,
    last_detail_req: Option<LoadRequest>,
    last_range_resp: Option<LoadResponse>,
    last_detail_resp: Option<LoadResponse>,
}

#[derive(Default)]
struct State {
    /// Requested series, in caller order; fixes the output cell order
    series_names: Vec<String>,
    holders: HashMap<String, SeriesHolder>,
    requested: usize,
    loaded: usize,
    last_range_seq: u64,
    last_detail_seq: u64,
    last_detail_window: Option<TimeRange>,
}

impl MultiSeriesGraphDataProvider {
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

    /// Start a load generation for all of `series_configs`.
    ///
    /// Windows and density behave exactly as on
    /// [`GraphDataProvider::load_data`](crate::provider::GraphDataProvider::load_data);
    /// when `range` is `None`, each series reuses its own most recently
    /// accepted range response, carried over from the previous generation.
    /// The combined notification fires only after every requested series has
    /// both halves complete for this generation.
    pub fn load_data(
        &self,
        series_configs: &[SeriesConfig],
        range: Option<TimeRange>,
        detail: Option<TimeRange>,
        pixel_width: u32,
    ) -> Result<()> {
        if series_configs.is_empty() {
            return Err(Error::InvalidRequest("no series requested".to_string()));
        }
        let buckets = validate_request(range, detail, pixel_width, &self.config)?;

        let mut issue: Vec<(Arc<SeriesSource>, LoadRequest)> =
            Vec::with_capacity(series_configs.len() * 2);
        {
            let mut state = self.shared.state.lock();

            // Every load resets the generation wholesale; in-flight halves
            // of the previous one are dropped by the sequence check when
            // they resolve. Only accepted range responses are carried over,
            // for calls that do not reload the range.
            let prev_holders = std::mem::take(&mut state.holders);
            state.series_names.clear();
            state.requested = series_configs.len();
            state.loaded = 0;

            for series_config in series_configs {
                let name = &series_config.series_name;
                let source = self.source_for(name);
                let mut holder = SeriesHolder::default();
                state.series_names.push(name.clone());

                match range {
                    Some(window) => {
                        state.last_range_seq += 1;
                        let req = LoadRequest {
                            series: name.clone(),
                            kind: RequestKind::Range,
                            seq: state.last_range_seq,
                            window,
                            buckets,
                            include_min_max: self.config.include_min_max,
                        };
                        holder.last_range_req = Some(req.clone());
                        issue.push((Arc::clone(&source), req));
                    },
                    None => {
                        holder.range_complete = true;
                        holder.last_range_resp = prev_holders
                            .get(name)
                            .and_then(|prev| prev.last_range_resp.clone());
                    },
                }

                match detail {
                    Some(window) => {
                        state.last_detail_seq += 1;
                        state.last_detail_window = Some(window);
                        let req = LoadRequest {
                            series: name.clone(),
                            kind: RequestKind::Detail,
                            seq: state.last_detail_seq,
                            window,
                            buckets,
                            include_min_max: self.config.include_min_max,
                        };
                        holder.last_detail_req = Some(req.clone());
                        issue.push((Arc::clone(&source), req));
                    },
                    None => holder.detail_complete = true,
                }

                state.holders.insert(name.clone(), holder);
            }
        }

        debug!(
            series = series_configs.len(),
            requests = issue.len(),
            "starting multi-series load generation"
        );
        for (source, req) in issue {
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

async fn run_reply_loop(mut rx: ReplyReceiver, shared: Arc<Shared>) {
    while let Some(reply) = rx.recv().await {
        handle_reply(&shared, reply);
    }
}

fn handle_reply(shared: &Shared, reply: SourceReply) {
    let SourceReply { request, result } = reply;
    let mut state = shared.state.lock();

    // The holder carries the latest issued request for each kind; a reply
    // from a series that is no longer requested, or with an out-of-date
    // sequence number, is superseded.
    let holder = state.holders.get_mut(&request.series);
    let current_seq = holder.as_ref().and_then(|h| match request.kind {
        RequestKind::Range => h.last_range_req.as_ref().map(|r| r.seq),
        RequestKind::Detail => h.last_detail_req.as_ref().map(|r| r.seq),
    });
    let holder = match holder {
        Some(holder) if current_seq == Some(request.seq) => holder,
        _ => {
            shared
                .stats
                .responses_discarded
                .fetch_add(1, Ordering::Relaxed);
            trace!(
                series = %request.series,
                kind = %request.kind,
                seq = request.seq,
                "discarding superseded reply"
            );
            return;
        },
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            // The series stays incomplete, so the barrier never opens for
            // this generation; surfaced on the error channel instead.
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
            holder.last_range_resp = Some(response);
            holder.range_complete = true;
        },
        RequestKind::Detail => {
            holder.last_detail_resp = Some(response);
            holder.detail_complete = true;
        },
    }

    // Each series trips this at most once per generation (each half
    // completes at most once), so the counter cannot double-count.
    if !(holder.range_complete && holder.detail_complete) {
        return;
    }
    state.loaded += 1;
    if state.loaded != state.requested {
        return;
    }

    // Barrier open: splice every series, then align on the time axis.
    let spliced: Vec<_> = state
        .series_names
        .iter()
        .map(|name| {
            let holder = &state.holders[name];
            let range_points = holder
                .last_range_resp
                .as_ref()
                .map(|r| r.points.as_slice())
                .unwrap_or(&[]);
            let detail_points = holder
                .last_detail_resp
                .as_ref()
                .map(|r| r.points.as_slice())
                .unwrap_or(&[]);
            splice(range_points, detail_points)
        })
        .collect();

    let data = GraphData {
        rows: combine(&spliced),
        detail_window: state.last_detail_window,
    };

    shared
        .stats
        .generations_completed
        .fetch_add(1, Ordering::Relaxed);
    let _ = shared.data_tx.send(data);
}
