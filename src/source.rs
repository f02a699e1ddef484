//! Per-series summary source
//!
//! A [`SeriesSource`] owns the raw data of one named series and answers
//! summary requests for it. The raw sequence is fetched from the configured
//! [`SeriesBackend`](crate::generate::SeriesBackend) exactly once, on first
//! use, and cached for the lifetime of the source; all later requests
//! aggregate against that cache.
//!
//! Responses are delivered asynchronously on the coordinator's reply channel
//! after a delay drawn from the configured [`LatencyModel`] - the stand-in
//! for variable network latency and the sole source of response reordering
//! in the system. Outstanding requests are fully independent: no queueing,
//! no de-duplication, and no cancellation; a request that was superseded
//! still runs to completion and its reply is discarded by the coordinator.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, trace};

use crate::aggregate::downsample;
use crate::config::LatencyConfig;
use crate::error::Result;
use crate::generate::SeriesBackend;
use crate::types::{LoadRequest, LoadResponse, RawPoint};

/// Delay distribution for response delivery.
///
/// Injectable so tests can pin delivery order: a zero-delay model makes
/// responses arrive in issue order, a scripted model can reverse them to
/// exercise supersession.
pub trait LatencyModel: Send + Sync + 'static {
    /// Draw the delivery delay for one request.
    fn delay(&self, req: &LoadRequest) -> Duration;
}

/// Uniform random delay in `[min_ms, max_ms]`
#[derive(Debug, Clone)]
pub struct UniformLatency {
    min_ms: u64,
    max_ms: u64,
}

impl UniformLatency {
    /// Create a uniform delay model
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Create from configuration
    pub fn from_config(config: &LatencyConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }
}

impl LatencyModel for UniformLatency {
    fn delay(&self, _req: &LoadRequest) -> Duration {
        let ms = if self.max_ms <= self.min_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

/// Constant delay for every request
#[derive(Debug, Clone, Copy)]
pub struct FixedLatency(pub Duration);

impl LatencyModel for FixedLatency {
    fn delay(&self, _req: &LoadRequest) -> Duration {
        self.0
    }
}

/// A reply traveling back to the coordinator.
///
/// The originating request rides along with the result so the coordinator
/// can correlate by identity instead of reconstructing request parameters.
#[derive(Debug)]
pub struct SourceReply {
    /// The request this reply answers
    pub request: LoadRequest,
    /// The summary, or the backend failure that prevented it
    pub result: Result<LoadResponse>,
}

/// Sender half of a coordinator's reply channel
pub type ReplySender = mpsc::UnboundedSender<SourceReply>;

/// Receiver half of a coordinator's reply channel
pub type ReplyReceiver = mpsc::UnboundedReceiver<SourceReply>;

/// Owns one raw series and serves summary requests against it
pub struct SeriesSource {
    name: String,
    backend: Arc<dyn SeriesBackend>,
    latency: Arc<dyn LatencyModel>,
    reply_tx: ReplySender,

    /// Lazily fetched raw sequence; initialized at most once even under
    /// concurrent first requests.
    raw: OnceCell<Arc<Vec<RawPoint>>>,
}

impl SeriesSource {
    /// Create a source for `name` replying on `reply_tx`
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn SeriesBackend>,
        latency: Arc<dyn LatencyModel>,
        reply_tx: ReplySender,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            latency,
            reply_tx,
            raw: OnceCell::new(),
        }
    }

    /// Series name this source serves
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issue a summary request. Returns immediately; the reply arrives on
    /// the coordinator's channel after the drawn delay.
    pub fn request_summary(self: &Arc<Self>, req: LoadRequest) {
        debug!(
            series = %req.series,
            kind = %req.kind,
            seq = req.seq,
            start = req.window.start,
            end = req.window.end,
            buckets = req.buckets,
            "issuing summary request"
        );

        let source = Arc::clone(self);
        tokio::spawn(async move {
            let result = source.summarize(&req).await;
            let delay = source.latency.delay(&req);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if source.reply_tx.send(SourceReply { request: req, result }).is_err() {
                trace!(series = %source.name, "coordinator gone, reply dropped");
            }
        });
    }

    async fn summarize(&self, req: &LoadRequest) -> Result<LoadResponse> {
        let raw = self
            .raw
            .get_or_try_init(|| async {
                self.backend.raw_series(&self.name).await.map(Arc::new)
            })
            .await?;

        let points = downsample(raw, req.window, req.buckets, req.include_min_max);
        Ok(LoadResponse { points })
    }
}
