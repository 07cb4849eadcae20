//! netlens — PCAP-NG capture analysis
//!
//! Decodes a PCAP-NG capture buffer into typed blocks, builds a per-IP
//! traffic index, and enriches every unique public address with
//! geolocation/threat intelligence behind a durable cache. The final
//! [`CaptureReport`] is a self-contained, serializable artifact for
//! rendering or export layers.

pub mod cancel;
pub mod capture;
pub mod classify;
pub mod config;
pub mod intel;
pub mod summary;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

pub use cancel::CancelToken;
pub use capture::{Block, BlockDecoder, BlockKind, EndpointTracker, TrafficLog};
pub use config::Config;
pub use intel::{IntelCache, IntelPipeline, IntelRecord, SharedIntelCache, ThreatLevel};
pub use summary::CaptureSummary;

use capture::ProgressFn;

/// Everything derived from one capture, immutable once returned.
///
/// `interfaces` and `packets` are indices into `blocks`, in file order.
#[derive(Debug, Serialize)]
pub struct CaptureReport {
    pub blocks: Vec<Block>,
    pub interfaces: Vec<usize>,
    pub packets: Vec<usize>,
    pub ip_cache: HashMap<String, IntelRecord>,
    pub traffic: HashMap<Ipv4Addr, TrafficLog>,
    pub summary: CaptureSummary,
}

/// Coordinates one decode-and-enrich session.
///
/// Owns the decoder configuration, the endpoint tracker, and the cache
/// handle, so two analyzers never share hidden state. The cache handle can
/// be cloned out for concurrent reads (e.g. a UI polling threat levels
/// while enrichment runs).
pub struct CaptureAnalyzer {
    config: Config,
    cache: SharedIntelCache,
    cancel: CancelToken,
    on_progress: Option<Arc<ProgressFn>>,
}

impl CaptureAnalyzer {
    /// Create an analyzer, loading any previously persisted cache.
    pub fn new(config: Config) -> Self {
        let cache = match &config.intel.cache_path {
            Some(path) if path.exists() => match IntelCache::load_from_disk(path) {
                Ok(cache) => cache,
                Err(e) => {
                    warn!("starting with an empty intelligence cache: {:#}", e);
                    IntelCache::new()
                }
            },
            _ => IntelCache::new(),
        };

        Self {
            config,
            cache: cache.shared(),
            cancel: CancelToken::new(),
            on_progress: None,
        }
    }

    /// Install a decode progress callback.
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.on_progress = Some(progress);
        self
    }

    /// Token that aborts the decode and stops enrichment early.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shared cache handle for concurrent external reads.
    pub fn cache(&self) -> SharedIntelCache {
        self.cache.clone()
    }

    /// Run the full pipeline over a capture buffer.
    ///
    /// Decoding failures (bad magic, malformed block framing) are fatal and
    /// yield no report. Everything downstream degrades per item instead.
    pub async fn analyze(&self, data: &[u8]) -> Result<CaptureReport> {
        let mut decoder =
            BlockDecoder::new(&self.config.decoder).with_cancel(self.cancel.clone());
        if let Some(progress) = &self.on_progress {
            let progress = progress.clone();
            decoder = decoder.with_progress(Box::new(move |offset, total, count| {
                progress(offset, total, count)
            }));
        }

        let blocks = decoder.decode(data).await?;

        let mut tracker = EndpointTracker::new();
        let mut interfaces = Vec::new();
        let mut packets = Vec::new();
        for (i, block) in blocks.iter().enumerate() {
            match &block.kind {
                BlockKind::InterfaceDescription(_) => interfaces.push(i),
                BlockKind::EnhancedPacket(packet) | BlockKind::SimplePacket(packet) => {
                    packets.push(i);
                    tracker.track(packet);
                }
                _ => {}
            }
        }

        info!(
            "decoded {} blocks ({} packets, {} interfaces), {} unique addresses",
            blocks.len(),
            packets.len(),
            interfaces.len(),
            tracker.unique_count()
        );

        if self.config.intel.enabled {
            let pipeline =
                IntelPipeline::new(&self.config.intel, self.cache.clone(), self.cancel.clone())?;
            pipeline.enrich(tracker.addresses()).await;
        }

        let summary = summary::summarize(&blocks, tracker.unique_count());
        let ip_cache = self.cache.read().snapshot();

        Ok(CaptureReport {
            blocks,
            interfaces,
            packets,
            ip_cache,
            traffic: tracker.into_index(),
            summary,
        })
    }
}
