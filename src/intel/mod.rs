//! Intelligence enrichment pipeline
//!
//! Resolves every unique public address found in a capture to a cached
//! [`IntelRecord`], querying a primary provider with a fallback, pacing
//! requests to respect upstream rate limits, and flushing the durable
//! cache in batches. Requests are strictly sequential by design: the
//! providers meter by key and a burst costs more than the wall-clock it
//! saves.

pub mod abstract_api;
pub mod cache;
pub mod ipapi;
pub mod provider;
pub mod record;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::classify;
use crate::config::IntelConfig;

pub use abstract_api::AbstractApiProvider;
pub use cache::{IntelCache, SharedIntelCache};
pub use ipapi::IpapiProvider;
pub use provider::IntelProvider;
pub use record::{GeoIntel, IntelRecord, SecurityFlags, ThreatLevel};

/// Statistics from one enrichment pass.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentStats {
    pub total: usize,
    /// Addresses classified locally, no provider contact.
    pub special: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    /// Subset of `fetched` answered by the fallback provider.
    pub fallback_used: usize,
    /// Addresses both providers failed on.
    pub failed: usize,
    pub duration_ms: u64,
}

/// Sequential, rate-limited enrichment over a unique-address set.
pub struct IntelPipeline {
    client: reqwest::Client,
    primary: Box<dyn IntelProvider>,
    fallback: Box<dyn IntelProvider>,
    cache: SharedIntelCache,
    cache_path: Option<PathBuf>,
    request_delay: Duration,
    flush_interval: usize,
    cancel: CancelToken,
}

impl IntelPipeline {
    /// Build the pipeline with the configured Abstract API primary and
    /// ipapi.co fallback.
    pub fn new(config: &IntelConfig, cache: SharedIntelCache, cancel: CancelToken) -> Result<Self> {
        let primary = Box::new(AbstractApiProvider::new(
            config.primary_endpoint.clone(),
            config.api_key.clone(),
        ));
        let fallback = Box::new(IpapiProvider::new(config.fallback_endpoint.clone()));
        Self::with_providers(config, cache, cancel, primary, fallback)
    }

    /// Build the pipeline around caller-supplied providers.
    pub fn with_providers(
        config: &IntelConfig,
        cache: SharedIntelCache,
        cancel: CancelToken,
        primary: Box<dyn IntelProvider>,
        fallback: Box<dyn IntelProvider>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("netlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            primary,
            fallback,
            cache,
            cache_path: config.cache_path.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
            flush_interval: config.flush_interval.max(1),
            cancel,
        })
    }

    /// Enrich every address, in the order given (first-seen order from the
    /// tracker). Provider failures degrade per address and never abort the
    /// pass.
    pub async fn enrich(&self, addresses: &[Ipv4Addr]) -> EnrichmentStats {
        let start = Instant::now();
        let mut stats = EnrichmentStats {
            total: addresses.len(),
            ..Default::default()
        };
        let mut resolved_since_flush = 0usize;

        for &ip in addresses {
            if self.cancel.is_cancelled() {
                warn!("enrichment cancelled, cache holds partial results");
                break;
            }

            if classify::is_special(ip) {
                let record = if classify::is_private(ip) {
                    IntelRecord::private()
                } else if classify::is_multicast(ip) {
                    IntelRecord::multicast()
                } else {
                    IntelRecord::special()
                };
                self.cache.write().insert(ip, record);
                stats.special += 1;
                continue;
            }

            if self.cache.read().has_valid(ip) {
                debug!("cache hit for {}", ip);
                stats.cache_hits += 1;
                continue;
            }

            let record = self.resolve(ip, &mut stats).await;
            self.cache.write().insert(ip, record);

            resolved_since_flush += 1;
            if resolved_since_flush % self.flush_interval == 0 {
                self.flush();
            }

            tokio::time::sleep(self.request_delay).await;
        }

        if resolved_since_flush > 0 || stats.special > 0 {
            self.flush();
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "enrichment complete: {} addresses, {} special, {} cache hits, {} fetched ({} via fallback), {} failed in {}ms",
            stats.total,
            stats.special,
            stats.cache_hits,
            stats.fetched,
            stats.fallback_used,
            stats.failed,
            stats.duration_ms
        );
        stats
    }

    /// Primary, then fallback, then a Safe-default error record.
    async fn resolve(&self, ip: Ipv4Addr, stats: &mut EnrichmentStats) -> IntelRecord {
        match self.primary.fetch(&self.client, ip).await {
            Ok(intel) => {
                debug!("{} resolved {}", self.primary.name(), ip);
                stats.fetched += 1;
                IntelRecord::Enriched(intel)
            }
            Err(primary_err) => {
                warn!(
                    "{} failed for {}: {:#}",
                    self.primary.name(),
                    ip,
                    primary_err
                );
                match self.fallback.fetch(&self.client, ip).await {
                    Ok(intel) => {
                        debug!("{} resolved {}", self.fallback.name(), ip);
                        stats.fetched += 1;
                        stats.fallback_used += 1;
                        IntelRecord::Enriched(intel)
                    }
                    Err(fallback_err) => {
                        warn!(
                            "{} failed for {}: {:#}",
                            self.fallback.name(),
                            ip,
                            fallback_err
                        );
                        stats.failed += 1;
                        IntelRecord::error(format!(
                            "all providers failed: {primary_err:#}; {fallback_err:#}"
                        ))
                    }
                }
            }
        }
    }

    /// Persist the cache. Failures are logged and never interrupt the pass.
    fn flush(&self) {
        if let Some(path) = &self.cache_path {
            if let Err(e) = self.cache.read().save_to_disk(path) {
                warn!("failed to persist intelligence cache: {:#}", e);
            }
        }
    }
}
