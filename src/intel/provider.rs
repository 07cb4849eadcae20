//! Intelligence provider abstraction
//!
//! A provider resolves one address to normalized [`GeoIntel`]. The pipeline
//! drives a primary and a fallback implementation through this trait, so
//! swapping services never touches the orchestration.

use std::net::Ipv4Addr;

use async_trait::async_trait;

use super::record::GeoIntel;

/// A geolocation/threat-intelligence source queried per address.
#[async_trait]
pub trait IntelProvider: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Resolve one address. Any transport, HTTP, or decode failure is an
    /// `Err`; the pipeline decides whether to fall back or degrade.
    async fn fetch(&self, client: &reqwest::Client, ip: Ipv4Addr) -> anyhow::Result<GeoIntel>;
}

/// Placeholder string for fields a provider did not report.
pub const UNKNOWN_FIELD: &str = "Unknown";
