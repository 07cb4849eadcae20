//! Configuration
//!
//! TOML-backed configuration for the decoder limits and the intelligence
//! pipeline. Every section and field has a default, so an empty file (or
//! no file at all) yields a working setup; the CLI applies its overrides
//! on top.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::intel::{abstract_api, ipapi};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub intel: IntelConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load from the given path, or fall back to defaults when none is set.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Limits and pacing for the block decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Upper bound on a declared block length; anything larger is treated
    /// as corruption.
    pub max_block_len: u32,
    /// Blocks decoded between cooperative yields.
    pub yield_interval: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_block_len: 1_000_000,
            yield_interval: 50,
        }
    }
}

/// Intelligence pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    /// Whether to enrich public addresses at all.
    pub enabled: bool,
    /// Primary provider endpoint (Abstract API shape).
    pub primary_endpoint: String,
    /// API key for the primary provider. Without one the primary fails
    /// immediately and every lookup goes to the fallback.
    pub api_key: Option<String>,
    /// Fallback provider endpoint (ipapi.co shape).
    pub fallback_endpoint: String,
    /// Delay between provider requests, in milliseconds.
    pub request_delay_ms: u64,
    /// HTTP timeout per request, in seconds.
    pub timeout_secs: u64,
    /// Cache file location. `None` disables persistence.
    pub cache_path: Option<PathBuf>,
    /// Records fetched between cache flushes.
    pub flush_interval: usize,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_endpoint: abstract_api::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            fallback_endpoint: ipapi::DEFAULT_ENDPOINT.to_string(),
            request_delay_ms: 100,
            timeout_secs: 30,
            cache_path: Some(PathBuf::from("ip-intel-cache.json")),
            flush_interval: 10,
        }
    }
}
