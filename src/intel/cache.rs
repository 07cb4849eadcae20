//! Durable intelligence cache
//!
//! Key-value store of [`IntelRecord`]s keyed by dotted-quad address,
//! persisted as a JSON file so results survive across invocations and stay
//! inspectable with ordinary tools. Entries never expire; a fresher fetch
//! overwrites in place.
//!
//! The pipeline is the only writer for a session. Consumers that want to
//! poll while it runs share the cache behind [`SharedIntelCache`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::record::IntelRecord;

/// Cache handle shared between the pipeline (writer) and consumers.
pub type SharedIntelCache = Arc<RwLock<IntelCache>>;

/// In-memory intelligence cache with JSON file persistence.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntelCache {
    records: HashMap<String, IntelRecord>,
}

impl IntelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedIntelCache {
        Arc::new(RwLock::new(self))
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<&IntelRecord> {
        self.records.get(&ip.to_string())
    }

    /// Whether the cache already holds a usable (non-error) record, i.e.
    /// no re-fetch is needed.
    pub fn has_valid(&self, ip: Ipv4Addr) -> bool {
        self.get(ip).map(|r| !r.is_error()).unwrap_or(false)
    }

    /// Insert or overwrite the record for an address. Last write wins.
    pub fn insert(&mut self, ip: Ipv4Addr, record: IntelRecord) {
        self.records.insert(ip.to_string(), record);
    }

    /// Drop a record so the next pass re-fetches it (manual refresh).
    pub fn invalidate(&mut self, ip: Ipv4Addr) {
        self.records.remove(&ip.to_string());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clone of the full record map for the final report.
    pub fn snapshot(&self) -> HashMap<String, IntelRecord> {
        self.records.clone()
    }

    /// Persist the cache as a JSON object keyed by address.
    pub fn save_to_disk(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create cache file {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)
            .with_context(|| format!("failed to write cache file {}", path.display()))?;
        info!("saved {} intelligence records to cache file", self.len());
        Ok(())
    }

    /// Load a previously saved cache.
    pub fn load_from_disk(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open cache file {}", path.display()))?;
        let reader = BufReader::new(file);
        let cache: Self = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse cache file {}", path.display()))?;
        info!("loaded {} intelligence records from cache file", cache.len());
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::record::ThreatLevel;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = IntelCache::new();
        assert!(cache.is_empty());

        cache.insert(ip("10.0.0.1"), IntelRecord::private());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(ip("10.0.0.1")).is_some());
        assert!(cache.get(ip("10.0.0.2")).is_none());
    }

    #[test]
    fn test_error_records_are_not_valid() {
        let mut cache = IntelCache::new();
        cache.insert(ip("8.8.8.8"), IntelRecord::error("unreachable"));
        assert!(!cache.has_valid(ip("8.8.8.8")));

        // An error record is overwritten by a later good fetch.
        cache.insert(ip("8.8.8.8"), IntelRecord::special());
        assert!(cache.has_valid(ip("8.8.8.8")));
        assert_eq!(
            cache.get(ip("8.8.8.8")).unwrap().threat_level(),
            ThreatLevel::Safe
        );
    }

    #[test]
    fn test_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intel-cache.json");

        let mut cache = IntelCache::new();
        cache.insert(ip("10.0.0.1"), IntelRecord::private());
        cache.insert(ip("224.0.0.1"), IntelRecord::multicast());
        cache.insert(ip("1.2.3.4"), IntelRecord::error("timed out"));
        cache.save_to_disk(&path).unwrap();

        let loaded = IntelCache::load_from_disk(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(ip("10.0.0.1")), cache.get(ip("10.0.0.1")));
        assert!(loaded.get(ip("1.2.3.4")).unwrap().is_error());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(IntelCache::load_from_disk(&path).is_err());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut cache = IntelCache::new();
        cache.insert(ip("10.0.0.1"), IntelRecord::private());

        let snapshot = cache.snapshot();
        cache.insert(ip("10.0.0.2"), IntelRecord::private());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.len(), 2);
    }
}
