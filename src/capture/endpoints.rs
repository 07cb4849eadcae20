//! Endpoint traffic index
//!
//! Builds the per-IP view of the capture: every address seen as source or
//! destination of a parsed IPv4 packet gets a traffic log with its incoming
//! and outgoing packets in observation order. The tracker also remembers
//! the order addresses were first seen, which the enrichment pipeline
//! iterates later.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::block::PacketInfo;

/// One packet observed for a given endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub protocol: String,
    /// The other endpoint: destination for outgoing, source for incoming.
    pub peer: Ipv4Addr,
}

/// Directional traffic log for one endpoint. Append-only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrafficLog {
    pub incoming: Vec<TrafficEntry>,
    pub outgoing: Vec<TrafficEntry>,
}

/// Per-IP traffic index over a decode pass.
#[derive(Debug, Default)]
pub struct EndpointTracker {
    index: HashMap<Ipv4Addr, TrafficLog>,
    discovery: Vec<Ipv4Addr>,
}

impl EndpointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one packet block. No-op unless it carries a cleanly parsed
    /// IPv4 header. O(1) amortized.
    pub fn track(&mut self, packet: &PacketInfo) {
        let Some(ipv4) = packet.parsed_ipv4() else {
            return;
        };
        let (src, dst) = (ipv4.source, ipv4.destination);
        let protocol = ipv4.protocol_name.clone();

        self.log_mut(src).outgoing.push(TrafficEntry {
            timestamp: packet.timestamp,
            protocol: protocol.clone(),
            peer: dst,
        });
        self.log_mut(dst).incoming.push(TrafficEntry {
            timestamp: packet.timestamp,
            protocol,
            peer: src,
        });
    }

    fn log_mut(&mut self, ip: Ipv4Addr) -> &mut TrafficLog {
        let discovery = &mut self.discovery;
        self.index.entry(ip).or_insert_with(|| {
            discovery.push(ip);
            TrafficLog::default()
        })
    }

    /// Unique addresses in the order they were first seen.
    pub fn addresses(&self) -> &[Ipv4Addr] {
        &self.discovery
    }

    pub fn unique_count(&self) -> usize {
        self.discovery.len()
    }

    pub fn log(&self, ip: Ipv4Addr) -> Option<&TrafficLog> {
        self.index.get(&ip)
    }

    /// Consume the tracker, keeping only the index for the final report.
    pub fn into_index(self) -> HashMap<Ipv4Addr, TrafficLog> {
        self.index
    }
}
