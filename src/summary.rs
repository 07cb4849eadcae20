//! Capture summary
//!
//! Pure derivation of headline counts from the final decode state. Empty
//! input yields an all-zero summary.

use std::collections::HashMap;

use serde::Serialize;

use crate::capture::Block;

/// Headline metrics for one decoded capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureSummary {
    pub total_blocks: usize,
    pub total_packets: usize,
    pub total_interfaces: usize,
    pub unique_ips: usize,
    /// Block type display name to occurrence count.
    pub block_counts: HashMap<String, usize>,
    /// Sum of all declared block lengths.
    pub file_size: u64,
}

/// Derive the summary from the decoded block sequence.
pub fn summarize(blocks: &[Block], unique_ips: usize) -> CaptureSummary {
    let mut summary = CaptureSummary {
        total_blocks: blocks.len(),
        unique_ips,
        ..Default::default()
    };

    for block in blocks {
        if block.is_packet() {
            summary.total_packets += 1;
        }
        if block.is_interface() {
            summary.total_interfaces += 1;
        }
        *summary.block_counts.entry(block.type_name()).or_insert(0) += 1;
        summary.file_size += block.total_length as u64;
    }

    summary
}
