//! PCAP-NG capture decoding
//!
//! Streaming block decoder, the typed block model, and the per-endpoint
//! traffic tracker fed by decoded packet blocks.

pub mod block;
pub mod decoder;
pub mod endpoints;

#[cfg(test)]
pub mod test_data;

pub use block::{
    Block, BlockKind, EthernetSummary, FieldOutcome, InterfaceInfo, Ipv4Summary, PacketInfo,
    SectionHeaderInfo,
};
pub use decoder::{BlockDecoder, Error as DecodeError, ProgressFn};
pub use endpoints::{EndpointTracker, TrafficEntry, TrafficLog};
