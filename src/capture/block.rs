//! Decoded block model
//!
//! Typed representation of the PCAP-NG blocks the decoder understands, plus
//! the Ethernet/IPv4 summaries extracted from packet payloads. Malformed
//! sub-fields are carried as explicit error markers rather than failing the
//! block, so a capture with a few damaged frames still decodes end to end.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Block type codes from the PCAP-NG specification.
pub mod block_type {
    pub const SECTION_HEADER: u32 = 0x0a0d_0d0a;
    pub const INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
    pub const SIMPLE_PACKET: u32 = 0x0000_0003;
    pub const NAME_RESOLUTION: u32 = 0x0000_0004;
    pub const INTERFACE_STATISTICS: u32 = 0x0000_0005;
    pub const ENHANCED_PACKET: u32 = 0x0000_0006;
}

/// EtherType of IPv4 payloads, the only one we descend into.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// One decoded unit of the capture file.
///
/// Created once per decode pass and never mutated afterwards. `offset` is
/// strictly increasing across the block sequence of a single pass.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    /// Byte position in the source buffer.
    pub offset: usize,
    /// Raw block type code.
    pub type_code: u32,
    /// Declared block length, including both length fields.
    pub total_length: u32,
    /// Parsed payload for the block types we understand.
    pub kind: BlockKind,
    /// Value of the trailing length field when it disagrees with the
    /// declared length. Corruption signal only; the block is still usable.
    pub trailer_mismatch: Option<u32>,
    /// Set when a known block type could not be fully parsed. The block
    /// keeps its type name but carries no typed payload.
    pub parse_error: Option<String>,
}

impl Block {
    /// Human-readable block type name, e.g. for the summary histogram.
    pub fn type_name(&self) -> String {
        block_type_name(self.type_code)
    }

    /// Packet payload for enhanced/simple packet blocks.
    pub fn packet(&self) -> Option<&PacketInfo> {
        match &self.kind {
            BlockKind::EnhancedPacket(p) | BlockKind::SimplePacket(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_packet(&self) -> bool {
        self.packet().is_some()
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, BlockKind::InterfaceDescription(_))
    }
}

/// Typed payload per block type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    SectionHeader(SectionHeaderInfo),
    InterfaceDescription(InterfaceInfo),
    EnhancedPacket(PacketInfo),
    SimplePacket(PacketInfo),
    /// Anything we do not interpret, with a short raw preview for
    /// diagnostics. Vendor option blocks land here.
    Unknown { preview: Vec<u8> },
}

/// Section byte order as declared by the section header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Section Header Block fields.
#[derive(Debug, Clone, Serialize)]
pub struct SectionHeaderInfo {
    pub byte_order: ByteOrder,
    pub major_version: u16,
    pub minor_version: u16,
    pub section_length: u32,
}

/// Interface Description Block fields.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    pub link_type: u16,
    pub link_type_name: String,
    pub snap_len: u32,
}

/// Fields shared by enhanced and simple packet blocks.
///
/// Simple packets carry no interface id or timestamp; both are `None`
/// there. `ethernet`/`ipv4` are present only when the captured data was
/// long enough to attempt the respective parse.
#[derive(Debug, Clone, Serialize)]
pub struct PacketInfo {
    pub interface_id: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub captured_length: u32,
    pub original_length: u32,
    pub ethernet: Option<FieldOutcome<EthernetSummary>>,
    pub ipv4: Option<FieldOutcome<Ipv4Summary>>,
}

impl PacketInfo {
    /// The IPv4 summary, if the frame carried one and it parsed cleanly.
    pub fn parsed_ipv4(&self) -> Option<&Ipv4Summary> {
        self.ipv4.as_ref().and_then(FieldOutcome::ok)
    }
}

/// A sub-field that either parsed or carries the reason it did not.
///
/// Parse failures inside a block never propagate; they are recorded here
/// and decoding continues with the next block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome<T> {
    Parsed(T),
    Error { message: String },
}

impl<T> FieldOutcome<T> {
    pub fn error(message: impl Into<String>) -> Self {
        FieldOutcome::Error {
            message: message.into(),
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            FieldOutcome::Parsed(v) => Some(v),
            FieldOutcome::Error { .. } => None,
        }
    }

    pub fn err(&self) -> Option<&str> {
        match self {
            FieldOutcome::Parsed(_) => None,
            FieldOutcome::Error { message } => Some(message),
        }
    }
}

/// Ethernet frame summary. Only the EtherType matters downstream.
#[derive(Debug, Clone, Serialize)]
pub struct EthernetSummary {
    pub ether_type: u16,
    pub ether_type_name: String,
}

/// Extracted IPv4 header fields.
#[derive(Debug, Clone, Serialize)]
pub struct Ipv4Summary {
    pub version: u8,
    pub protocol: u8,
    pub protocol_name: String,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

/// Display name for a block type code.
pub fn block_type_name(code: u32) -> String {
    match code {
        block_type::SECTION_HEADER => "Section Header Block".to_string(),
        block_type::INTERFACE_DESCRIPTION => "Interface Description Block".to_string(),
        block_type::SIMPLE_PACKET => "Simple Packet Block".to_string(),
        block_type::NAME_RESOLUTION => "Name Resolution Block".to_string(),
        block_type::INTERFACE_STATISTICS => "Interface Statistics Block".to_string(),
        block_type::ENHANCED_PACKET => "Enhanced Packet Block".to_string(),
        other => format!("Unknown Block ({:#010x})", other),
    }
}

/// Display name for a link-layer type.
pub fn link_type_name(link_type: u16) -> String {
    match link_type {
        1 => "Ethernet".to_string(),
        6 => "IEEE 802.5 Token Ring".to_string(),
        105 => "IEEE 802.11 Wireless".to_string(),
        127 => "IEEE 802.11 Radiotap".to_string(),
        other => format!("Unknown ({})", other),
    }
}

/// Display name for an EtherType.
pub fn ether_type_name(ether_type: u16) -> String {
    match ether_type {
        0x0800 => "IPv4".to_string(),
        0x0806 => "ARP".to_string(),
        0x86dd => "IPv6".to_string(),
        0x8100 => "802.1Q VLAN".to_string(),
        other => format!("Unknown ({:#06x})", other),
    }
}

/// Display name for an IP protocol number.
pub fn protocol_name(protocol: u8) -> String {
    match protocol {
        1 => "ICMP".to_string(),
        2 => "IGMP".to_string(),
        4 => "IP-in-IP".to_string(),
        6 => "TCP".to_string(),
        17 => "UDP".to_string(),
        41 => "IPv6".to_string(),
        47 => "GRE".to_string(),
        50 => "ESP".to_string(),
        51 => "AH".to_string(),
        89 => "OSPF".to_string(),
        other => format!("Unknown ({})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_names() {
        assert_eq!(
            block_type_name(block_type::SECTION_HEADER),
            "Section Header Block"
        );
        assert_eq!(
            block_type_name(block_type::ENHANCED_PACKET),
            "Enhanced Packet Block"
        );
        assert_eq!(
            block_type_name(block_type::NAME_RESOLUTION),
            "Name Resolution Block"
        );
        assert_eq!(block_type_name(0xdeadbeef), "Unknown Block (0xdeadbeef)");
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(protocol_name(6), "TCP");
        assert_eq!(protocol_name(17), "UDP");
        assert_eq!(protocol_name(1), "ICMP");
        assert_eq!(protocol_name(99), "Unknown (99)");
    }

    #[test]
    fn test_field_outcome_accessors() {
        let ok: FieldOutcome<u32> = FieldOutcome::Parsed(7);
        assert_eq!(ok.ok(), Some(&7));
        assert!(ok.err().is_none());

        let err: FieldOutcome<u32> = FieldOutcome::error("short read");
        assert!(err.ok().is_none());
        assert_eq!(err.err(), Some("short read"));
    }
}
