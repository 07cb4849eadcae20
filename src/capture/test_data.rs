//! Synthetic PCAP-NG builders shared by the capture tests.

/// Minimal valid Section Header Block (28 bytes).
pub fn section_header() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(0x0a0d_0d0au32.to_le_bytes()); // block type
    data.extend(28u32.to_le_bytes()); // block length
    data.extend(0x1a2b_3c4du32.to_le_bytes()); // byte-order magic
    data.extend(1u16.to_le_bytes()); // major version
    data.extend(0u16.to_le_bytes()); // minor version
    data.extend(u64::MAX.to_le_bytes()); // section length (unspecified)
    data.extend(28u32.to_le_bytes()); // trailing length
    data
}

/// Interface Description Block (20 bytes, no options).
pub fn interface_description(link_type: u16, snap_len: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(0x0000_0001u32.to_le_bytes());
    data.extend(20u32.to_le_bytes());
    data.extend(link_type.to_le_bytes());
    data.extend(0u16.to_le_bytes()); // reserved
    data.extend(snap_len.to_le_bytes());
    data.extend(20u32.to_le_bytes());
    data
}

/// Enhanced Packet Block for interface 0 with the given timestamp
/// (microseconds since epoch) and frame bytes.
pub fn enhanced_packet(timestamp_micros: u64, frame: &[u8]) -> Vec<u8> {
    let padded = frame.len().div_ceil(4) * 4;
    let total = (32 + padded) as u32;

    let mut data = Vec::new();
    data.extend(0x0000_0006u32.to_le_bytes());
    data.extend(total.to_le_bytes());
    data.extend(0u32.to_le_bytes()); // interface id
    data.extend(((timestamp_micros >> 32) as u32).to_le_bytes());
    data.extend((timestamp_micros as u32).to_le_bytes());
    data.extend((frame.len() as u32).to_le_bytes()); // captured length
    data.extend((frame.len() as u32).to_le_bytes()); // original length
    data.extend(frame);
    data.extend(std::iter::repeat(0u8).take(padded - frame.len()));
    data.extend(total.to_le_bytes());
    data
}

/// Simple Packet Block carrying the given frame bytes.
pub fn simple_packet(frame: &[u8]) -> Vec<u8> {
    let padded = frame.len().div_ceil(4) * 4;
    let total = (16 + padded) as u32;

    let mut data = Vec::new();
    data.extend(0x0000_0003u32.to_le_bytes());
    data.extend(total.to_le_bytes());
    data.extend((frame.len() as u32).to_le_bytes()); // original length
    data.extend(frame);
    data.extend(std::iter::repeat(0u8).take(padded - frame.len()));
    data.extend(total.to_le_bytes());
    data
}

/// Arbitrary block with an uninterpreted body.
pub fn raw_block(type_code: u32, payload: &[u8]) -> Vec<u8> {
    let padded = payload.len().div_ceil(4) * 4;
    let total = (12 + padded) as u32;

    let mut data = Vec::new();
    data.extend(type_code.to_le_bytes());
    data.extend(total.to_le_bytes());
    data.extend(payload);
    data.extend(std::iter::repeat(0u8).take(padded - payload.len()));
    data.extend(total.to_le_bytes());
    data
}

/// Ethernet II header with the given EtherType (big-endian on the wire).
pub fn ethernet_header(ether_type: u16) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]); // dst MAC
    frame.extend([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // src MAC
    frame.extend(ether_type.to_be_bytes());
    frame
}

/// Ethernet frame carrying a bare 20-byte IPv4 header.
pub fn ipv4_frame(src: [u8; 4], dst: [u8; 4], protocol: u8) -> Vec<u8> {
    let mut frame = ethernet_header(0x0800);
    frame.push(0x45); // version 4, IHL 5
    frame.push(0x00); // DSCP/ECN
    frame.extend(20u16.to_be_bytes()); // total length (header only)
    frame.extend(0u16.to_be_bytes()); // identification
    frame.extend(0u16.to_be_bytes()); // flags + fragment offset
    frame.push(64); // TTL
    frame.push(protocol);
    frame.extend(0u16.to_be_bytes()); // checksum (not validated)
    frame.extend(src);
    frame.extend(dst);
    frame
}

/// Ethernet frame with an ARP payload; never yields an IPv4 summary.
pub fn arp_frame() -> Vec<u8> {
    let mut frame = ethernet_header(0x0806);
    frame.extend([0u8; 28]);
    frame
}
