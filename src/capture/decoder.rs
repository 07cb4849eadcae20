//! Streaming PCAP-NG block decoder
//!
//! Walks an in-memory capture buffer block by block, dispatching on the
//! block type and extracting Ethernet/IPv4 summaries from packet payloads.
//! Structural damage (bad magic, impossible block lengths) is fatal because
//! the stream cannot be resynchronized; damage inside a block is recorded
//! on that block and decoding continues.
//!
//! The decoder yields to the runtime every `yield_interval` blocks so a
//! large capture does not monopolize the executor, and checks its cancel
//! token at the same point.

use thiserror::Error;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::config::DecoderConfig;

use super::block::{
    block_type, ether_type_name, link_type_name, protocol_name, Block, BlockKind, ByteOrder,
    EthernetSummary, FieldOutcome, InterfaceInfo, Ipv4Summary, PacketInfo, SectionHeaderInfo,
    ETHERTYPE_IPV4,
};

/// PCAP-NG magic, little-endian, doubling as the section header type code.
const PCAPNG_MAGIC: u32 = 0x0a0d_0d0a;

/// Byte-order magic inside a section header.
const SECTION_BYTE_ORDER_LE: u32 = 0x1a2b_3c4d;

/// Smallest possible block: type + length + trailing length.
const MIN_BLOCK_LEN: u32 = 12;

/// Raw bytes kept from blocks we do not interpret.
const UNKNOWN_PREVIEW_LEN: usize = 100;

/// Fatal decode failures. Anything else is carried as data on the blocks.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file too small to be a PCAP-NG capture ({len} bytes)")]
    TooSmall { len: usize },

    #[error("not a PCAP-NG capture: bad magic {found:#010x}")]
    BadMagic { found: u32 },

    #[error("invalid block length {length} at offset {offset}")]
    InvalidBlockLength { offset: usize, length: u32 },

    #[error("block at offset {offset} extends beyond end of capture")]
    Truncated { offset: usize },

    #[error("decode cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Progress callback: (current offset, total size, blocks decoded so far).
pub type ProgressFn = dyn Fn(usize, usize, usize) + Send + Sync;

/// Block decoder over an immutable byte buffer.
///
/// Each call to [`decode`](Self::decode) starts from offset 0; the decoder
/// holds no per-pass state and can be reused across buffers.
pub struct BlockDecoder {
    max_block_len: u32,
    yield_interval: usize,
    on_progress: Option<Box<ProgressFn>>,
    cancel: CancelToken,
}

impl BlockDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            max_block_len: config.max_block_len,
            yield_interval: config.yield_interval.max(1),
            on_progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Install a progress callback, invoked once per block.
    pub fn with_progress(mut self, progress: Box<ProgressFn>) -> Self {
        self.on_progress = Some(progress);
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Decode the full buffer into a block sequence.
    ///
    /// Returns every block in file order. Blocks with damaged sub-fields
    /// carry error markers; only structural damage aborts the pass.
    pub async fn decode(&self, data: &[u8]) -> Result<Vec<Block>> {
        if data.len() < MIN_BLOCK_LEN as usize {
            return Err(Error::TooSmall { len: data.len() });
        }

        let magic = read_u32_le(data, 0);
        if magic != PCAPNG_MAGIC {
            return Err(Error::BadMagic { found: magic });
        }

        let total = data.len();
        let mut blocks = Vec::new();
        let mut offset = 0usize;

        while offset < total {
            if total - offset < MIN_BLOCK_LEN as usize {
                warn!(
                    "ignoring {} trailing bytes at offset {}",
                    total - offset,
                    offset
                );
                break;
            }

            if let Some(progress) = &self.on_progress {
                progress(offset, total, blocks.len());
            }

            let type_code = read_u32_le(data, offset);
            let declared = read_u32_le(data, offset + 4);

            if declared < MIN_BLOCK_LEN || declared > self.max_block_len {
                return Err(Error::InvalidBlockLength {
                    offset,
                    length: declared,
                });
            }
            let len = declared as usize;
            if offset + len > total {
                return Err(Error::Truncated { offset });
            }

            let body = &data[offset..offset + len];
            let (kind, parse_error) = decode_body(type_code, body);

            let trailer = read_u32_le(data, offset + len - 4);
            let trailer_mismatch = if trailer != declared {
                warn!(
                    "block at offset {} declares length {} but trails with {}",
                    offset, declared, trailer
                );
                Some(trailer)
            } else {
                None
            };

            blocks.push(Block {
                offset,
                type_code,
                total_length: declared,
                kind,
                trailer_mismatch,
                parse_error,
            });
            offset += len;

            if blocks.len() % self.yield_interval == 0 {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                tokio::task::yield_now().await;
            }
        }

        if let Some(progress) = &self.on_progress {
            progress(offset, total, blocks.len());
        }

        Ok(blocks)
    }
}

/// Dispatch on the block type. A known type that fails its fixed-field
/// parse degrades to an unknown-style preview plus an error note; the
/// block keeps its type name for the histogram.
fn decode_body(type_code: u32, body: &[u8]) -> (BlockKind, Option<String>) {
    let result = match type_code {
        block_type::SECTION_HEADER => parse_section_header(body).map(BlockKind::SectionHeader),
        block_type::INTERFACE_DESCRIPTION => {
            parse_interface_description(body).map(BlockKind::InterfaceDescription)
        }
        block_type::ENHANCED_PACKET => parse_enhanced_packet(body).map(BlockKind::EnhancedPacket),
        block_type::SIMPLE_PACKET => parse_simple_packet(body).map(BlockKind::SimplePacket),
        _ => Ok(BlockKind::Unknown {
            preview: unknown_preview(body),
        }),
    };

    match result {
        Ok(kind) => (kind, None),
        Err(message) => (
            BlockKind::Unknown {
                preview: unknown_preview(body),
            },
            Some(message),
        ),
    }
}

fn unknown_preview(body: &[u8]) -> Vec<u8> {
    let available = body.len().saturating_sub(12);
    let take = available.min(UNKNOWN_PREVIEW_LEN);
    body[8..8 + take].to_vec()
}

fn parse_section_header(body: &[u8]) -> std::result::Result<SectionHeaderInfo, String> {
    if body.len() < 20 {
        return Err("section header block too short".to_string());
    }
    let byte_order = if read_u32_le(body, 8) == SECTION_BYTE_ORDER_LE {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };
    Ok(SectionHeaderInfo {
        byte_order,
        major_version: read_u16_le(body, 12),
        minor_version: read_u16_le(body, 14),
        section_length: read_u32_le(body, 16),
    })
}

fn parse_interface_description(body: &[u8]) -> std::result::Result<InterfaceInfo, String> {
    if body.len() < 16 {
        return Err("interface description block too short".to_string());
    }
    let link_type = read_u16_le(body, 8);
    Ok(InterfaceInfo {
        link_type,
        link_type_name: link_type_name(link_type),
        snap_len: read_u32_le(body, 12),
    })
}

fn parse_enhanced_packet(body: &[u8]) -> std::result::Result<PacketInfo, String> {
    if body.len() < 32 {
        return Err("enhanced packet block too short".to_string());
    }
    let interface_id = read_u32_le(body, 8);
    let ts_high = read_u32_le(body, 12);
    let ts_low = read_u32_le(body, 16);
    let captured_length = read_u32_le(body, 20);
    let original_length = read_u32_le(body, 24);

    // 64-bit timestamp split across two words, microseconds since epoch.
    let micros = ((ts_high as u64) << 32) | ts_low as u64;
    let timestamp = chrono::DateTime::from_timestamp_micros(micros as i64);

    let mut info = PacketInfo {
        interface_id: Some(interface_id),
        timestamp,
        captured_length,
        original_length,
        ethernet: None,
        ipv4: None,
    };
    parse_frame(&mut info, frame_window(body, 28, captured_length));
    Ok(info)
}

fn parse_simple_packet(body: &[u8]) -> std::result::Result<PacketInfo, String> {
    if body.len() < 16 {
        return Err("simple packet block too short".to_string());
    }
    let original_length = read_u32_le(body, 8);

    let window = frame_window(body, 12, original_length);
    let mut info = PacketInfo {
        interface_id: None,
        timestamp: None,
        captured_length: window.len() as u32,
        original_length,
        ethernet: None,
        ipv4: None,
    };
    parse_frame(&mut info, window);
    Ok(info)
}

/// Packet data region of a block body: from `start` to the trailing length
/// field, further capped by the declared capture length. Sub-parsers only
/// ever see this window, so they can never read past the block boundary.
fn frame_window(body: &[u8], start: usize, declared_len: u32) -> &[u8] {
    let end = body.len().saturating_sub(4);
    if start >= end {
        return &[];
    }
    let window = &body[start..end];
    let cap = (declared_len as usize).min(window.len());
    &window[..cap]
}

/// Parse the Ethernet header and, for IPv4 frames, the IPv4 header behind
/// it. Failures become error markers on the packet, never hard errors.
fn parse_frame(info: &mut PacketInfo, frame: &[u8]) {
    if frame.len() < 14 {
        return;
    }

    let ethernet = match etherparse::Ethernet2HeaderSlice::from_slice(frame) {
        Ok(eth) => EthernetSummary {
            ether_type: eth.ether_type().0,
            ether_type_name: ether_type_name(eth.ether_type().0),
        },
        Err(e) => {
            info.ethernet = Some(FieldOutcome::error(format!(
                "failed to parse Ethernet header: {e}"
            )));
            return;
        }
    };

    let is_ipv4 = ethernet.ether_type == ETHERTYPE_IPV4;
    info.ethernet = Some(FieldOutcome::Parsed(ethernet));

    if is_ipv4 {
        info.ipv4 = Some(parse_ipv4(&frame[14..]));
    }
}

fn parse_ipv4(data: &[u8]) -> FieldOutcome<Ipv4Summary> {
    match etherparse::Ipv4HeaderSlice::from_slice(data) {
        Ok(ip) => {
            let protocol = ip.protocol().0;
            FieldOutcome::Parsed(Ipv4Summary {
                version: 4,
                protocol,
                protocol_name: protocol_name(protocol),
                source: ip.source_addr(),
                destination: ip.destination_addr(),
            })
        }
        Err(e) => FieldOutcome::error(format!("failed to parse IPv4 header: {e}")),
    }
}

fn read_u32_le(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u16_le(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}
