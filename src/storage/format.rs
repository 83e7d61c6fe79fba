//! On-disk layout of node records and commit footers.
//!
//! Records are appended by each commit, children before parents, followed by
//! a footer naming the new root:
//!
//! ```text
//! record: body_len u32 | crc32(body) u32 | body
//! body:   kind u8 | child_count u16 | prefix_len u32 | val_len u32 | meta_len u32
//!         | prefix | value | meta | child_count x (edge u8, offset u64)
//! footer: "RKVF" | version u16 | reserved u16 | root u64 | previous u64 | crc32 u32
//! ```
//!
//! All integers are little endian.

use crate::storage::trie::{Children, ChildSlot, Node, NodeKind, FANOUT};
use crate::types::checksum::{footer_crc32, record_crc32};
use crate::types::{DiskOffset, RadixError, Result};

/// Length of the `body_len | crc` record prefix.
pub const RECORD_HEADER_LEN: usize = 8;
/// Length of the fixed part of a record body.
pub const BODY_FIXED_LEN: usize = 15;
/// Length of one encoded child entry.
pub const CHILD_ENTRY_LEN: usize = 9;
/// Length of a commit footer.
pub const FOOTER_LEN: usize = 28;
/// Magic bytes opening every footer.
pub const FOOTER_MAGIC: [u8; 4] = *b"RKVF";
/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| RadixError::Invalid("node field longer than u32::MAX"))
}

/// Appends the record for `node` to `dst`, with `edges` giving the disk
/// offset of every child in increasing edge order.
pub fn encode_node(node: &Node, edges: &[(u8, DiskOffset)], dst: &mut Vec<u8>) -> Result<()> {
    if node.is_leaf() && !edges.is_empty() {
        return Err(RadixError::Invalid("leaf node with children"));
    }
    let prefix = node.prefix();
    let value = node.value().unwrap_or_default();
    let meta = node.meta();
    let body_len = BODY_FIXED_LEN + prefix.len() + value.len() + meta.len() + edges.len() * CHILD_ENTRY_LEN;

    let start = dst.len();
    dst.reserve(RECORD_HEADER_LEN + body_len);
    dst.extend_from_slice(&len_u32(body_len)?.to_le_bytes());
    dst.extend_from_slice(&[0u8; 4]);
    let body_start = dst.len();
    dst.push(node.kind().bits());
    dst.extend_from_slice(&(edges.len() as u16).to_le_bytes());
    dst.extend_from_slice(&len_u32(prefix.len())?.to_le_bytes());
    dst.extend_from_slice(&len_u32(value.len())?.to_le_bytes());
    dst.extend_from_slice(&len_u32(meta.len())?.to_le_bytes());
    dst.extend_from_slice(prefix);
    dst.extend_from_slice(value);
    dst.extend_from_slice(meta);
    for (edge, off) in edges {
        dst.push(*edge);
        dst.extend_from_slice(&off.0.to_le_bytes());
    }
    let crc = record_crc32(&dst[body_start..]);
    dst[start + 4..start + 8].copy_from_slice(&crc.to_le_bytes());
    Ok(())
}

/// Splits a record header into `(body_len, crc)`.
pub fn decode_record_header(header: &[u8; RECORD_HEADER_LEN]) -> (usize, u32) {
    let body_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (body_len as usize, crc)
}

/// Cursor over a record body that fails on truncation.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(RadixError::Corruption("truncated node record"));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<usize> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }
}

/// Decodes a record body whose checksum has been verified.
///
/// Children come back as [`ChildSlot::OnDisk`].
pub fn decode_node_body(body: &[u8]) -> Result<Node> {
    let mut reader = Reader { bytes: body };
    let kind = NodeKind::from_bits(reader.u8()?)?;
    let child_count = reader.u16()? as usize;
    let prefix_len = reader.u32()?;
    let val_len = reader.u32()?;
    let meta_len = reader.u32()?;
    if child_count > FANOUT {
        return Err(RadixError::Corruption("child count exceeds fanout"));
    }
    let has_value = kind.contains(NodeKind::HAS_VALUE);
    if !has_value && val_len != 0 {
        return Err(RadixError::Corruption("value bytes on a node without value"));
    }
    let prefix = reader.take(prefix_len)?.to_vec();
    let value = reader.take(val_len)?.to_vec();
    let meta = reader.take(meta_len)?.to_vec();

    if kind.contains(NodeKind::IS_LEAF) {
        if child_count != 0 {
            return Err(RadixError::Corruption("leaf record with children"));
        }
        if !reader.bytes.is_empty() {
            return Err(RadixError::Corruption("trailing bytes in node record"));
        }
        return Ok(Node::leaf(prefix, value, meta));
    }

    let mut children = Children::new();
    let mut last_edge: Option<u8> = None;
    for _ in 0..child_count {
        let edge = reader.u8()?;
        let off = reader.u64()?;
        if last_edge.is_some_and(|last| edge <= last) {
            return Err(RadixError::Corruption("child edges out of order"));
        }
        last_edge = Some(edge);
        children.set(edge, ChildSlot::OnDisk(DiskOffset(off)));
    }
    if !reader.bytes.is_empty() {
        return Err(RadixError::Corruption("trailing bytes in node record"));
    }
    Ok(Node::branch(prefix, has_value.then_some(value), meta, children))
}

/// Verifies `crc` against `body` and decodes it.
pub fn decode_node(body: &[u8], crc: u32) -> Result<Node> {
    if record_crc32(body) != crc {
        return Err(RadixError::Corruption("node record checksum mismatch"));
    }
    decode_node_body(body)
}

/// Trailer written after the records of each commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Footer {
    /// Record offset of the trie root.
    pub root: DiskOffset,
    /// Offset of the previous commit's footer, if any.
    pub previous: Option<DiskOffset>,
}

impl Footer {
    /// Encodes the footer for placement at `footer_off`.
    pub fn encode(&self, footer_off: u64) -> [u8; FOOTER_LEN] {
        let mut out = [0u8; FOOTER_LEN];
        out[0..4].copy_from_slice(&FOOTER_MAGIC);
        out[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        out[8..16].copy_from_slice(&self.root.0.to_le_bytes());
        out[16..24].copy_from_slice(&self.previous.map_or(0, |off| off.0).to_le_bytes());
        let crc = footer_crc32(footer_off, &out[..24]);
        out[24..28].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decodes and validates a footer read from `footer_off`.
    pub fn decode(bytes: &[u8; FOOTER_LEN], footer_off: u64) -> Result<Self> {
        if bytes[0..4] != FOOTER_MAGIC {
            return Err(RadixError::Corruption("footer magic mismatch"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(RadixError::Corruption("unsupported format version"));
        }
        let crc = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        if footer_crc32(footer_off, &bytes[..24]) != crc {
            return Err(RadixError::Corruption("footer checksum mismatch"));
        }
        let mut reader = Reader { bytes: &bytes[8..24] };
        let root = reader.u64()?;
        let previous = reader.u64()?;
        if root >= footer_off {
            return Err(RadixError::Corruption("footer root beyond footer"));
        }
        Ok(Self {
            root: DiskOffset(root),
            previous: (previous != 0).then_some(DiskOffset(previous)),
        })
    }
}
