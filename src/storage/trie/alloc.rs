//! Node allocation with byte accounting.
//!
//! Nodes live on the Rust heap; the allocator tracks the bytes an equivalent
//! packed node layout would occupy so that limits, fixed arenas and
//! allocation failures behave like a real memory budget.

use std::mem;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

use super::arena::NodeArena;
use super::node::{Children, Node, NodeKind, FANOUT};
use super::stats::TrieStats;
use crate::types::{NodeId, RadixError, Result};

/// Fixed per-node header: kind, prefix, value and metadata lengths.
pub const NODE_HEADER_BYTES: usize = 16;
/// In-memory reference plus disk offset for one edge.
pub const CHILD_SLOT_BYTES: usize = 16;

/// How node storage is obtained and reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocMode {
    /// Each node is allocated and freed individually.
    Dynamic {
        /// Upper bound on live node bytes, unbounded when `None`.
        limit: Option<usize>,
    },
    /// Nodes are carved from a fixed budget and only reclaimed all at once.
    Fixed {
        /// Size of the budget in bytes.
        capacity: usize,
    },
}

impl Default for AllocMode {
    fn default() -> Self {
        AllocMode::Dynamic { limit: None }
    }
}

/// Produces nodes and accounts for their storage.
#[derive(Debug)]
pub struct NodeAllocator {
    mode: AllocMode,
    value_align: Option<usize>,
    used: usize,
    fail_countdown: Option<u64>,
    stats: Arc<TrieStats>,
}

fn align_up(offset: usize, align: Option<usize>) -> usize {
    match align {
        Some(a) if a > 1 => (offset + a - 1) & !(a - 1),
        _ => offset,
    }
}

impl NodeAllocator {
    /// Creates an allocator; `value_align` must be a power of two when set.
    pub fn new(mode: AllocMode, value_align: Option<usize>, stats: Arc<TrieStats>) -> Result<Self> {
        if let Some(align) = value_align {
            if !align.is_power_of_two() {
                return Err(RadixError::Invalid("value alignment must be a power of two"));
            }
        }
        Ok(Self {
            mode,
            value_align,
            used: 0,
            fail_countdown: None,
            stats,
        })
    }

    /// Allocation mode in effect.
    pub fn mode(&self) -> AllocMode {
        self.mode
    }

    /// Returns true if superseded nodes are released individually.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.mode, AllocMode::Dynamic { .. })
    }

    /// Bytes currently accounted to nodes.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Makes the `nth` allocation from now fail with [`RadixError::OutOfMemory`].
    ///
    /// Counting starts at one. The failure fires once.
    pub fn fail_nth_allocation(&mut self, nth: u64) {
        self.fail_countdown = Some(nth.max(1));
    }

    /// Bytes a node with the given shape occupies.
    ///
    /// Value and metadata start on `value_align` boundaries when alignment
    /// is configured; branches carry the full edge table.
    pub fn footprint(&self, kind: NodeKind, prefix_len: usize, val_len: usize, meta_len: usize) -> usize {
        let mut size = NODE_HEADER_BYTES + prefix_len;
        if kind.contains(NodeKind::HAS_VALUE) {
            size = align_up(size, self.value_align) + val_len;
        }
        size = align_up(size, self.value_align) + meta_len;
        if !kind.contains(NodeKind::IS_LEAF) {
            size += FANOUT * CHILD_SLOT_BYTES;
        }
        size
    }

    fn footprint_of(&self, node: &Node) -> usize {
        self.footprint(
            node.kind(),
            node.prefix().len(),
            node.value().map_or(0, <[u8]>::len),
            node.meta().len(),
        )
    }

    fn reserve(&mut self, bytes: usize) -> Result<()> {
        if let Some(remaining) = self.fail_countdown {
            if remaining <= 1 {
                self.fail_countdown = None;
                return Err(self.fail(bytes));
            }
            self.fail_countdown = Some(remaining - 1);
        }
        let budget = match self.mode {
            AllocMode::Dynamic { limit } => limit,
            AllocMode::Fixed { capacity } => Some(capacity),
        };
        let next = self.used.checked_add(bytes).ok_or(RadixError::OutOfMemory)?;
        if budget.is_some_and(|cap| next > cap) {
            return Err(self.fail(bytes));
        }
        self.used = next;
        self.stats.inc_node_allocs();
        Ok(())
    }

    fn fail(&self, bytes: usize) -> RadixError {
        self.stats.inc_alloc_failures();
        warn!(requested = bytes, used = self.used, mode = ?self.mode, "node allocation failed");
        RadixError::OutOfMemory
    }

    /// Allocates a node of `kind` holding copies of `prefix`, `value` and `meta`.
    ///
    /// `value` is ignored unless `kind` has [`NodeKind::HAS_VALUE`]. Branches
    /// start with an empty edge table.
    pub fn new_node(&mut self, kind: NodeKind, prefix: &[u8], value: &[u8], meta: &[u8]) -> Result<Node> {
        let has_value = kind.contains(NodeKind::HAS_VALUE);
        let is_leaf = kind.contains(NodeKind::IS_LEAF);
        if is_leaf && !has_value {
            return Err(RadixError::Invalid("leaf node without value"));
        }
        let val_len = if has_value { value.len() } else { 0 };
        self.reserve(self.footprint(kind, prefix.len(), val_len, meta.len()))?;
        let node = if is_leaf {
            Node::leaf(prefix.to_vec(), value.to_vec(), meta.to_vec())
        } else {
            Node::branch(
                prefix.to_vec(),
                has_value.then(|| value.to_vec()),
                meta.to_vec(),
                Children::new(),
            )
        };
        Ok(node)
    }

    /// Charges a node produced outside the allocator, such as a loaded one.
    pub fn adopt(&mut self, node: &Node) -> Result<()> {
        self.reserve(self.footprint_of(node))
    }

    /// Returns a node's bytes to a dynamic allocator; fixed budgets keep them.
    pub fn free_node(&mut self, node: &Node) {
        if self.is_dynamic() {
            self.used = self.used.saturating_sub(self.footprint_of(node));
            self.stats.inc_node_frees();
        }
    }

    /// Reclaims everything at once, as after a commit or rollback.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

/// Nodes allocated for one structural change, not yet part of the trie.
///
/// Dropping the batch without [`SplitBatch::install`] releases every node it
/// holds, so a failure midway through a split leaves no allocation behind in
/// dynamic mode. A fixed budget keeps the bytes until it is reset.
pub(crate) struct SplitBatch<'a> {
    alloc: &'a mut NodeAllocator,
    nodes: SmallVec<[Node; 3]>,
}

impl<'a> SplitBatch<'a> {
    pub(crate) fn new(alloc: &'a mut NodeAllocator) -> Self {
        Self {
            alloc,
            nodes: SmallVec::new(),
        }
    }

    /// Allocates a node into the batch and returns its position.
    pub(crate) fn alloc(&mut self, kind: NodeKind, prefix: &[u8], value: &[u8], meta: &[u8]) -> Result<usize> {
        let node = self.alloc.new_node(kind, prefix, value, meta)?;
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    /// Moves every node into `arena`, returning ids in allocation order.
    pub(crate) fn install(mut self, arena: &mut NodeArena) -> SmallVec<[NodeId; 3]> {
        mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| arena.insert(node))
            .collect()
    }
}

impl Drop for SplitBatch<'_> {
    fn drop(&mut self) {
        for node in self.nodes.drain(..) {
            self.alloc.free_node(&node);
        }
    }
}
