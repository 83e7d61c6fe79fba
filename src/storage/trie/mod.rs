#![forbid(unsafe_code)]

//! Prefix-compressed trie held in a transaction's memory.
//!
//! Nodes live in an arena and reference children by [`NodeId`]. An edge may
//! instead (or additionally) point at a node record in the backing file; such
//! children are pulled in through a [`NodeLoader`] the first time a lookup or
//! insertion needs them and cached in the edge slot afterwards.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

mod alloc;
mod arena;
mod flush;
mod node;
mod put;
mod stats;


pub use alloc::{AllocMode, NodeAllocator, CHILD_SLOT_BYTES, NODE_HEADER_BYTES};
pub use node::{Branch, ChildSlot, Children, Leaf, Node, NodeKind, FANOUT};
pub use stats::{TrieStats, TrieStatsSnapshot};

use arena::NodeArena;

use crate::types::{DiskOffset, NodeId, RadixError, Result};

/// Materializes nodes persisted in a backing store.
pub trait NodeLoader {
    /// Reads the node record stored at `off`, including the disk offsets of
    /// its own children.
    fn read_node(&self, off: DiskOffset) -> Result<Node>;
}

/// Trie of byte keys to byte values with lazily loaded on-disk subtrees.
pub struct Trie {
    arena: NodeArena,
    alloc: NodeAllocator,
    root: ChildSlot,
    zero_meta: Vec<u8>,
    stats: Arc<TrieStats>,
}

impl Trie {
    /// Creates an empty trie.
    ///
    /// Every value written afterwards reserves `meta_size` zeroed metadata bytes.
    pub fn new(mode: AllocMode, value_align: Option<usize>, meta_size: usize) -> Result<Self> {
        let stats = Arc::new(TrieStats::default());
        Ok(Self {
            arena: NodeArena::default(),
            alloc: NodeAllocator::new(mode, value_align, Arc::clone(&stats))?,
            root: ChildSlot::Absent,
            zero_meta: vec![0; meta_size],
            stats,
        })
    }

    /// Drops every in-memory node and reroots the trie at `root`, which is
    /// loaded on first use.
    pub fn reset(&mut self, root: Option<DiskOffset>) {
        self.arena.clear();
        self.alloc.reset();
        self.root = root.map_or(ChildSlot::Absent, ChildSlot::OnDisk);
    }

    /// Current root reference.
    pub fn root(&self) -> ChildSlot {
        self.root
    }

    /// Node stored in the arena under `id`.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.arena.get(id)
    }

    /// Number of nodes held in memory.
    pub fn node_count(&self) -> usize {
        self.arena.live()
    }

    /// The node allocator.
    pub fn allocator(&self) -> &NodeAllocator {
        &self.alloc
    }

    /// Mutable access to the node allocator, e.g. for failure injection.
    pub fn allocator_mut(&mut self) -> &mut NodeAllocator {
        &mut self.alloc
    }

    /// Live statistics counters.
    pub fn stats(&self) -> Arc<TrieStats> {
        Arc::clone(&self.stats)
    }

    /// Looks up `key`, loading on-disk nodes along the path as needed.
    pub fn get(&mut self, loader: Option<&dyn NodeLoader>, key: &[u8]) -> Result<Option<&[u8]>> {
        match self.find(loader, key)? {
            Some(id) => Ok(self.arena.get(id)?.value()),
            None => Ok(None),
        }
    }

    /// Metadata bytes stored alongside the value of `key`.
    pub fn get_meta(&mut self, loader: Option<&dyn NodeLoader>, key: &[u8]) -> Result<Option<&[u8]>> {
        match self.find(loader, key)? {
            Some(id) => Ok(Some(self.arena.get(id)?.meta())),
            None => Ok(None),
        }
    }

    /// Node holding the value of `key`, if the key is present.
    fn find(&mut self, loader: Option<&dyn NodeLoader>, key: &[u8]) -> Result<Option<NodeId>> {
        let Some(mut node) = self.resolve_root(loader)? else {
            return Ok(None);
        };
        let mut sym = 0;
        loop {
            let current = self.arena.get(node)?;
            let prefix = current.prefix();
            if !key[sym..].starts_with(prefix) {
                return Ok(None);
            }
            sym += prefix.len();
            if sym == key.len() {
                return Ok(current.value().is_some().then_some(node));
            }
            let edge = key[sym];
            let slot = match current.children() {
                Some(children) => children.get(edge),
                None => return Ok(None),
            };
            match self.descend(loader, node, edge, slot)? {
                Some(child) => node = child,
                None => return Ok(None),
            }
            sym += 1;
        }
    }

    /// In-memory root, loading it first if it only exists on disk.
    fn resolve_root(&mut self, loader: Option<&dyn NodeLoader>) -> Result<Option<NodeId>> {
        match self.root {
            ChildSlot::Absent => Ok(None),
            ChildSlot::InMemory(id) | ChildSlot::Both(id, _) => Ok(Some(id)),
            ChildSlot::OnDisk(off) => {
                let id = self.load(loader, off)?;
                self.root = ChildSlot::Both(id, off);
                Ok(Some(id))
            }
        }
    }

    /// Follows `slot` of `parent`, materializing a disk-only child and
    /// caching it in the slot.
    fn descend(
        &mut self,
        loader: Option<&dyn NodeLoader>,
        parent: NodeId,
        edge: u8,
        slot: ChildSlot,
    ) -> Result<Option<NodeId>> {
        match slot {
            ChildSlot::Absent => Ok(None),
            ChildSlot::InMemory(id) | ChildSlot::Both(id, _) => Ok(Some(id)),
            ChildSlot::OnDisk(off) => {
                let id = self.load(loader, off)?;
                self.link(parent, edge, id)?;
                Ok(Some(id))
            }
        }
    }

    fn load(&mut self, loader: Option<&dyn NodeLoader>, off: DiskOffset) -> Result<NodeId> {
        let loader = loader.ok_or(RadixError::Invalid("on-disk node without a backing store"))?;
        let node = loader.read_node(off)?;
        self.alloc.adopt(&node)?;
        self.stats.inc_node_loads();
        trace!(offset = off.0, prefix_len = node.prefix().len(), leaf = node.is_leaf(), "node loaded");
        Ok(self.arena.insert(node))
    }

    /// Points edge `edge` of `parent` at `child`, keeping any disk offset.
    fn link(&mut self, parent: NodeId, edge: u8, child: NodeId) -> Result<()> {
        let children = self
            .arena
            .get_mut(parent)?
            .children_mut()
            .ok_or(RadixError::Corruption("edge on a leaf node"))?;
        let slot = children.get(edge);
        children.set(edge, slot.with_memory(child));
        Ok(())
    }
}

impl fmt::Debug for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.root.is_occupied() {
            return writeln!(f, "empty");
        }
        let mut stack: Vec<(Option<u8>, ChildSlot, usize)> = vec![(None, self.root, 0)];
        while let Some((edge, slot, depth)) = stack.pop() {
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            if let Some(edge) = edge {
                write!(f, "[{}] ", [edge].escape_ascii())?;
            }
            let Some(id) = slot.memory() else {
                writeln!(f, "@{}", slot.disk().map_or(0, |off| off.0))?;
                continue;
            };
            let Ok(node) = self.arena.get(id) else {
                writeln!(f, "<dangling {id}>")?;
                continue;
            };
            write!(f, "{:?} \"{}\"", node.kind(), node.prefix().escape_ascii())?;
            if let Some(value) = node.value() {
                write!(f, " = \"{}\"", value.escape_ascii())?;
            }
            if let Some(off) = slot.disk() {
                write!(f, " @{}", off.0)?;
            }
            writeln!(f)?;
            if let Some(children) = node.children() {
                let mut edges: Vec<_> = children.occupied().collect();
                edges.reverse();
                for (child_edge, child) in edges {
                    stack.push((Some(child_edge), child, depth + 1));
                }
            }
        }
        Ok(())
    }
}
