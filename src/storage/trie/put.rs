//! Insertion and update of keys.
//!
//! Walking a node's prefix against the remaining key ends in exactly one of
//! three ways:
//!
//! ```text
//! key ends:          [p][r][e][f][i][x]   prefix
//!                    [p][r][e]            key      -> split at key end
//!                    [p][r][e][f][i][x]   key      -> exact match
//! prefix ends:       [p][r][e][f][i][x][n][e][w]   -> descend, load or append
//! bytes differ:      [p][r][e][p][a][r][e]         -> three-way split
//! ```
//!
//! Structural changes allocate every replacement node in a [`SplitBatch`]
//! first and only then swap the new subtree into the parent slot, so an
//! allocation failure leaves the trie untouched.

use tracing::trace;

use super::alloc::SplitBatch;
use super::{ChildSlot, NodeKind, NodeLoader, Trie};
use crate::types::{NodeId, Result};

/// Slot that references the node being visited: the root, or an edge of its
/// parent.
type ParentEdge = Option<(NodeId, u8)>;

impl Trie {
    /// Inserts `key` or overwrites its value.
    ///
    /// `loader` materializes children that so far only exist in the backing
    /// store; it may be `None` for a purely in-memory trie.
    pub fn put(&mut self, loader: Option<&dyn NodeLoader>, key: &[u8], value: &[u8]) -> Result<()> {
        let Some(mut node) = self.resolve_root(loader)? else {
            let leaf = self.alloc.new_node(NodeKind::LEAF, key, value, &self.zero_meta)?;
            self.root = ChildSlot::InMemory(self.arena.insert(leaf));
            trace!(key_len = key.len(), "new root leaf");
            return Ok(());
        };
        let mut parent: ParentEdge = None;
        let mut sym = 0;
        loop {
            let current = self.arena.get(node)?;
            let prefix = current.prefix();
            let pi = prefix
                .iter()
                .zip(&key[sym..])
                .take_while(|(a, b)| a == b)
                .count();
            let prefix_len = prefix.len();
            sym += pi;

            if sym == key.len() {
                if pi == prefix_len {
                    return self.update_value(parent, node, value);
                }
                return self.split_at_key_end(parent, node, pi, value);
            }

            if pi < prefix_len {
                return self.split_three_way(parent, node, pi, &key[sym..], value);
            }

            let edge = key[sym];
            let tail = &key[sym + 1..];
            let slot = match current.children() {
                Some(children) => children.get(edge),
                None => return self.convert_leaf(parent, node, edge, tail, value),
            };
            match self.descend(loader, node, edge, slot)? {
                Some(child) => {
                    parent = Some((node, edge));
                    node = child;
                    sym += 1;
                }
                None => return self.append_tail(node, edge, tail, value),
            }
        }
    }

    /// Exact match: overwrite in place when the value and metadata shapes
    /// are unchanged, otherwise replace the node.
    fn update_value(&mut self, parent: ParentEdge, node: NodeId, value: &[u8]) -> Result<()> {
        let meta_len = self.zero_meta.len();
        let current = self.arena.get_mut(node)?;
        let same_shape = !value.is_empty()
            && current.value().is_some_and(|old| old.len() == value.len())
            && current.meta().len() == meta_len;
        if same_shape {
            if let Some(old) = current.value_mut() {
                old.copy_from_slice(value);
            }
            self.stats.inc_in_place_updates();
            return Ok(());
        }

        let current = self.arena.get(node)?;
        let mut batch = SplitBatch::new(&mut self.alloc);
        let replacement = batch.alloc(
            current.kind() | NodeKind::HAS_VALUE,
            current.prefix(),
            value,
            &self.zero_meta,
        )?;
        if let (Some(dst), Some(src)) = (batch.node_mut(replacement).children_mut(), current.children()) {
            *dst = src.clone();
        }
        let ids = batch.install(&mut self.arena);
        self.replace(parent, node, ids[0])?;
        self.stats.inc_node_replacements();
        trace!(node = %node, replacement = %ids[0], "value node replaced");
        Ok(())
    }

    /// The key ends `pi` bytes into the node's prefix.
    ///
    /// ```text
    /// [p][r][e][f][i][x]  ->  [p][r][e] = value
    ///                          next['f'] => [i][x] = old value, old children
    /// ```
    fn split_at_key_end(&mut self, parent: ParentEdge, node: NodeId, pi: usize, value: &[u8]) -> Result<()> {
        let current = self.arena.get(node)?;
        let prefix = current.prefix();
        let edge = prefix[pi];

        let mut batch = SplitBatch::new(&mut self.alloc);
        let head = batch.alloc(NodeKind::HAS_VALUE, &prefix[..pi], value, &self.zero_meta)?;
        let rest = batch.alloc(
            current.kind().without(NodeKind::IS_LEAF),
            &prefix[pi + 1..],
            current.value().unwrap_or_default(),
            current.meta(),
        )?;
        if let (Some(dst), Some(src)) = (batch.node_mut(rest).children_mut(), current.children()) {
            *dst = src.clone();
        }
        let ids = batch.install(&mut self.arena);
        self.link(ids[head], edge, ids[rest])?;
        self.replace(parent, node, ids[head])?;
        self.stats.inc_prefix_splits();
        trace!(node = %node, at = pi, edge, "prefix split at key end");
        Ok(())
    }

    /// The key continues past a leaf, which must become a branch to hold
    /// the new tail.
    fn convert_leaf(
        &mut self,
        parent: ParentEdge,
        node: NodeId,
        edge: u8,
        tail: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let current = self.arena.get(node)?;

        let mut batch = SplitBatch::new(&mut self.alloc);
        let branch = batch.alloc(
            current.kind().without(NodeKind::IS_LEAF),
            current.prefix(),
            current.value().unwrap_or_default(),
            current.meta(),
        )?;
        let leaf = batch.alloc(NodeKind::LEAF, tail, value, &self.zero_meta)?;
        let ids = batch.install(&mut self.arena);
        self.link(ids[branch], edge, ids[leaf])?;
        self.replace(parent, node, ids[branch])?;
        self.stats.inc_leaf_conversions();
        trace!(node = %node, edge, tail_len = tail.len(), "leaf converted to branch");
        Ok(())
    }

    /// Free edge on an existing branch: attach a new leaf, nothing is replaced.
    fn append_tail(&mut self, node: NodeId, edge: u8, tail: &[u8], value: &[u8]) -> Result<()> {
        let leaf = self.alloc.new_node(NodeKind::LEAF, tail, value, &self.zero_meta)?;
        let leaf = self.arena.insert(leaf);
        self.link(node, edge, leaf)?;
        self.stats.inc_tail_appends();
        Ok(())
    }

    /// Prefix and key differ at `pi`.
    ///
    /// ```text
    /// [p][r][e][f][i][x]  ->  [p][r][e]
    /// [p][r][e][p][a][r][e]    next['f'] => [i][x]    old value, old children
    ///                          next['p'] => [a][r][e] new value
    /// ```
    fn split_three_way(
        &mut self,
        parent: ParentEdge,
        node: NodeId,
        pi: usize,
        key_rest: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let current = self.arena.get(node)?;
        let prefix = current.prefix();
        let old_edge = prefix[pi];
        let new_edge = key_rest[0];

        let mut batch = SplitBatch::new(&mut self.alloc);
        let head = batch.alloc(NodeKind::BRANCH, &prefix[..pi], &[], &[])?;
        let rest = batch.alloc(
            current.kind().without(NodeKind::IS_LEAF),
            &prefix[pi + 1..],
            current.value().unwrap_or_default(),
            current.meta(),
        )?;
        if let (Some(dst), Some(src)) = (batch.node_mut(rest).children_mut(), current.children()) {
            *dst = src.clone();
        }
        let leaf = batch.alloc(NodeKind::LEAF, &key_rest[1..], value, &self.zero_meta)?;
        let ids = batch.install(&mut self.arena);
        self.link(ids[head], old_edge, ids[rest])?;
        self.link(ids[head], new_edge, ids[leaf])?;
        self.replace(parent, node, ids[head])?;
        self.stats.inc_three_way_splits();
        trace!(node = %node, at = pi, old_edge, new_edge, "three-way split");
        Ok(())
    }

    /// Swaps `new` into the slot that referenced `old` and releases `old`
    /// when the allocator frees nodes individually.
    fn replace(&mut self, parent: ParentEdge, old: NodeId, new: NodeId) -> Result<()> {
        match parent {
            None => self.root = self.root.with_memory(new),
            Some((parent, edge)) => self.link(parent, edge, new)?,
        }
        if self.alloc.is_dynamic() {
            if let Some(node) = self.arena.release(old) {
                self.alloc.free_node(&node);
            }
        }
        Ok(())
    }
}
