//! Node model of the prefix-compressed trie.
//!
//! A node is either a [`Leaf`] (a key tail with a value and no edges) or a
//! [`Branch`] (a prefix, an optional value and 256 edge slots). The byte that
//! selects an edge is never repeated as the first byte of the child's prefix.

use std::fmt;
use std::ops::BitOr;

use crate::types::{DiskOffset, NodeId, RadixError, Result};

/// Number of edge slots in a branch, one per possible next byte.
pub const FANOUT: usize = 256;

/// Independent node flags as stored in a node record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct NodeKind(u8);

impl NodeKind {
    /// Branch point without a value.
    pub const BRANCH: NodeKind = NodeKind(0);
    /// The node stores a value, possibly of length zero.
    pub const HAS_VALUE: NodeKind = NodeKind(0b01);
    /// The node has no materialized edges.
    pub const IS_LEAF: NodeKind = NodeKind(0b10);
    /// Leaf holding a value, the only valid leaf shape.
    pub const LEAF: NodeKind = NodeKind(0b11);

    const ALL: u8 = 0b11;

    /// Raw flag bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Parses flag bits, rejecting unknown bits and value-less leaves.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Self::ALL != 0 {
            return Err(RadixError::Corruption("unknown node kind bits"));
        }
        let kind = NodeKind(bits);
        if kind.contains(Self::IS_LEAF) && !kind.contains(Self::HAS_VALUE) {
            return Err(RadixError::Corruption("leaf node without value"));
        }
        Ok(kind)
    }

    /// Returns true if every flag of `other` is set in `self`.
    pub const fn contains(self, other: NodeKind) -> bool {
        self.0 & other.0 == other.0
    }

    /// `self` with the flags of `other` cleared.
    pub const fn without(self, other: NodeKind) -> NodeKind {
        NodeKind(self.0 & !other.0)
    }
}

impl BitOr for NodeKind {
    type Output = NodeKind;

    fn bitor(self, rhs: NodeKind) -> NodeKind {
        NodeKind(self.0 | rhs.0)
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaf = if self.contains(Self::IS_LEAF) { "leaf" } else { "branch" };
        if self.contains(Self::HAS_VALUE) {
            write!(f, "{leaf}+value")
        } else {
            write!(f, "{leaf}")
        }
    }
}

/// One outgoing edge of a branch.
///
/// `OnDisk` becomes `Both` once the node loader has materialized the child.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ChildSlot {
    /// No child under this edge.
    #[default]
    Absent,
    /// Child only exists in the transaction's node graph.
    InMemory(NodeId),
    /// Child only exists in the backing file.
    OnDisk(DiskOffset),
    /// Child was loaded from (or still has a copy at) a disk offset.
    Both(NodeId, DiskOffset),
}

impl ChildSlot {
    /// Returns true if either part of the slot is present.
    pub fn is_occupied(self) -> bool {
        !matches!(self, ChildSlot::Absent)
    }

    /// The in-memory part of the slot.
    pub fn memory(self) -> Option<NodeId> {
        match self {
            ChildSlot::InMemory(id) | ChildSlot::Both(id, _) => Some(id),
            ChildSlot::Absent | ChildSlot::OnDisk(_) => None,
        }
    }

    /// The on-disk part of the slot.
    pub fn disk(self) -> Option<DiskOffset> {
        match self {
            ChildSlot::OnDisk(off) | ChildSlot::Both(_, off) => Some(off),
            ChildSlot::Absent | ChildSlot::InMemory(_) => None,
        }
    }

    /// Points the in-memory part at `id`, keeping any disk offset.
    pub fn with_memory(self, id: NodeId) -> ChildSlot {
        match self.disk() {
            Some(off) => ChildSlot::Both(id, off),
            None => ChildSlot::InMemory(id),
        }
    }
}

/// Edge table of a branch node.
#[derive(Clone, PartialEq, Eq)]
pub struct Children {
    slots: Box<[ChildSlot; FANOUT]>,
}

impl Default for Children {
    fn default() -> Self {
        Self::new()
    }
}

impl Children {
    /// An edge table with every slot absent.
    pub fn new() -> Self {
        Self {
            slots: Box::new([ChildSlot::Absent; FANOUT]),
        }
    }

    /// Slot selected by `edge`.
    pub fn get(&self, edge: u8) -> ChildSlot {
        self.slots[edge as usize]
    }

    /// Overwrites the slot selected by `edge`.
    pub fn set(&mut self, edge: u8, slot: ChildSlot) {
        self.slots[edge as usize] = slot;
    }

    /// Occupied slots in edge order.
    pub fn occupied(&self) -> impl Iterator<Item = (u8, ChildSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_occupied())
            .map(|(edge, slot)| (edge as u8, *slot))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| !slot.is_occupied())
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.occupied()).finish()
    }
}

/// Tail of a key: prefix, value and metadata, no edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub(crate) prefix: Vec<u8>,
    pub(crate) value: Vec<u8>,
    pub(crate) meta: Vec<u8>,
}

/// Interior node with up to [`FANOUT`] children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub(crate) prefix: Vec<u8>,
    pub(crate) value: Option<Vec<u8>>,
    pub(crate) meta: Vec<u8>,
    pub(crate) children: Children,
}

/// A trie node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Node without edges.
    Leaf(Leaf),
    /// Node with an edge table.
    Branch(Branch),
}

impl Node {
    /// Builds a leaf node.
    pub fn leaf(prefix: Vec<u8>, value: Vec<u8>, meta: Vec<u8>) -> Node {
        Node::Leaf(Leaf {
            prefix,
            value,
            meta,
        })
    }

    /// Builds a branch node.
    pub fn branch(
        prefix: Vec<u8>,
        value: Option<Vec<u8>>,
        meta: Vec<u8>,
        children: Children,
    ) -> Node {
        Node::Branch(Branch {
            prefix,
            value,
            meta,
            children,
        })
    }

    /// Flags describing this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::LEAF,
            Node::Branch(branch) if branch.value.is_some() => NodeKind::HAS_VALUE,
            Node::Branch(_) => NodeKind::BRANCH,
        }
    }

    /// Compressed edge label leading into this node.
    pub fn prefix(&self) -> &[u8] {
        match self {
            Node::Leaf(leaf) => &leaf.prefix,
            Node::Branch(branch) => &branch.prefix,
        }
    }

    /// Stored value, if any.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Node::Leaf(leaf) => Some(&leaf.value),
            Node::Branch(branch) => branch.value.as_deref(),
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Node::Leaf(leaf) => Some(&mut leaf.value),
            Node::Branch(branch) => branch.value.as_mut(),
        }
    }

    /// Metadata bytes co-located with the value.
    pub fn meta(&self) -> &[u8] {
        match self {
            Node::Leaf(leaf) => &leaf.meta,
            Node::Branch(branch) => &branch.meta,
        }
    }

    /// Edge table, absent for leaves.
    pub fn children(&self) -> Option<&Children> {
        match self {
            Node::Leaf(_) => None,
            Node::Branch(branch) => Some(&branch.children),
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Node::Leaf(_) => None,
            Node::Branch(branch) => Some(&mut branch.children),
        }
    }

    /// Returns true for leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_rejects_unknown_bits_and_valueless_leaf() {
        assert!(NodeKind::from_bits(0b100).is_err());
        assert!(NodeKind::from_bits(NodeKind::IS_LEAF.bits()).is_err());
        let kind = NodeKind::from_bits(0b11).unwrap();
        assert!(kind.contains(NodeKind::IS_LEAF));
        assert_eq!(kind.without(NodeKind::IS_LEAF), NodeKind::HAS_VALUE);
    }

    #[test]
    fn slot_keeps_offset_when_memory_is_replaced() {
        let slot = ChildSlot::OnDisk(DiskOffset(64)).with_memory(NodeId(3));
        assert_eq!(slot, ChildSlot::Both(NodeId(3), DiskOffset(64)));
        assert_eq!(
            slot.with_memory(NodeId(9)),
            ChildSlot::Both(NodeId(9), DiskOffset(64))
        );
        assert_eq!(
            ChildSlot::Absent.with_memory(NodeId(1)),
            ChildSlot::InMemory(NodeId(1))
        );
    }

    #[test]
    fn empty_value_is_distinct_from_no_value() {
        let with_empty = Node::branch(b"k".to_vec(), Some(Vec::new()), Vec::new(), Children::new());
        let without = Node::branch(b"k".to_vec(), None, Vec::new(), Children::new());
        assert_eq!(with_empty.value(), Some(&[][..]));
        assert_eq!(without.value(), None);
        assert!(with_empty.kind().contains(NodeKind::HAS_VALUE));
        assert!(!without.kind().contains(NodeKind::HAS_VALUE));
    }

    #[test]
    fn children_iterate_in_edge_order() {
        let mut children = Children::new();
        children.set(b'z', ChildSlot::InMemory(NodeId(1)));
        children.set(b'a', ChildSlot::OnDisk(DiskOffset(8)));
        let edges: Vec<u8> = children.occupied().map(|(edge, _)| edge).collect();
        assert_eq!(edges, vec![b'a', b'z']);
        assert_eq!(children.len(), 2);
    }
}
