use crate::types::{NodeId, RadixError, Result};

use super::node::Node;

/// Slab of a transaction's in-memory nodes, addressed by [`NodeId`].
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Option<Node>>,
    vacant: Vec<NodeId>,
}

impl NodeArena {
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(RadixError::Corruption("dangling node id"))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(RadixError::Corruption("dangling node id"))
    }

    /// Removes a node, making its id available for reuse.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.get_mut(id.index())?.take()?;
        self.vacant.push(id);
        Some(node)
    }

    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.vacant.len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.vacant.clear();
    }
}
