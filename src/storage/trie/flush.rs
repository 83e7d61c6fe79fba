//! Serialization of the in-memory node graph for a commit.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::debug;

use super::{ChildSlot, Trie};
use crate::storage::format::encode_node;
use crate::types::{DiskOffset, NodeId, RadixError, Result};

impl Trie {
    /// Appends a record for every in-memory node to `dst`, children before
    /// their parents, and returns the offset of the root record.
    ///
    /// The first byte appended to `dst` lands at file offset `base`. Edges
    /// that only exist on disk keep their offsets. A root that was never
    /// loaded is returned as is without writing anything; an empty trie
    /// yields `None`.
    pub fn write_records(&self, base: u64, dst: &mut Vec<u8>) -> Result<Option<DiskOffset>> {
        let root = match self.root {
            ChildSlot::Absent => return Ok(None),
            ChildSlot::OnDisk(off) => return Ok(Some(off)),
            ChildSlot::InMemory(id) | ChildSlot::Both(id, _) => id,
        };
        let start = dst.len();
        let mut written: HashMap<NodeId, DiskOffset> = HashMap::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            let node = self.arena.get(id)?;
            if !expanded {
                stack.push((id, true));
                if let Some(children) = node.children() {
                    stack.extend(children.occupied().filter_map(|(_, slot)| slot.memory()).map(|child| (child, false)));
                }
                continue;
            }

            let mut edges: SmallVec<[(u8, DiskOffset); 8]> = SmallVec::new();
            if let Some(children) = node.children() {
                for (edge, slot) in children.occupied() {
                    let off = match slot {
                        ChildSlot::InMemory(child) | ChildSlot::Both(child, _) => *written
                            .get(&child)
                            .ok_or(RadixError::Corruption("child not written before parent"))?,
                        ChildSlot::OnDisk(off) => off,
                        ChildSlot::Absent => continue,
                    };
                    edges.push((edge, off));
                }
            }
            let off = DiskOffset(base + (dst.len() - start) as u64);
            encode_node(node, &edges, dst)?;
            written.insert(id, off);
        }
        debug!(nodes = written.len(), bytes = dst.len() - start, base, "trie serialized");
        written
            .get(&root)
            .copied()
            .map(Some)
            .ok_or(RadixError::Corruption("root not written"))
    }
}
