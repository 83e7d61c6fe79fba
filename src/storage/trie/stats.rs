use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Snapshot of trie statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieStatsSnapshot {
    /// Nodes handed out by the allocator
    pub node_allocs: u64,
    /// Nodes released back to a dynamic allocator
    pub node_frees: u64,
    /// Allocation requests that failed
    pub alloc_failures: u64,
    /// Nodes materialized through the node loader
    pub node_loads: u64,
    /// Values overwritten without reallocating the node
    pub in_place_updates: u64,
    /// Exact-match updates that replaced the node
    pub node_replacements: u64,
    /// Splits where the new key ended inside an existing prefix
    pub prefix_splits: u64,
    /// Splits on a mismatching prefix byte
    pub three_way_splits: u64,
    /// Leaves converted to branches to gain a child
    pub leaf_conversions: u64,
    /// Leaves attached under a free edge of an existing branch
    pub tail_appends: u64,
}

/// Counters for trie mutations, shared between a trie and its allocator.
#[derive(Default, Debug)]
pub struct TrieStats {
    node_allocs: AtomicU64,
    node_frees: AtomicU64,
    alloc_failures: AtomicU64,
    node_loads: AtomicU64,
    in_place_updates: AtomicU64,
    node_replacements: AtomicU64,
    prefix_splits: AtomicU64,
    three_way_splits: AtomicU64,
    leaf_conversions: AtomicU64,
    tail_appends: AtomicU64,
}

macro_rules! counter {
    ($get:ident, $inc:ident) => {
        #[doc = concat!("Current value of the `", stringify!($get), "` counter.")]
        pub fn $get(&self) -> u64 {
            self.$get.load(AtomicOrdering::Relaxed)
        }

        pub(crate) fn $inc(&self) {
            self.$get.fetch_add(1, AtomicOrdering::Relaxed);
        }
    };
}

impl TrieStats {
    counter!(node_allocs, inc_node_allocs);
    counter!(node_frees, inc_node_frees);
    counter!(alloc_failures, inc_alloc_failures);
    counter!(node_loads, inc_node_loads);
    counter!(in_place_updates, inc_in_place_updates);
    counter!(node_replacements, inc_node_replacements);
    counter!(prefix_splits, inc_prefix_splits);
    counter!(three_way_splits, inc_three_way_splits);
    counter!(leaf_conversions, inc_leaf_conversions);
    counter!(tail_appends, inc_tail_appends);

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> TrieStatsSnapshot {
        TrieStatsSnapshot {
            node_allocs: self.node_allocs(),
            node_frees: self.node_frees(),
            alloc_failures: self.alloc_failures(),
            node_loads: self.node_loads(),
            in_place_updates: self.in_place_updates(),
            node_replacements: self.node_replacements(),
            prefix_splits: self.prefix_splits(),
            three_way_splits: self.three_way_splits(),
            leaf_conversions: self.leaf_conversions(),
            tail_appends: self.tail_appends(),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "radixkv::trie::stats",
            node_allocs = snapshot.node_allocs,
            node_frees = snapshot.node_frees,
            alloc_failures = snapshot.alloc_failures,
            node_loads = snapshot.node_loads,
            in_place_updates = snapshot.in_place_updates,
            node_replacements = snapshot.node_replacements,
            prefix_splits = snapshot.prefix_splits,
            three_way_splits = snapshot.three_way_splits,
            leaf_conversions = snapshot.leaf_conversions,
            tail_appends = snapshot.tail_appends,
            "trie stats snapshot"
        );
    }
}
