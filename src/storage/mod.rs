//! Trie storage engine and its on-disk representation.
//!
//! A transaction mutates an in-memory [`trie::Trie`]; committed nodes live in
//! an append-only [`store::BackingStore`] and are loaded back on demand.

/// Node record and commit footer encoding.
pub mod format;

/// Append-only backing file and node loader.
pub mod store;

/// Prefix-compressed trie with lazily loaded subtrees.
///
/// Holds the node model, allocator and the insertion algorithm.
pub mod trie;

pub use store::BackingStore;
pub use trie::{AllocMode, NodeLoader, Trie, TrieStats, TrieStatsSnapshot};
