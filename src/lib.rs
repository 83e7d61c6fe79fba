//! Embedded key-value store built on a prefix-compressed trie.
//!
//! Keys and values are arbitrary byte strings. A [`Transaction`] collects
//! changes in memory and appends them to a backing file on commit; subtrees
//! committed earlier are pulled back in only when a lookup or insertion
//! walks into them.

#![warn(missing_docs)]

/// Database handle, transactions and their options.
pub mod db;
/// Tracing subscriber setup.
pub mod logging;
/// Low-level primitives for the storage engine.
pub mod primitives;
/// Trie engine and on-disk format.
pub mod storage;
/// Shared identifiers and error type.
pub mod types;

pub use db::{AllocMode, Db, Transaction, TxId, TxOptions};
pub use storage::trie::{TrieStats, TrieStatsSnapshot};
pub use types::{DiskOffset, NodeId, RadixError, Result};
