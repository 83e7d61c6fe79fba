//! Database handle and write transactions.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::primitives::io::{FileIo, MemFileIo, StdFileIo};
use crate::storage::store::BackingStore;
use crate::types::Result;

mod config;
mod transaction;

pub use config::{AllocMode, TxOptions};
pub use transaction::{Transaction, TxId};

/// Handle to a trie database backed by an append-only file.
///
/// Transactions begun from one handle share its store; their commits are
/// appended one at a time and the most recent commit's root wins.
#[derive(Debug)]
pub struct Db {
    store: Arc<BackingStore>,
    options: TxOptions,
    next_tx_id: AtomicU64,
}

impl Db {
    /// Opens or creates the database file at `path`.
    pub fn open(path: impl AsRef<Path>, options: TxOptions) -> Result<Self> {
        let path = path.as_ref();
        let db = Self::with_io(Arc::new(StdFileIo::open(path)?), options)?;
        info!(path = %path.display(), root = ?db.store.root(), "Database opened");
        Ok(db)
    }

    /// A database whose file lives in memory.
    pub fn in_memory(options: TxOptions) -> Result<Self> {
        Self::with_io(Arc::new(MemFileIo::new()), options)
    }

    /// A database over a caller-provided [`FileIo`].
    pub fn with_io(io: Arc<dyn FileIo>, options: TxOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store: Arc::new(BackingStore::open(io)?),
            options,
            next_tx_id: AtomicU64::new(1),
        })
    }

    /// Creates and begins a transaction with the handle's options.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        self.begin_transaction_with(&self.options)
    }

    /// Creates and begins a transaction with its own options.
    pub fn begin_transaction_with(&self, options: &TxOptions) -> Result<Transaction> {
        let id = self.next_tx_id.fetch_add(1, Ordering::Relaxed);
        let mut tx = Transaction::new(id, Some(Arc::clone(&self.store)), options)?;
        tx.begin()?;
        Ok(tx)
    }

    /// The backing store shared by this handle's transactions.
    pub fn store(&self) -> &Arc<BackingStore> {
        &self.store
    }

    /// Default options for new transactions.
    pub fn options(&self) -> &TxOptions {
        &self.options
    }
}
