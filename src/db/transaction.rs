use std::sync::Arc;

use tracing::{debug, info};

use super::config::TxOptions;
use crate::storage::store::BackingStore;
use crate::storage::trie::{ChildSlot, NodeLoader, Trie, TrieStats};
use crate::types::{DiskOffset, RadixError, Result};

/// Identifier assigned to each transaction by its [`super::Db`].
pub type TxId = u64;

/// A write transaction over the trie.
///
/// Mutations accumulate in memory. [`Transaction::commit`] appends every
/// node touched since [`Transaction::begin`] to the backing store and
/// [`Transaction::rollback`] discards them. A finished transaction may be
/// begun again and then starts from the latest committed root.
///
/// # Example
///
/// ```rust
/// use radixkv::{Db, TxOptions};
///
/// let db = Db::in_memory(TxOptions::default())?;
/// let mut tx = db.begin_transaction()?;
/// tx.put(b"key", b"value")?;
/// tx.commit()?;
///
/// tx.begin()?;
/// assert_eq!(tx.get(b"key")?, Some(&b"value"[..]));
/// # Ok::<(), radixkv::RadixError>(())
/// ```
pub struct Transaction {
    id: TxId,
    trie: Trie,
    store: Option<Arc<BackingStore>>,
    started: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("started", &self.started)
            .field("nodes", &self.trie.node_count())
            .finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) fn new(id: TxId, store: Option<Arc<BackingStore>>, options: &TxOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            id,
            trie: Trie::new(options.alloc, options.value_align, options.meta_size)?,
            store,
            started: false,
        })
    }

    /// A transaction without a backing store. Its trie only lives in memory
    /// and commits write nothing.
    pub fn detached(options: &TxOptions) -> Result<Self> {
        Self::new(0, None, options)
    }

    /// Returns the unique identifier for this transaction.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Returns true between [`Transaction::begin`] and commit or rollback.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Starts the transaction.
    ///
    /// With a backing store the trie is rerooted at the latest committed
    /// root, which is loaded once a lookup or insertion reaches it. Calling
    /// `begin` on a started transaction does nothing.
    pub fn begin(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        if let Some(store) = &self.store {
            self.trie.reset(store.root());
        }
        self.started = true;
        debug!(tx_id = self.id, root = ?self.trie.root(), "Transaction started");
        Ok(())
    }

    /// Inserts `key` or overwrites its value.
    ///
    /// # Errors
    /// * `RadixError::NotStarted` - the transaction has not been begun
    /// * `RadixError::OutOfMemory` - node allocation failed; the trie is unchanged
    /// * `RadixError::Io` / `RadixError::Corruption` - a node could not be loaded
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_started()?;
        self.adopt_committed_root();
        let loader = self.store.as_deref().map(|store| store as &dyn NodeLoader);
        self.trie.put(loader, key, value)
    }

    /// Value stored under `key`, if any.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<&[u8]>> {
        self.ensure_started()?;
        self.adopt_committed_root();
        let loader = self.store.as_deref().map(|store| store as &dyn NodeLoader);
        self.trie.get(loader, key)
    }

    /// Metadata bytes stored next to the value of `key`.
    pub fn get_meta(&mut self, key: &[u8]) -> Result<Option<&[u8]>> {
        self.ensure_started()?;
        self.adopt_committed_root();
        let loader = self.store.as_deref().map(|store| store as &dyn NodeLoader);
        self.trie.get_meta(loader, key)
    }

    /// Makes every change durable and ends the transaction.
    ///
    /// Returns the committed root, or `None` when nothing was written. On
    /// error the transaction stays started with its changes intact.
    pub fn commit(&mut self) -> Result<Option<DiskOffset>> {
        self.ensure_started()?;
        let Some(store) = self.store.clone() else {
            self.started = false;
            debug!(tx_id = self.id, "Transaction committed without backing store");
            return Ok(None);
        };
        let trie = &self.trie;
        let written = store.append_commit(|base, buf| trie.write_records(base, buf))?;
        let nodes = self.trie.node_count();
        self.trie.reset(store.root());
        self.started = false;
        info!(
            tx_id = self.id,
            nodes,
            root = written.map(|off| off.0),
            "Transaction committed"
        );
        Ok(written)
    }

    /// Discards every change and ends the transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_started()?;
        let nodes = self.trie.node_count();
        self.trie.reset(self.store.as_ref().and_then(|store| store.root()));
        self.started = false;
        debug!(tx_id = self.id, nodes, "Transaction rolled back");
        Ok(())
    }

    /// The transaction's trie.
    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// Mutable access to the trie, e.g. to inject allocation failures.
    pub fn trie_mut(&mut self) -> &mut Trie {
        &mut self.trie
    }

    /// Counters of the transaction's trie.
    pub fn stats(&self) -> Arc<TrieStats> {
        self.trie.stats()
    }

    /// An empty trie picks up a root committed by another transaction since
    /// `begin`. A trie with any root of its own is left alone.
    fn adopt_committed_root(&mut self) {
        if !matches!(self.trie.root(), ChildSlot::Absent) {
            return;
        }
        if let Some(root) = self.store.as_ref().and_then(|store| store.root()) {
            self.trie.reset(Some(root));
            debug!(tx_id = self.id, root = root.0, "Transaction rerooted at committed root");
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(RadixError::NotStarted)
        }
    }
}
