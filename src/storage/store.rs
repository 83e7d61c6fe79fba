#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::primitives::io::{FileIo, StdFileIo};
use crate::storage::format::{
    decode_node, decode_record_header, Footer, BODY_FIXED_LEN, FOOTER_LEN, RECORD_HEADER_LEN,
};
use crate::storage::trie::{Node, NodeLoader};
use crate::types::{DiskOffset, RadixError, Result};

#[derive(Debug, Clone, Copy, Default)]
struct StoreState {
    file_size: u64,
    footer: Option<(DiskOffset, Footer)>,
}

/// Append-only file holding committed tries.
///
/// Nodes are read on demand through [`NodeLoader`]; commits append records
/// and a footer while holding the store lock.
pub struct BackingStore {
    io: Arc<dyn FileIo>,
    state: Mutex<StoreState>,
}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl BackingStore {
    /// Opens (or creates) the store file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Arc::new(StdFileIo::open(path)?))
    }

    /// Opens a store over `io`, validating the last footer of a non-empty file.
    pub fn open(io: Arc<dyn FileIo>) -> Result<Self> {
        let file_size = io.len()?;
        let footer = if file_size == 0 {
            None
        } else {
            if file_size < FOOTER_LEN as u64 {
                return Err(RadixError::Corruption("file shorter than a footer"));
            }
            let footer_off = file_size - FOOTER_LEN as u64;
            let mut bytes = [0u8; FOOTER_LEN];
            io.read_at(footer_off, &mut bytes)?;
            Some((DiskOffset(footer_off), Footer::decode(&bytes, footer_off)?))
        };
        debug!(
            file_size,
            root = footer.map(|(_, f)| f.root.0),
            "backing store opened"
        );
        Ok(Self {
            io,
            state: Mutex::new(StoreState { file_size, footer }),
        })
    }

    /// Returns true if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.state.lock().file_size == 0
    }

    /// Current file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.state.lock().file_size
    }

    /// Offset of the most recently committed root.
    pub fn root(&self) -> Option<DiskOffset> {
        self.state.lock().footer.map(|(_, footer)| footer.root)
    }

    /// Appends one commit.
    ///
    /// `build` receives the offset its first record will land at and fills
    /// the record buffer, returning the root offset. Nothing is written when
    /// it returns `None` or leaves the buffer empty.
    pub fn append_commit<F>(&self, build: F) -> Result<Option<DiskOffset>>
    where
        F: FnOnce(u64, &mut Vec<u8>) -> Result<Option<DiskOffset>>,
    {
        let mut state = self.state.lock();
        let base = state.file_size;
        let mut records = Vec::new();
        let Some(root) = build(base, &mut records)? else {
            return Ok(None);
        };
        if records.is_empty() {
            return Ok(None);
        }
        if root.0 >= base + records.len() as u64 {
            return Err(RadixError::Invalid("commit root outside the written records"));
        }

        self.io.write_at(base, &records)?;
        self.io.sync_all()?;

        let footer_off = base + records.len() as u64;
        let footer = Footer {
            root,
            previous: state.footer.map(|(off, _)| off),
        };
        self.io.write_at(footer_off, &footer.encode(footer_off))?;
        self.io.sync_all()?;

        state.file_size = footer_off + FOOTER_LEN as u64;
        state.footer = Some((DiskOffset(footer_off), footer));
        info!(
            root = root.0,
            record_bytes = records.len(),
            file_size = state.file_size,
            "commit appended"
        );
        Ok(Some(root))
    }
}

impl NodeLoader for BackingStore {
    fn read_node(&self, off: DiskOffset) -> Result<Node> {
        let limit = match self.state.lock().footer {
            Some((footer_off, _)) => footer_off.0,
            None => return Err(RadixError::Corruption("node read from an empty store")),
        };
        let end_of_header = off
            .0
            .checked_add(RECORD_HEADER_LEN as u64)
            .ok_or(RadixError::Corruption("node offset overflow"))?;
        if end_of_header > limit {
            return Err(RadixError::Corruption("node offset beyond committed data"));
        }
        let mut header = [0u8; RECORD_HEADER_LEN];
        self.io.read_at(off.0, &mut header)?;
        let (body_len, crc) = decode_record_header(&header);
        if body_len < BODY_FIXED_LEN || end_of_header + body_len as u64 > limit {
            return Err(RadixError::Corruption("node record length out of range"));
        }
        let mut body = vec![0u8; body_len];
        self.io.read_at(end_of_header, &mut body)?;
        decode_node(&body, crc)
    }
}
