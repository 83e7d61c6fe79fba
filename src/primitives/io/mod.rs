#![forbid(unsafe_code)]

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};

use crate::types::{RadixError, Result};

/// Positioned I/O over the backing file.
pub trait FileIo: Send + Sync + 'static {
    /// Reads exactly `dst.len()` bytes starting at `off`.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes all of `src` starting at `off`, extending the file if needed.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Flushes file data and metadata to stable storage.
    fn sync_all(&self) -> Result<()>;
    /// Current length of the file in bytes.
    fn len(&self) -> Result<u64>;
    /// Returns true if the file holds no bytes.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// [`FileIo`] over a regular file.
#[derive(Clone)]
pub struct StdFileIo {
    inner: Arc<Mutex<File>>,
}

impl StdFileIo {
    /// Wraps an already opened file handle.
    pub fn new(file: File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    /// Opens `path` for reading and writing, creating it when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl FileIo for StdFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(off))?;
        file.read_exact(dst)?;
        Ok(())
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(off))?;
        file.write_all(src)?;
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        self.inner.lock().sync_all()?;
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.inner.lock().metadata()?.len())
    }
}

/// [`FileIo`] over a growable in-memory buffer.
#[derive(Clone, Default)]
pub struct MemFileIo {
    bytes: Arc<RwLock<Vec<u8>>>,
}

impl MemFileIo {
    /// Creates an empty in-memory file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }
}

impl FileIo for MemFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        let bytes = self.bytes.read();
        let start = usize::try_from(off).map_err(|_| RadixError::Invalid("offset overflow"))?;
        let end = start
            .checked_add(dst.len())
            .ok_or(RadixError::Invalid("offset overflow"))?;
        if end > bytes.len() {
            return Err(std::io::Error::new(ErrorKind::UnexpectedEof, "read past end of buffer").into());
        }
        dst.copy_from_slice(&bytes[start..end]);
        Ok(())
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        let mut bytes = self.bytes.write();
        let start = usize::try_from(off).map_err(|_| RadixError::Invalid("offset overflow"))?;
        let end = start
            .checked_add(src.len())
            .ok_or(RadixError::Invalid("offset overflow"))?;
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(src);
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.read().len() as u64)
    }
}
