//! Shared identifiers, error type and result alias.
#![forbid(unsafe_code)]

use std::fmt;

/// Record checksums used by the on-disk node format.
pub mod checksum;

/// Byte offset of a node record inside the backing file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DiskOffset(pub u64);

/// Index of a node inside a transaction's in-memory node arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u32);

/// Errors surfaced by the storage engine.
#[derive(thiserror::Error, Debug)]
pub enum RadixError {
    /// The backing store could not be read or written.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted record failed validation.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// The caller supplied an invalid argument or configuration.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// The transaction has not been started.
    #[error("transaction not started")]
    NotStarted,
    /// The node allocator could not satisfy a request.
    #[error("out of memory")]
    OutOfMemory,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RadixError>;

impl fmt::Display for DiskOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for DiskOffset {
    fn from(value: u64) -> Self {
        DiskOffset(value)
    }
}

impl From<DiskOffset> for u64 {
    fn from(value: DiskOffset) -> Self {
        value.0
    }
}

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
