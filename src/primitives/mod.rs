//! Low-level primitives for the storage engine.

/// File I/O abstractions for the backing store.
///
/// Positioned reads and writes over a real file or an in-memory buffer.
pub mod io;
