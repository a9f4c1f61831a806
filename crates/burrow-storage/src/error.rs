//! Error types for the burrow storage engine.
//!
//! Two layers of failure exist. `PagerError` covers faults between the
//! in-memory page cache and the backing file; these indicate an
//! unrecoverable inconsistency and are never retried. `TableError`
//! covers per-command outcomes: invalid input and capacity limits are
//! reported to the caller and leave the tree untouched, while pager
//! faults bubble up through it.

use std::io;

use thiserror::Error;

/// Result type for pager operations.
pub type PagerResult<T> = Result<T, PagerError>;

/// Result type for table and B-tree operations.
pub type TableResult<T> = Result<T, TableError>;

/// Faults raised by the page store. All of these are fatal to the
/// connection: the cache and the file can no longer be trusted to
/// agree.
#[derive(Debug, Error)]
pub enum PagerError {
    /// Underlying file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A page read returned fewer bytes than a full page.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes a full page read requires.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// A page number outside the addressable range was requested.
    #[error("page number out of bounds: {page_num} >= {max}")]
    PageOutOfBounds {
        /// The offending page number.
        page_num: usize,
        /// One past the largest addressable page.
        max: usize,
    },

    /// The backing file length is not a whole number of pages.
    #[error("db file is not a whole number of pages, corrupt file")]
    CorruptFile,

    /// A flush was requested for a page that was never loaded.
    #[error("tried to flush non-resident page {0}")]
    PageNotResident(usize),
}

/// Per-command outcomes of table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Keys must be strictly positive.
    #[error("id must be positive")]
    InvalidKey,

    /// A string column exceeds its fixed content maximum.
    #[error("{field} too long: {len} bytes (max {max})")]
    StringTooLong {
        /// Column name.
        field: &'static str,
        /// Actual byte length.
        len: usize,
        /// Maximum content bytes for the column.
        max: usize,
    },

    /// The key already exists in the tree.
    #[error("duplicate key")]
    DuplicateKey,

    /// No page can be allocated for a required split.
    #[error("table full")]
    TableFull,

    /// A leaf split would require splitting a full internal node,
    /// which the engine does not implement. The tree is left
    /// unmodified when this is raised.
    #[error("splitting internal node is not implemented")]
    InternalSplitUnsupported,

    /// Fault in the page store.
    #[error(transparent)]
    Pager(#[from] PagerError),
}

impl TableError {
    /// Creates a `StringTooLong` error for a named column.
    pub fn string_too_long(field: &'static str, len: usize, max: usize) -> Self {
        Self::StringTooLong { field, len, max }
    }

    /// Returns true if the connection can keep serving commands after
    /// reporting this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Pager(_) | Self::InternalSplitUnsupported)
    }
}
