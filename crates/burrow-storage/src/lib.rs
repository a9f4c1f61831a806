//! # burrow-storage
//!
//! Disk-backed storage engine for burrow, a single-file, fixed-schema
//! record store. Rows are indexed by an integer primary key inside a
//! B-tree whose nodes each occupy one 4096-byte page of the backing
//! file.
//!
//! Components, leaves first:
//!
//! - [`row`] — fixed-width binary codec for one record
//! - [`pager`] — page cache over the backing file
//! - [`node`] — in-page node layout and accessors
//! - `tree` — insertion, lookup, leaf splitting, tree dump
//! - [`cursor`] — ordered full-table traversal
//! - [`table`] — the public connection handle
//!
//! The engine is single-threaded and single-writer: one [`Table`] owns
//! the pager exclusively, and page views are never retained across
//! top-level operations.

#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod node;
pub mod pager;
pub mod row;
pub mod table;

mod tree;

pub use cursor::Cursor;
pub use error::{PagerError, PagerResult, TableError, TableResult};
pub use node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
pub use pager::{Pager, PAGE_SIZE, TABLE_MAX_PAGES};
pub use row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, ROW_SIZE};
pub use table::Table;
