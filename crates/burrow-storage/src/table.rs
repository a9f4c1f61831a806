//! The public table handle: a pager plus the root page number.
//!
//! One `Table` owns the connection to one database file for its whole
//! lifetime. Mutations commit to the in-memory page cache immediately;
//! durability is reached at [`Table::close`], which flushes every
//! resident page. No durability is promised for a connection that is
//! dropped without closing.

use std::path::Path;

use tracing::debug;

use crate::cursor::Cursor;
use crate::error::TableResult;
use crate::node::LeafNode;
use crate::pager::Pager;
use crate::row::Row;
use crate::tree;

/// The single-table database handle.
pub struct Table {
    pager: Pager,
    root_page_num: usize,
}

impl Table {
    /// Opens (creating if necessary) the database file.
    ///
    /// A brand-new file gets page 0 initialized as an empty root
    /// leaf. The root stays at page 0 across splits, so no root scan
    /// is needed for existing files.
    pub fn open(path: impl AsRef<Path>) -> TableResult<Self> {
        let mut pager = Pager::open(path.as_ref())?;

        if pager.page_count() == 0 {
            let page = pager.get_page(0)?;
            let mut root = LeafNode::new(page);
            root.initialize();
            root.set_root(true);
            debug!("initialized new database with an empty root leaf");
        }

        Ok(Self {
            pager,
            root_page_num: 0,
        })
    }

    /// Inserts a row keyed by its id.
    pub fn insert(&mut self, row: &Row) -> TableResult<()> {
        tree::insert(&mut self.pager, self.root_page_num, row)
    }

    /// Looks up a single row by key.
    pub fn find(&mut self, key: u32) -> TableResult<Option<Row>> {
        tree::find(&mut self.pager, self.root_page_num, key)
    }

    /// Returns every row in ascending key order.
    pub fn select(&mut self) -> TableResult<Vec<Row>> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::start(&mut self.pager, self.root_page_num)?;
        while !cursor.end_of_table() {
            rows.push(cursor.row(&mut self.pager)?);
            cursor.advance(&mut self.pager)?;
        }
        Ok(rows)
    }

    /// Renders the diagnostic tree dump.
    pub fn btree_dump(&mut self) -> TableResult<String> {
        let mut out = String::new();
        tree::dump(&mut self.pager, self.root_page_num, &mut out)?;
        Ok(out)
    }

    /// Flushes all resident pages and closes the connection.
    pub fn close(mut self) -> TableResult<()> {
        self.pager.flush_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::row::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};
    use tempfile::NamedTempFile;

    fn row(id: u32) -> Row {
        Row::new(id, &format!("user{id}"), &format!("person{id}@example.com")).unwrap()
    }

    #[test]
    fn test_insert_then_select() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        table.insert(&row).unwrap();

        assert_eq!(table.select().unwrap(), vec![row]);
    }

    #[test]
    fn test_maximum_length_strings_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        let username = "a".repeat(COLUMN_USERNAME_SIZE);
        let email = "a".repeat(COLUMN_EMAIL_SIZE);
        let row = Row::new(1, &username, &email).unwrap();
        table.insert(&row).unwrap();

        let rows = table.select().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, username);
        assert_eq!(rows[0].email, email);
    }

    #[test]
    fn test_oversized_row_not_stored() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        let row = Row {
            id: 1,
            username: "a".repeat(COLUMN_USERNAME_SIZE + 1),
            email: String::from("a@b.c"),
        };
        let err = table.insert(&row).unwrap_err();
        assert!(matches!(err, TableError::StringTooLong { .. }));
        assert!(table.select().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_insert_keeps_one_row() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        table.insert(&row(1)).unwrap();
        let err = table.insert(&row(1)).unwrap_err();
        assert!(matches!(err, TableError::DuplicateKey));
        assert_eq!(table.select().unwrap().len(), 1);
    }

    #[test]
    fn test_select_is_sorted_after_mixed_inserts() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        for id in [5, 3, 8, 1, 14, 2, 13, 9, 4, 7, 6, 12, 10, 11] {
            table.insert(&row(id)).unwrap();
        }

        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        let expected: Vec<u32> = (1..=14).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_close_and_reopen_reproduces_select() {
        let file = NamedTempFile::new().unwrap();

        {
            let mut table = Table::open(file.path()).unwrap();
            for id in 1..=20 {
                table.insert(&row(id)).unwrap();
            }
            table.close().unwrap();
        }

        let mut table = Table::open(file.path()).unwrap();
        let first = table.select().unwrap();
        table.close().unwrap();

        // Close on an already-flushed connection is idempotent.
        let mut table = Table::open(file.path()).unwrap();
        let second = table.select().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
    }

    #[test]
    fn test_table_full_is_reported_and_survivable() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();

        let mut stored = 0u32;
        let mut full = false;
        for id in 1..=2000 {
            match table.insert(&row(id)) {
                Ok(()) => stored += 1,
                Err(TableError::TableFull) => {
                    full = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(full, "expected the table to fill up");

        // The failed insert left the tree consistent.
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        let expected: Vec<u32> = (1..=stored).collect();
        assert_eq!(ids, expected);

        // And it keeps failing the same way rather than corrupting.
        let err = table.insert(&row(5000)).unwrap_err();
        assert!(matches!(err, TableError::TableFull));
    }
}
