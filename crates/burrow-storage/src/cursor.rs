//! Ordered forward traversal over the leaf chain.
//!
//! A cursor is a (page, cell index) position. Advancing walks the
//! cells of one leaf and then follows its next-leaf pointer, so a full
//! scan costs O(1) amortized per row regardless of tree height.

use crate::error::TableResult;
use crate::node::LeafNodeRef;
use crate::pager::Pager;
use crate::row::Row;
use crate::tree;

/// A positioned reference into the table's leaf chain.
pub struct Cursor {
    page_num: usize,
    cell_num: usize,
    end_of_table: bool,
}

impl Cursor {
    /// Positions a cursor at the leftmost cell of the leftmost leaf.
    pub fn start(pager: &mut Pager, root_page_num: usize) -> TableResult<Self> {
        // Keys are strictly positive, so descending toward 0 lands at
        // cell 0 of the leftmost leaf.
        let pos = tree::find_leaf(pager, root_page_num, 0)?;
        let page = pager.get_page(pos.page_num)?;
        let leaf = LeafNodeRef::new(&page[..]);
        Ok(Self {
            page_num: pos.page_num,
            cell_num: pos.cell_num,
            end_of_table: leaf.num_cells() == 0,
        })
    }

    /// True once the cursor has moved past the last row.
    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }

    /// Reads the row under the cursor.
    pub fn row(&self, pager: &mut Pager) -> TableResult<Row> {
        let page = pager.get_page(self.page_num)?;
        let leaf = LeafNodeRef::new(&page[..]);
        Ok(Row::deserialize(leaf.value(self.cell_num)))
    }

    /// Moves to the next cell, following the leaf chain at leaf
    /// boundaries; 0 in next_leaf marks the rightmost leaf.
    pub fn advance(&mut self, pager: &mut Pager) -> TableResult<()> {
        let (num_cells, next_leaf) = {
            let page = pager.get_page(self.page_num)?;
            let leaf = LeafNodeRef::new(&page[..]);
            (leaf.num_cells() as usize, leaf.next_leaf())
        };

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf as usize;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
