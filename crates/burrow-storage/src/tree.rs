//! B-tree engine: insertion, lookup, leaf splitting, diagnostics.
//!
//! The tree lives entirely inside pager-managed pages; nodes refer to
//! each other by page number only. The root stays pinned at its
//! original page across splits: creating a new root copies the old
//! root's bytes out to a fresh page and rewrites the root page as an
//! internal node, so reopening a file needs no root scan.
//!
//! Splitting is implemented for leaves. A leaf split that would in
//! turn require splitting a full internal parent is surfaced as
//! [`TableError::InternalSplitUnsupported`] before any page is
//! touched, leaving the tree unmodified.

use std::fmt::Write as _;

use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::node::{
    self, InternalNode, InternalNodeRef, LeafNode, LeafNodeRef, NodeType, INTERNAL_NODE_MAX_KEYS,
    LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
};
use crate::pager::{Pager, TABLE_MAX_PAGES};
use crate::row::{Row, ROW_SIZE};

/// Position of a key (or its insertion point) within a leaf.
pub(crate) struct LeafPosition {
    pub page_num: usize,
    pub cell_num: usize,
}

/// Descends from `page_num` to the leaf whose key range contains
/// `key`, returning the cell index where the key is or would be.
pub(crate) fn find_leaf(
    pager: &mut Pager,
    page_num: usize,
    key: u32,
) -> TableResult<LeafPosition> {
    let page = pager.get_page(page_num)?;
    match node::node_type(page) {
        NodeType::Leaf => {
            let leaf = LeafNode::new(page);
            let cell_num = match leaf.find_cell_index(key) {
                Ok(index) | Err(index) => index,
            };
            Ok(LeafPosition { page_num, cell_num })
        }
        NodeType::Internal => {
            let child = {
                let internal = InternalNode::new(page);
                let index = internal.find_child_index(key);
                internal.child(index) as usize
            };
            find_leaf(pager, child, key)
        }
    }
}

/// Inserts a row keyed by its id.
///
/// Validation order follows the command contract: key positivity,
/// string lengths, then duplicate detection at the target leaf. A
/// failed insert never mutates the tree.
pub(crate) fn insert(pager: &mut Pager, root_page_num: usize, row: &Row) -> TableResult<()> {
    if row.id == 0 {
        return Err(TableError::InvalidKey);
    }
    row.validate()?;
    let key = row.id;

    let pos = find_leaf(pager, root_page_num, key)?;
    let page = pager.get_page(pos.page_num)?;
    let mut leaf = LeafNode::new(page);
    let num_cells = leaf.num_cells() as usize;

    if pos.cell_num < num_cells && leaf.key(pos.cell_num) == key {
        return Err(TableError::DuplicateKey);
    }

    if num_cells >= LEAF_NODE_MAX_CELLS {
        return split_leaf_and_insert(pager, &pos, key, row);
    }

    // Shift cells above the insertion point right by one slot.
    for i in (pos.cell_num..num_cells).rev() {
        leaf.copy_cell(i, i + 1);
    }
    leaf.set_key(pos.cell_num, key);
    row.serialize(leaf.value_mut(pos.cell_num));
    leaf.set_num_cells(num_cells as u32 + 1);
    Ok(())
}

/// Looks up a row by key.
pub(crate) fn find(
    pager: &mut Pager,
    root_page_num: usize,
    key: u32,
) -> TableResult<Option<Row>> {
    let pos = find_leaf(pager, root_page_num, key)?;
    let page = pager.get_page(pos.page_num)?;
    let leaf = LeafNodeRef::new(&page[..]);
    if pos.cell_num < leaf.num_cells() as usize && leaf.key(pos.cell_num) == key {
        Ok(Some(Row::deserialize(leaf.value(pos.cell_num))))
    } else {
        Ok(None)
    }
}

/// Splits a full leaf around the cell being inserted.
///
/// The 13 existing cells plus the new one are gathered in sorted
/// order; the lower 7 stay in the original page, the upper 7 move to
/// a newly allocated right sibling, and the leaf chain is relinked.
/// The split then propagates upward: a root leaf grows a new internal
/// root, any other leaf updates its parent's routing entries.
fn split_leaf_and_insert(
    pager: &mut Pager,
    pos: &LeafPosition,
    key: u32,
    row: &Row,
) -> TableResult<()> {
    // Snapshot the leaf before mutating anything so the capacity
    // checks below can fail with the tree untouched.
    let (mut cells, old_next_leaf, old_is_root, old_parent, old_max) = {
        let page = pager.get_page(pos.page_num)?;
        let leaf = LeafNode::new(page);
        let num_cells = leaf.num_cells() as usize;
        let mut cells: Vec<(u32, [u8; ROW_SIZE])> = Vec::with_capacity(num_cells + 1);
        for i in 0..num_cells {
            let mut payload = [0u8; ROW_SIZE];
            payload.copy_from_slice(leaf.value(i));
            cells.push((leaf.key(i), payload));
        }
        let old_max = leaf.key(num_cells - 1);
        (cells, leaf.next_leaf(), leaf.is_root(), leaf.parent(), old_max)
    };

    let new_page_num = pager.unused_page_num();
    // A root split needs a second page for the copied-out left child.
    let pages_needed = if old_is_root { 2 } else { 1 };
    if new_page_num + pages_needed > TABLE_MAX_PAGES {
        return Err(TableError::TableFull);
    }
    if !old_is_root {
        let parent_page = pager.get_page(old_parent as usize)?;
        let parent = InternalNode::new(parent_page);
        if parent.num_keys() as usize >= INTERNAL_NODE_MAX_KEYS {
            return Err(TableError::InternalSplitUnsupported);
        }
    }

    let mut new_payload = [0u8; ROW_SIZE];
    row.serialize(&mut new_payload);
    cells.insert(pos.cell_num, (key, new_payload));
    debug_assert_eq!(cells.len(), LEAF_NODE_MAX_CELLS + 1);

    let upper = cells.split_off(LEAF_NODE_LEFT_SPLIT_COUNT);
    let left_max = cells[cells.len() - 1].0;

    debug!(
        leaf = pos.page_num,
        sibling = new_page_num,
        split_key = left_max,
        "splitting leaf"
    );

    // New right sibling inherits the old next-leaf pointer.
    {
        let page = pager.get_page(new_page_num)?;
        let mut leaf = LeafNode::new(page);
        leaf.initialize();
        leaf.set_parent(old_parent);
        leaf.set_next_leaf(old_next_leaf);
        for (i, (cell_key, payload)) in upper.iter().enumerate() {
            leaf.set_key(i, *cell_key);
            leaf.value_mut(i).copy_from_slice(payload);
        }
        leaf.set_num_cells(upper.len() as u32);
    }

    // Original keeps the lower half and points at the sibling.
    {
        let page = pager.get_page(pos.page_num)?;
        let mut leaf = LeafNode::new(page);
        for (i, (cell_key, payload)) in cells.iter().enumerate() {
            leaf.set_key(i, *cell_key);
            leaf.value_mut(i).copy_from_slice(payload);
        }
        leaf.set_num_cells(cells.len() as u32);
        leaf.set_next_leaf(new_page_num as u32);
    }

    if old_is_root {
        create_new_root(pager, pos.page_num, new_page_num)
    } else {
        let parent_page_num = old_parent as usize;
        update_internal_key(pager, parent_page_num, old_max, left_max)?;
        internal_insert(pager, parent_page_num, new_page_num)
    }
}

/// Grows the tree by one level after a root split.
///
/// The old root's bytes move to a fresh left-child page; the root page
/// itself becomes an internal node with a single routing entry.
fn create_new_root(
    pager: &mut Pager,
    root_page_num: usize,
    right_child_page_num: usize,
) -> TableResult<()> {
    let left_child_page_num = pager.unused_page_num();
    let snapshot = *pager.get_page(root_page_num)?;
    let left_max = node::node_max_key(&snapshot);

    {
        let page = pager.get_page(left_child_page_num)?;
        page.copy_from_slice(&snapshot);
        node::set_node_root(page, false);
        node::set_node_parent(page, root_page_num as u32);
    }
    {
        let page = pager.get_page(root_page_num)?;
        let mut root = InternalNode::new(page);
        root.initialize();
        root.set_root(true);
        root.set_num_keys(1);
        root.set_entry(0, left_child_page_num as u32, left_max);
        root.set_right_child(right_child_page_num as u32);
    }
    {
        let page = pager.get_page(right_child_page_num)?;
        node::set_node_parent(page, root_page_num as u32);
    }

    debug!(
        root = root_page_num,
        left = left_child_page_num,
        right = right_child_page_num,
        "created new root"
    );
    Ok(())
}

/// Rewrites the separating key that pointed at a just-split left
/// sibling to that sibling's new maximum.
fn update_internal_key(
    pager: &mut Pager,
    page_num: usize,
    old_key: u32,
    new_key: u32,
) -> TableResult<()> {
    let page = pager.get_page(page_num)?;
    let mut internal = InternalNode::new(page);
    let index = internal.find_child_index(old_key);
    // The old key belonged to the right child when it exceeds every
    // entry key; there is no cell key to rewrite in that case.
    if index < internal.num_keys() as usize {
        internal.set_key(index, new_key);
    }
    Ok(())
}

/// Inserts a (child, key) routing entry for `child_page_num` into its
/// parent, keeping entries sorted and the right-child slot holding
/// the greatest subtree.
fn internal_insert(
    pager: &mut Pager,
    parent_page_num: usize,
    child_page_num: usize,
) -> TableResult<()> {
    let child_max = {
        let page = pager.get_page(child_page_num)?;
        node::node_max_key(page)
    };
    let (num_keys, right_child_page) = {
        let page = pager.get_page(parent_page_num)?;
        let internal = InternalNode::new(page);
        (internal.num_keys() as usize, internal.right_child())
    };
    debug_assert!(num_keys < INTERNAL_NODE_MAX_KEYS, "checked before the split");
    let right_max = {
        let page = pager.get_page(right_child_page as usize)?;
        node::node_max_key(page)
    };

    let page = pager.get_page(parent_page_num)?;
    let mut internal = InternalNode::new(page);
    if child_max > right_max {
        // New child becomes the right-most; the old right child gets
        // a regular entry.
        internal.set_entry(num_keys, right_child_page, right_max);
        internal.set_right_child(child_page_num as u32);
    } else {
        let index = internal.find_child_index(child_max);
        for i in (index..num_keys).rev() {
            internal.copy_entry(i, i + 1);
        }
        internal.set_entry(index, child_page_num as u32, child_max);
    }
    internal.set_num_keys(num_keys as u32 + 1);
    Ok(())
}

/// Renders the tree rooted at `page_num` as an indented diagnostic
/// dump: node sizes, leaf keys in order, and separating keys.
pub(crate) fn dump(pager: &mut Pager, page_num: usize, out: &mut String) -> TableResult<()> {
    dump_node(pager, page_num, 0, out)
}

enum NodeShape {
    Leaf(Vec<u32>),
    Internal { entries: Vec<(u32, u32)>, right_child: u32 },
}

fn dump_node(
    pager: &mut Pager,
    page_num: usize,
    depth: usize,
    out: &mut String,
) -> TableResult<()> {
    // Copy out what recursion needs; child dumps re-enter the pager.
    let shape = {
        let page = pager.get_page(page_num)?;
        match node::node_type(page) {
            NodeType::Leaf => {
                let leaf = LeafNodeRef::new(&page[..]);
                NodeShape::Leaf((0..leaf.num_cells() as usize).map(|i| leaf.key(i)).collect())
            }
            NodeType::Internal => {
                let internal = InternalNodeRef::new(&page[..]);
                NodeShape::Internal {
                    entries: (0..internal.num_keys() as usize)
                        .map(|i| (internal.entry_child(i), internal.key(i)))
                        .collect(),
                    right_child: internal.right_child(),
                }
            }
        }
    };

    match shape {
        NodeShape::Leaf(keys) => {
            indent(out, depth);
            let _ = writeln!(out, "- leaf (size {})", keys.len());
            for key in keys {
                indent(out, depth + 1);
                let _ = writeln!(out, "- {key}");
            }
        }
        NodeShape::Internal {
            entries,
            right_child,
        } => {
            indent(out, depth);
            let _ = writeln!(out, "- internal (size {})", entries.len());
            for (child, key) in entries {
                dump_node(pager, child as usize, depth + 1, out)?;
                indent(out, depth);
                let _ = writeln!(out, "- key {key}");
            }
            dump_node(pager, right_child as usize, depth + 1, out)?;
        }
    }
    Ok(())
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
