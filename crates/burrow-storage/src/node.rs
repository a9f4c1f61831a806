//! In-page B-tree node layout and accessors.
//!
//! Every page holds exactly one node. Both node kinds share a 6-byte
//! common header; the per-kind header brings the total to 14 bytes.
//!
//! # Leaf layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       1   node_type (0 = internal, 1 = leaf)
//!   1       1   is_root
//!   2       4   parent_pointer (page number)
//!   6       4   num_cells
//!  10       4   next_leaf (page number, 0 = none)
//!  14   297*N   cells: {key u32, row 293 bytes}, sorted ascending
//! ```
//!
//! # Internal layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       6   common header (as above)
//!   6       4   num_keys
//!  10       4   right_child (page number)
//!  14     8*N   entries: {child u32, key u32}; entry i's key is the
//!               max key in child i's subtree
//! ```
//!
//! Accessors are views borrowing the page buffer for the scope of one
//! operation; they operate in place and never copy cell payloads.

use crate::pager::PAGE_SIZE;
use crate::row::ROW_SIZE;

// Common node header layout.
const NODE_TYPE_SIZE: usize = 1;
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_SIZE: usize = 1;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const PARENT_POINTER_SIZE: usize = 4;
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
/// Size of the header shared by both node kinds.
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header layout.
const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
/// Size of a leaf node's full header.
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf node body layout.
const LEAF_NODE_KEY_SIZE: usize = 4;
/// Size of one leaf cell: key plus serialized row.
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + ROW_SIZE;
/// Bytes available for cells in a leaf page.
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
/// Maximum cells a leaf can hold.
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Cells moved to the new right sibling during a leaf split.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
/// Cells kept in the original leaf during a split.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    LEAF_NODE_MAX_CELLS + 1 - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header layout.
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
/// Size of an internal node's full header.
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body layout.
const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
/// Size of one internal routing entry.
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
/// Maximum routing entries an internal node can hold.
pub const INTERNAL_NODE_MAX_KEYS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

/// The two node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Routing node holding (child, key) entries.
    Internal = 0,
    /// Node holding row cells directly.
    Leaf = 1,
}

impl NodeType {
    /// Decodes a node type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Internal),
            1 => Some(Self::Leaf),
            _ => None,
        }
    }
}

fn read_u32(page: &[u8], offset: usize) -> u32 {
    let bytes: [u8; 4] = page[offset..offset + 4]
        .try_into()
        .expect("u32 field has fixed width");
    u32::from_le_bytes(bytes)
}

fn write_u32(page: &mut [u8], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Returns the node type of a page.
///
/// An unrecognized type byte is treated as a leaf; freshly zero-filled
/// pages are only ever observed through `initialize`.
pub fn node_type(page: &[u8]) -> NodeType {
    NodeType::from_u8(page[NODE_TYPE_OFFSET]).unwrap_or(NodeType::Leaf)
}

/// Sets the node type byte.
pub fn set_node_type(page: &mut [u8], node_type: NodeType) {
    page[NODE_TYPE_OFFSET] = node_type as u8;
}

/// Returns the root flag.
pub fn is_node_root(page: &[u8]) -> bool {
    page[IS_ROOT_OFFSET] != 0
}

/// Sets the root flag.
pub fn set_node_root(page: &mut [u8], is_root: bool) {
    page[IS_ROOT_OFFSET] = u8::from(is_root);
}

/// Returns the parent pointer (page number).
pub fn node_parent(page: &[u8]) -> u32 {
    read_u32(page, PARENT_POINTER_OFFSET)
}

/// Sets the parent pointer.
pub fn set_node_parent(page: &mut [u8], parent: u32) {
    write_u32(page, PARENT_POINTER_OFFSET, parent);
}

/// Returns the maximum key stored in or routed through this node.
pub fn node_max_key(page: &[u8]) -> u32 {
    match node_type(page) {
        NodeType::Leaf => {
            let leaf = LeafNodeRef::new(page);
            leaf.key(leaf.num_cells() as usize - 1)
        }
        NodeType::Internal => {
            let node = InternalNodeRef::new(page);
            node.key(node.num_keys() as usize - 1)
        }
    }
}

/// Mutable view over a leaf page.
pub struct LeafNode<'a> {
    page: &'a mut [u8],
}

impl<'a> LeafNode<'a> {
    /// Creates a leaf view over a page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    pub fn new(page: &'a mut [u8]) -> Self {
        assert!(page.len() >= PAGE_SIZE, "buffer too small for a page");
        Self { page }
    }

    /// Formats the buffer as an empty non-root leaf.
    pub fn initialize(&mut self) {
        set_node_type(self.page, NodeType::Leaf);
        set_node_root(self.page, false);
        set_node_parent(self.page, 0);
        self.set_num_cells(0);
        self.set_next_leaf(0);
    }

    /// Returns the root flag.
    pub fn is_root(&self) -> bool {
        is_node_root(self.page)
    }

    /// Sets the root flag.
    pub fn set_root(&mut self, is_root: bool) {
        set_node_root(self.page, is_root);
    }

    /// Returns the parent page number.
    pub fn parent(&self) -> u32 {
        node_parent(self.page)
    }

    /// Sets the parent page number.
    pub fn set_parent(&mut self, parent: u32) {
        set_node_parent(self.page, parent);
    }

    /// Number of cells stored in the leaf.
    pub fn num_cells(&self) -> u32 {
        read_u32(self.page, LEAF_NODE_NUM_CELLS_OFFSET)
    }

    /// Sets the cell count.
    pub fn set_num_cells(&mut self, count: u32) {
        write_u32(self.page, LEAF_NODE_NUM_CELLS_OFFSET, count);
    }

    /// Page number of the next leaf to the right, 0 if none.
    pub fn next_leaf(&self) -> u32 {
        read_u32(self.page, LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    /// Sets the next-leaf pointer.
    pub fn set_next_leaf(&mut self, page_num: u32) {
        write_u32(self.page, LEAF_NODE_NEXT_LEAF_OFFSET, page_num);
    }

    fn cell_offset(cell_num: usize) -> usize {
        LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
    }

    /// Key of cell `cell_num`.
    pub fn key(&self, cell_num: usize) -> u32 {
        read_u32(self.page, Self::cell_offset(cell_num))
    }

    /// Sets the key of cell `cell_num`.
    pub fn set_key(&mut self, cell_num: usize, key: u32) {
        write_u32(self.page, Self::cell_offset(cell_num), key);
    }

    /// Row payload of cell `cell_num`.
    pub fn value(&self, cell_num: usize) -> &[u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &self.page[start..start + ROW_SIZE]
    }

    /// Mutable row payload of cell `cell_num`.
    pub fn value_mut(&mut self, cell_num: usize) -> &mut [u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &mut self.page[start..start + ROW_SIZE]
    }

    /// Copies cell `src` over cell `dst` in place.
    pub fn copy_cell(&mut self, src: usize, dst: usize) {
        let src_start = Self::cell_offset(src);
        let dst_start = Self::cell_offset(dst);
        self.page
            .copy_within(src_start..src_start + LEAF_NODE_CELL_SIZE, dst_start);
    }

    /// Binary search over the cell keys.
    ///
    /// Returns `Ok(index)` when the key is present, `Err(index)` with
    /// the sorted insertion position otherwise.
    pub fn find_cell_index(&self, key: u32) -> Result<usize, usize> {
        let mut lo = 0usize;
        let mut hi = self.num_cells() as usize;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let mid_key = self.key(mid);
            if key == mid_key {
                return Ok(mid);
            }
            if key < mid_key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Err(lo)
    }
}

/// Read-only view over a leaf page.
pub struct LeafNodeRef<'a> {
    page: &'a [u8],
}

impl<'a> LeafNodeRef<'a> {
    /// Creates a read-only leaf view.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    pub fn new(page: &'a [u8]) -> Self {
        assert!(page.len() >= PAGE_SIZE, "buffer too small for a page");
        Self { page }
    }

    /// Number of cells stored in the leaf.
    pub fn num_cells(&self) -> u32 {
        read_u32(self.page, LEAF_NODE_NUM_CELLS_OFFSET)
    }

    /// Page number of the next leaf to the right, 0 if none.
    pub fn next_leaf(&self) -> u32 {
        read_u32(self.page, LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    /// Key of cell `cell_num`.
    pub fn key(&self, cell_num: usize) -> u32 {
        read_u32(self.page, LeafNode::cell_offset(cell_num))
    }

    /// Row payload of cell `cell_num`.
    pub fn value(&self, cell_num: usize) -> &[u8] {
        let start = LeafNode::cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &self.page[start..start + ROW_SIZE]
    }
}

/// Mutable view over an internal page.
pub struct InternalNode<'a> {
    page: &'a mut [u8],
}

impl<'a> InternalNode<'a> {
    /// Creates an internal-node view over a page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    pub fn new(page: &'a mut [u8]) -> Self {
        assert!(page.len() >= PAGE_SIZE, "buffer too small for a page");
        Self { page }
    }

    /// Formats the buffer as an empty non-root internal node.
    pub fn initialize(&mut self) {
        set_node_type(self.page, NodeType::Internal);
        set_node_root(self.page, false);
        set_node_parent(self.page, 0);
        self.set_num_keys(0);
        self.set_right_child(0);
    }

    /// Returns the root flag.
    pub fn is_root(&self) -> bool {
        is_node_root(self.page)
    }

    /// Sets the root flag.
    pub fn set_root(&mut self, is_root: bool) {
        set_node_root(self.page, is_root);
    }

    /// Number of routing entries.
    pub fn num_keys(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    /// Sets the routing entry count.
    pub fn set_num_keys(&mut self, count: u32) {
        write_u32(self.page, INTERNAL_NODE_NUM_KEYS_OFFSET, count);
    }

    /// Page number of the right-most child.
    pub fn right_child(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    /// Sets the right-most child.
    pub fn set_right_child(&mut self, page_num: u32) {
        write_u32(self.page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
    }

    fn cell_offset(entry_num: usize) -> usize {
        INTERNAL_NODE_HEADER_SIZE + entry_num * INTERNAL_NODE_CELL_SIZE
    }

    /// Child page number of entry `entry_num` (not the right child).
    pub fn entry_child(&self, entry_num: usize) -> u32 {
        read_u32(self.page, Self::cell_offset(entry_num))
    }

    /// Separating key of entry `entry_num`.
    pub fn key(&self, entry_num: usize) -> u32 {
        read_u32(self.page, Self::cell_offset(entry_num) + INTERNAL_NODE_CHILD_SIZE)
    }

    /// Sets the separating key of entry `entry_num`.
    pub fn set_key(&mut self, entry_num: usize, key: u32) {
        write_u32(
            self.page,
            Self::cell_offset(entry_num) + INTERNAL_NODE_CHILD_SIZE,
            key,
        );
    }

    /// Writes entry `entry_num` as a whole.
    pub fn set_entry(&mut self, entry_num: usize, child: u32, key: u32) {
        write_u32(self.page, Self::cell_offset(entry_num), child);
        self.set_key(entry_num, key);
    }

    /// Copies entry `src` over entry `dst` in place.
    pub fn copy_entry(&mut self, src: usize, dst: usize) {
        let src_start = Self::cell_offset(src);
        let dst_start = Self::cell_offset(dst);
        self.page
            .copy_within(src_start..src_start + INTERNAL_NODE_CELL_SIZE, dst_start);
    }

    /// Routing child for position `child_num`: entry children for
    /// `0..num_keys`, the right child at `num_keys`.
    ///
    /// # Panics
    ///
    /// Panics if `child_num > num_keys`.
    pub fn child(&self, child_num: usize) -> u32 {
        let num_keys = self.num_keys() as usize;
        assert!(
            child_num <= num_keys,
            "child index {child_num} > num_keys {num_keys}"
        );
        if child_num == num_keys {
            self.right_child()
        } else {
            self.entry_child(child_num)
        }
    }

    /// Index of the child whose subtree covers `key`: the first entry
    /// whose key is >= `key`, or `num_keys` for the right child.
    pub fn find_child_index(&self, key: u32) -> usize {
        let mut lo = 0usize;
        let mut hi = self.num_keys() as usize;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if key <= self.key(mid) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// Read-only view over an internal page.
pub struct InternalNodeRef<'a> {
    page: &'a [u8],
}

impl<'a> InternalNodeRef<'a> {
    /// Creates a read-only internal-node view.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    pub fn new(page: &'a [u8]) -> Self {
        assert!(page.len() >= PAGE_SIZE, "buffer too small for a page");
        Self { page }
    }

    /// Number of routing entries.
    pub fn num_keys(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    /// Page number of the right-most child.
    pub fn right_child(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    /// Child page number of entry `entry_num`.
    pub fn entry_child(&self, entry_num: usize) -> u32 {
        read_u32(self.page, InternalNode::cell_offset(entry_num))
    }

    /// Separating key of entry `entry_num`.
    pub fn key(&self, entry_num: usize) -> u32 {
        read_u32(
            self.page,
            InternalNode::cell_offset(entry_num) + INTERNAL_NODE_CHILD_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(COMMON_NODE_HEADER_SIZE, 6);
        assert_eq!(LEAF_NODE_HEADER_SIZE, 14);
        assert_eq!(LEAF_NODE_CELL_SIZE, 297);
        assert_eq!(LEAF_NODE_SPACE_FOR_CELLS, 4082);
        assert_eq!(LEAF_NODE_MAX_CELLS, 13);
        assert_eq!(LEAF_NODE_LEFT_SPLIT_COUNT, 7);
        assert_eq!(LEAF_NODE_RIGHT_SPLIT_COUNT, 7);
        assert_eq!(INTERNAL_NODE_HEADER_SIZE, 14);
        assert_eq!(INTERNAL_NODE_CELL_SIZE, 8);
    }

    #[test]
    fn test_leaf_initialize() {
        let mut page = blank_page();
        let mut leaf = LeafNode::new(&mut page);
        leaf.initialize();

        assert_eq!(node_type(&page), NodeType::Leaf);
        assert!(!is_node_root(&page));
        assert_eq!(node_parent(&page), 0);

        let leaf = LeafNodeRef::new(&page);
        assert_eq!(leaf.num_cells(), 0);
        assert_eq!(leaf.next_leaf(), 0);
    }

    #[test]
    fn test_leaf_cell_accessors() {
        let mut page = blank_page();
        let mut leaf = LeafNode::new(&mut page);
        leaf.initialize();

        leaf.set_key(0, 7);
        leaf.value_mut(0)[0] = 0xaa;
        leaf.set_num_cells(1);

        assert_eq!(leaf.key(0), 7);
        assert_eq!(leaf.value(0)[0], 0xaa);
        assert_eq!(leaf.num_cells(), 1);
    }

    #[test]
    fn test_leaf_copy_cell() {
        let mut page = blank_page();
        let mut leaf = LeafNode::new(&mut page);
        leaf.initialize();

        leaf.set_key(0, 3);
        leaf.value_mut(0)[0] = 0x11;
        leaf.copy_cell(0, 1);

        assert_eq!(leaf.key(1), 3);
        assert_eq!(leaf.value(1)[0], 0x11);
    }

    #[test]
    fn test_leaf_binary_search() {
        let mut page = blank_page();
        let mut leaf = LeafNode::new(&mut page);
        leaf.initialize();
        for (i, key) in [2u32, 4, 6, 8].iter().enumerate() {
            leaf.set_key(i, *key);
        }
        leaf.set_num_cells(4);

        assert_eq!(leaf.find_cell_index(4), Ok(1));
        assert_eq!(leaf.find_cell_index(8), Ok(3));
        assert_eq!(leaf.find_cell_index(1), Err(0));
        assert_eq!(leaf.find_cell_index(5), Err(2));
        assert_eq!(leaf.find_cell_index(9), Err(4));
    }

    #[test]
    fn test_internal_accessors() {
        let mut page = blank_page();
        let mut node = InternalNode::new(&mut page);
        node.initialize();

        node.set_entry(0, 2, 7);
        node.set_right_child(1);
        node.set_num_keys(1);

        assert_eq!(node_type(&page), NodeType::Internal);
        let node = InternalNode::new(&mut page);
        assert_eq!(node.entry_child(0), 2);
        assert_eq!(node.key(0), 7);
        assert_eq!(node.child(0), 2);
        assert_eq!(node.child(1), 1);
    }

    #[test]
    fn test_internal_find_child_index() {
        let mut page = blank_page();
        let mut node = InternalNode::new(&mut page);
        node.initialize();
        node.set_entry(0, 10, 5);
        node.set_entry(1, 11, 9);
        node.set_right_child(12);
        node.set_num_keys(2);

        // Keys <= entry key route into the entry child.
        assert_eq!(node.find_child_index(1), 0);
        assert_eq!(node.find_child_index(5), 0);
        assert_eq!(node.find_child_index(6), 1);
        assert_eq!(node.find_child_index(9), 1);
        // Greater than every entry key: the right child.
        assert_eq!(node.find_child_index(10), 2);
    }

    #[test]
    fn test_node_max_key() {
        let mut page = blank_page();
        let mut leaf = LeafNode::new(&mut page);
        leaf.initialize();
        leaf.set_key(0, 3);
        leaf.set_key(1, 9);
        leaf.set_num_cells(2);
        assert_eq!(node_max_key(&page), 9);

        let mut page = blank_page();
        let mut node = InternalNode::new(&mut page);
        node.initialize();
        node.set_entry(0, 1, 4);
        node.set_entry(1, 2, 12);
        node.set_num_keys(2);
        assert_eq!(node_max_key(&page), 12);
    }
}
