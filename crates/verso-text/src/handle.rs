//! Generation-checked handles handed out by the server.

use verso_core::alloc::sparse_set::IndexSlot;

/// Handle to a font created with `create_font`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontId(IndexSlot);

/// Handle to a shaped text buffer created with `create_shaped_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapedTextId(IndexSlot);

impl FontId {
    pub fn from_slot(slot: IndexSlot) -> Self {
        Self(slot)
    }

    pub fn slot(self) -> IndexSlot {
        self.0
    }
}

impl ShapedTextId {
    pub fn from_slot(slot: IndexSlot) -> Self {
        Self(slot)
    }

    pub fn slot(self) -> IndexSlot {
        self.0
    }
}
