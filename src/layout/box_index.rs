//! `BoxIndex`: a strong handle naming one box in a layout
//!
//! A `BoxIndex` pairs the box's position in the layout-wide enumeration
//! with its position in this rank's owned range, when it has one. The
//! local position indexes [`LevelData`](crate::data::level_data::LevelData)
//! storage; the global position indexes the layout's box table.

use serde::{Deserialize, Serialize};

/// Position of one box in a [`DisjointBoxLayout`](crate::layout::disjoint::DisjointBoxLayout).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxIndex {
    global: usize,
    local: Option<usize>,
}

impl BoxIndex {
    #[inline]
    pub const fn new(global: usize, local: Option<usize>) -> Self {
        BoxIndex { global, local }
    }

    /// Position in the layout-wide enumeration.
    #[inline]
    pub const fn global(&self) -> usize {
        self.global
    }

    /// Position within this rank's owned range, if the box is local.
    #[inline]
    pub const fn local(&self) -> Option<usize> {
        self.local
    }

    /// Whether the box is owned by this rank.
    #[inline]
    pub const fn is_local(&self) -> bool {
        self.local.is_some()
    }
}
