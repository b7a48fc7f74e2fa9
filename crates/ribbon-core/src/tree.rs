//! Sized trees: the opaque result of one item's layout computation.

use smallvec::SmallVec;

/// Inline capacity for per-item node ids. Most items resolve to one or two
/// root nodes, so 4 avoids heap allocation in the common case.
pub type NodeIdVec = SmallVec<[u64; 4]>;

/// A measured width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Transient interaction state carried by an item, detachable from its
/// computed tree so the item can be evicted and later re-enter the window
/// with continuity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemState {
    /// Scroll offset of scrollable content inside the item, if any.
    pub scroll_offset: f32,
}

/// The concrete sized tree produced by the layout engine for one item.
///
/// Ribbon treats the tree as opaque: it caches it, reports its size, and
/// carries its detachable [`ItemState`]. How the tree was computed is the
/// layout engine's business.
#[derive(Clone, Debug, PartialEq)]
pub struct SizedTree {
    width: f32,
    height: f32,
    node_ids: NodeIdVec,
    state: ItemState,
}

impl SizedTree {
    /// Creates a tree with the given measured size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            node_ids: SmallVec::new(),
            state: ItemState::default(),
        }
    }

    /// Attaches the ids of the mounted nodes backing this tree.
    pub fn with_node_ids(mut self, node_ids: impl IntoIterator<Item = u64>) -> Self {
        self.node_ids = node_ids.into_iter().collect();
        self
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns the measured size of the tree.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns the ids of the mounted nodes backing this tree.
    pub fn node_ids(&self) -> &[u64] {
        &self.node_ids
    }

    /// Returns the tree's transient interaction state.
    pub fn state(&self) -> &ItemState {
        &self.state
    }

    /// Replaces the tree's transient interaction state. Used to hand a
    /// preserved state back to an item re-entering the window.
    pub fn set_state(&mut self, state: ItemState) {
        self.state = state;
    }

    /// Detaches a copy of the transient interaction state.
    pub fn detach_state(&self) -> ItemState {
        self.state.clone()
    }
}
