//! Windowing and layout-scheduling engine for virtualized collections.
//!
//! Only a bounded window of items around what is visible ever holds a
//! materialized, measured layout; everything else stays a lightweight
//! descriptor. The engine keeps that window consistent under concurrent
//! structural edits and scroll events:
//!
//! - [`LayoutHolder`]: per-item owner of a lazily computed layout.
//! - [`RangeCalculator`] / [`RangeWindow`]: which positions should hold
//!   valid layouts.
//! - [`traverse`]: ordering of background layout work.
//! - [`ViewportTracker`]: scroll-state-aware range-recompute decisions.
//! - [`WindowedList`]: the facade for measurement, mutations, scheduling.
//!
//! The layout algorithm itself, the host scrollable container, and
//! rendering are external collaborators specified in `ribbon-core`.

mod holder;
mod list;
mod mutation;
mod range;
mod scheduler;
mod traverse;
mod viewport;

pub use holder::{DefaultHolderFactory, HolderFactory, LayoutHolder};
pub use list::{BatchCallback, WindowConfig, WindowStats, WindowedList};
pub use mutation::{Changeset, PendingMutation};
pub use range::{
    estimate_range_size, Positions, RangeCalculator, RangeWindow, CIRCULAR_COUNT_SENTINEL,
};
pub use traverse::{traverse, Bidirectional, Traversal, TraversalStrategy};
pub use viewport::{RecomputeDecision, ViewportSpan, ViewportTracker};
