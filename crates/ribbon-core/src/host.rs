//! Host container contract.
//!
//! The host is the scrollable container widget that mounts the windowed
//! items. Ribbon never draws or scrolls anything itself; it observes the
//! host's visible span and scroll status and pushes structural
//! notifications back at it.

/// Scroll status reported by the host container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollStatus {
    #[default]
    Idle,
    Scrolling,
}

/// The hosting scrollable container.
///
/// Notifications are issued from the calling context, always after the
/// corresponding holder-sequence change has been applied.
pub trait HostContainer: Send + Sync {
    /// Current scroll status.
    fn scroll_status(&self) -> ScrollStatus;

    /// Position of the first (at least partially) visible item.
    fn first_visible_position(&self) -> Option<usize>;

    /// Position of the last (at least partially) visible item.
    fn last_visible_position(&self) -> Option<usize>;

    /// Position of the first fully visible item.
    fn first_fully_visible_position(&self) -> Option<usize>;

    /// Position of the last fully visible item.
    fn last_fully_visible_position(&self) -> Option<usize>;

    /// `count` items were inserted starting at `position`.
    fn notify_inserted(&self, position: usize, count: usize);

    /// `count` items were removed starting at `position`.
    fn notify_removed(&self, position: usize, count: usize);

    /// `count` items were updated in place starting at `position`.
    fn notify_updated(&self, position: usize, count: usize);

    /// The item at `from` moved to `to`.
    fn notify_moved(&self, from: usize, to: usize);

    /// The container should schedule a remeasure of itself.
    fn request_remeasure(&self);
}
