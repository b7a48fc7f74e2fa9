//! Viewport tracking and range-recompute decisions.
//!
//! The tracker mirrors the host's Idle/Scrolling status and decides, for
//! each notification, whether a range recompute is warranted and on which
//! schedule. Recomputing on every scroll-delta tick would starve the
//! background layout context, so notifications arriving while scrolling are
//! coalesced into a single pending one, flushed on the next return to Idle.

use ribbon_core::ScrollStatus;

/// Snapshot of the host's visible span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportSpan {
    pub first_visible: usize,
    pub last_visible: usize,
    pub first_fully_visible: usize,
    pub last_fully_visible: usize,
    pub total_count: usize,
}

/// What the caller should do with a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecomputeDecision {
    /// Recompute the range synchronously, now.
    Now,
    /// Recompute on the next drain of the calling-context queue, after the
    /// host's own index bookkeeping has settled.
    NextTick,
    /// Buffered; the next transition to Idle will deliver it.
    Buffered,
    /// Nothing changed; skip.
    Skip,
}

/// Tracks the host viewport across scroll state changes.
#[derive(Clone, Debug, Default)]
pub struct ViewportTracker {
    status: ScrollStatus,
    last_span: Option<ViewportSpan>,
    pending_while_scrolling: bool,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn status(&self) -> ScrollStatus {
        self.status
    }

    /// The most recent span seen, regardless of scroll state.
    pub fn last_span(&self) -> Option<ViewportSpan> {
        self.last_span
    }

    /// Host scroll status changed. A pending buffered notification is
    /// flushed exactly once when scrolling stops.
    pub fn on_scroll_status_changed(&mut self, status: ScrollStatus) -> RecomputeDecision {
        let was = self.status;
        self.status = status;
        if was == ScrollStatus::Scrolling
            && status == ScrollStatus::Idle
            && self.pending_while_scrolling
        {
            self.pending_while_scrolling = false;
            return RecomputeDecision::Now;
        }
        RecomputeDecision::Skip
    }

    /// The host viewport changed. A span equal to the last one seen
    /// (including its total count) is a no-op; a changed total with equal
    /// positions still counts as a change.
    pub fn on_viewport_changed(&mut self, span: ViewportSpan) -> RecomputeDecision {
        let changed = self.last_span != Some(span);
        self.last_span = Some(span);
        if !changed {
            return RecomputeDecision::Skip;
        }
        match self.status {
            ScrollStatus::Idle => RecomputeDecision::Now,
            ScrollStatus::Scrolling => {
                self.pending_while_scrolling = true;
                RecomputeDecision::Buffered
            }
        }
    }

    /// The viewport changed because of a removal. While idle the recompute
    /// is deferred one queue iteration so the host's index bookkeeping can
    /// settle; while scrolling it rides on the eventual scroll stop.
    pub fn on_viewport_changed_after_removal(&mut self) -> RecomputeDecision {
        match self.status {
            ScrollStatus::Idle => RecomputeDecision::NextTick,
            ScrollStatus::Scrolling => {
                self.pending_while_scrolling = true;
                RecomputeDecision::Buffered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(first: usize, last: usize, total: usize) -> ViewportSpan {
        ViewportSpan {
            first_visible: first,
            last_visible: last,
            first_fully_visible: first,
            last_fully_visible: last,
            total_count: total,
        }
    }

    #[test]
    fn test_idle_change_recomputes_now() {
        let mut tracker = ViewportTracker::new();
        assert_eq!(
            tracker.on_viewport_changed(span(0, 5, 100)),
            RecomputeDecision::Now
        );
    }

    #[test]
    fn test_identical_span_is_skipped() {
        let mut tracker = ViewportTracker::new();
        tracker.on_viewport_changed(span(0, 5, 100));
        assert_eq!(
            tracker.on_viewport_changed(span(0, 5, 100)),
            RecomputeDecision::Skip
        );
    }

    #[test]
    fn test_total_change_with_equal_positions_counts() {
        let mut tracker = ViewportTracker::new();
        tracker.on_viewport_changed(span(0, 5, 100));
        assert_eq!(
            tracker.on_viewport_changed(span(0, 5, 99)),
            RecomputeDecision::Now
        );
    }

    #[test]
    fn test_scrolling_buffers_and_flushes_once() {
        let mut tracker = ViewportTracker::new();
        tracker.on_scroll_status_changed(ScrollStatus::Scrolling);
        assert_eq!(
            tracker.on_viewport_changed(span(3, 8, 100)),
            RecomputeDecision::Buffered
        );
        assert_eq!(
            tracker.on_viewport_changed(span(4, 9, 100)),
            RecomputeDecision::Buffered
        );
        // Scroll stop delivers the coalesced notification exactly once.
        assert_eq!(
            tracker.on_scroll_status_changed(ScrollStatus::Idle),
            RecomputeDecision::Now
        );
        assert_eq!(
            tracker.on_scroll_status_changed(ScrollStatus::Idle),
            RecomputeDecision::Skip
        );
    }

    #[test]
    fn test_idle_cycle_without_changes_skips() {
        let mut tracker = ViewportTracker::new();
        tracker.on_scroll_status_changed(ScrollStatus::Scrolling);
        assert_eq!(
            tracker.on_scroll_status_changed(ScrollStatus::Idle),
            RecomputeDecision::Skip
        );
    }

    #[test]
    fn test_after_removal_defers_while_idle() {
        let mut tracker = ViewportTracker::new();
        assert_eq!(
            tracker.on_viewport_changed_after_removal(),
            RecomputeDecision::NextTick
        );
    }

    #[test]
    fn test_after_removal_suppressed_while_scrolling() {
        let mut tracker = ViewportTracker::new();
        tracker.on_scroll_status_changed(ScrollStatus::Scrolling);
        assert_eq!(
            tracker.on_viewport_changed_after_removal(),
            RecomputeDecision::Buffered
        );
        // The later scroll stop triggers it.
        assert_eq!(
            tracker.on_scroll_status_changed(ScrollStatus::Idle),
            RecomputeDecision::Now
        );
    }
}
