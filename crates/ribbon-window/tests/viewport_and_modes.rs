//! Scroll-state coalescing, circular mode, fill-viewport, and working
//! ranges.

mod common;

use common::{container_specs, harness, valid_positions};
use ribbon_core::{ScrollStatus, SizeSpec};
use ribbon_testing::{item, settle};
use ribbon_window::{WindowConfig, CIRCULAR_COUNT_SENTINEL};

#[test]
fn viewport_changes_while_scrolling_coalesce_until_idle() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    let scheduled_before = h.list.stats().async_layouts_scheduled;

    h.list.on_scroll_state_changed(ScrollStatus::Scrolling);
    h.list.on_new_visible_range(10, 12);
    h.list.on_new_visible_range(15, 17);
    settle(&h.list, &h.executor);

    // No recompute while scrolling: the window has not moved.
    assert_eq!(h.list.stats().async_layouts_scheduled, scheduled_before);
    assert_eq!(valid_positions(&h.list), (0..=9).collect::<Vec<_>>());

    // Scroll stop delivers the final buffered state exactly once.
    h.list.on_scroll_state_changed(ScrollStatus::Idle);
    settle(&h.list, &h.executor);
    assert_eq!(valid_positions(&h.list), (9..=24).collect::<Vec<_>>());
}

#[test]
fn removal_notice_while_scrolling_rides_on_scroll_stop() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    h.list.on_scroll_state_changed(ScrollStatus::Scrolling);
    h.list.on_new_visible_range(12, 14);
    h.list.on_viewport_changed_after_removal(0);
    // Suppressed while scrolling: nothing deferred onto the queue.
    assert_eq!(h.list.drain_queue(), 0);

    h.list.on_scroll_state_changed(ScrollStatus::Idle);
    settle(&h.list, &h.executor);
    assert_eq!(valid_positions(&h.list), (6..=21).collect::<Vec<_>>());
}

#[test]
fn circular_mode_reports_the_unbounded_sentinel() {
    let config = WindowConfig {
        circular: true,
        ..WindowConfig::default()
    };
    let h = harness(config);
    assert_eq!(h.list.total_count_for_host(), 0);

    h.list.insert_at(0, item(0)).unwrap();
    assert_eq!(h.list.total_count_for_host(), CIRCULAR_COUNT_SENTINEL);

    h.list.insert_range_at(1, (1..10).map(item).collect()).unwrap();
    assert_eq!(h.list.total_count_for_host(), CIRCULAR_COUNT_SENTINEL);
    assert_eq!(h.list.len(), 10);
}

#[test]
fn circular_window_wraps_around_the_edge() {
    let config = WindowConfig {
        circular: true,
        range_ratio: 0.0,
        ..WindowConfig::default()
    };
    let h = harness(config);
    h.list.insert_range_at(0, (0..10).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    // Scroll to a huge virtual position near the real end: 1_000_008 % 10.
    h.host.set_visible_span(1_000_008, 1_000_009);
    h.list.on_new_visible_range(1_000_008, 1_000_009);
    settle(&h.list, &h.executor);

    // Reference 8, span 3, no padding: virtual [8, 11] wraps to the start.
    assert_eq!(valid_positions(&h.list), vec![0, 1, 8, 9]);
    let window = h.list.window().unwrap();
    assert!(window.contains(8));
    assert!(window.contains(1));
    assert!(!window.contains(5));
}

#[test]
fn fill_viewport_measures_through_the_boundary_item() {
    let config = WindowConfig {
        fill_viewport: true,
        ..WindowConfig::default()
    };
    let h = harness(config);
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();

    // 350 viewport over 100-extent items: 100, 200, 300 are short of the
    // boundary, so the fourth item (crossing it) is measured too.
    h.list
        .measure(SizeSpec::exactly(320.0), SizeSpec::exactly(350.0))
        .unwrap();

    // All of that happened synchronously, before any background work.
    assert_eq!(valid_positions(&h.list), vec![0, 1, 2, 3]);
    settle(&h.list, &h.executor);
}

#[test]
fn working_range_computes_without_moving_the_window() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    let window_before = h.list.window().unwrap();

    h.list.on_new_working_range(15, 18, 15, 18);
    settle(&h.list, &h.executor);

    assert_eq!(h.list.window().unwrap(), window_before);
    let valid = valid_positions(&h.list);
    for position in 15..=18 {
        assert!(valid.contains(&position), "working item {position} not computed");
    }
}

#[test]
fn manual_viewport_count_skips_reference_estimation() {
    let config = WindowConfig {
        estimated_viewport_count: Some(2),
        range_ratio: 1.0,
        ..WindowConfig::default()
    };
    let h = harness(config);
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    // Manual span 2, ratio 1.0: window [0 - 2, 0 + 2 + 2] clamped.
    assert_eq!(valid_positions(&h.list), (0..=4).collect::<Vec<_>>());
}

#[test]
fn empty_list_measures_to_resolved_specs() {
    let h = harness(WindowConfig::default());
    let size = h
        .list
        .measure(SizeSpec::exactly(320.0), SizeSpec::at_most(300.0))
        .unwrap();
    assert_eq!(size.width, 320.0);
    assert_eq!(size.height, 0.0);
    assert!(h.list.window().is_none());
}
