//! Immediate mutation semantics: moves, updates, host notifications, and
//! malformed-changeset fallback.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use common::{container_specs, harness, valid_positions};
use ribbon_core::ReportedError;
use ribbon_testing::{item, settle, HostNotification};
use ribbon_window::WindowConfig;

#[test]
fn move_out_of_window_releases_and_backfills() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    h.host.clear_notifications();

    let moved = h.list.holder(2).unwrap();
    assert!(moved.is_valid());

    h.list.move_item(2, 20).unwrap();
    settle(&h.list, &h.executor);

    // The moved holder left the window: state preserved, tree discarded.
    assert!(!moved.is_valid());
    assert!(moved.is_acquiring_state());
    assert!(Arc::ptr_eq(&moved, &h.list.holder(20).unwrap()));

    // The item that slid into the vacated window slot became valid.
    assert_eq!(valid_positions(&h.list), (0..=9).collect::<Vec<_>>());
    assert_eq!(
        h.host.notifications(),
        vec![HostNotification::Moved { from: 2, to: 20 }]
    );
}

#[test]
fn move_into_window_carries_the_layout_along() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    let carried = h.list.holder(3).unwrap();
    h.list.move_item(3, 7).unwrap();

    // Still inside the window: the computed layout travels, no recompute.
    assert!(Arc::ptr_eq(&carried, &h.list.holder(7).unwrap()));
    assert!(carried.is_valid());
}

#[test]
fn update_replaces_descriptor_and_recomputes() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    let computes_before = h.engine.compute_count();

    h.list.update_at(3, item(103)).unwrap();
    let holder = h.list.holder(3).unwrap();
    assert_eq!(holder.descriptor(), item(103));

    settle(&h.list, &h.executor);
    assert!(holder.is_valid());
    assert!(h.engine.compute_count() > computes_before);
    assert!(h
        .host
        .notifications()
        .contains(&HostNotification::Updated { position: 3, count: 1 }));
}

#[test]
fn remove_shifts_the_window_contents() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    h.host.clear_notifications();

    h.list.remove_range_at(0, 3).unwrap();
    settle(&h.list, &h.executor);

    assert_eq!(h.list.len(), 27);
    // Old items 3..=12 now occupy positions 0..=9 and are all valid.
    assert_eq!(valid_positions(&h.list), (0..=9).collect::<Vec<_>>());
    assert_eq!(
        h.host.notifications(),
        vec![HostNotification::Removed { position: 0, count: 3 }]
    );
}

#[test]
fn batch_callback_fires_once_per_commit_with_size_flag() {
    let h = harness(WindowConfig::default());
    let flags = Arc::new(Mutex::new(Vec::new()));
    let flags_clone = Arc::clone(&flags);
    h.list
        .set_on_batch_applied(Box::new(move |size_changed| {
            flags_clone.lock().unwrap().push(size_changed);
        }));

    h.list.insert_range_at(0, (0..30).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    h.list.move_item(1, 2).unwrap();
    h.list.remove_at(0).unwrap();

    // Insert changes size, a pure move does not, a remove does.
    assert_eq!(*flags.lock().unwrap(), vec![true, false, true]);
}

#[test]
fn malformed_immediate_mutation_falls_back_to_reconciliation() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..5).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);
    h.host.clear_notifications();

    // Out of bounds: reported and reconciled, not applied literally.
    h.list.remove_at(50).unwrap();

    assert_eq!(h.list.len(), 0);
    assert!(h
        .reporter
        .reports()
        .iter()
        .any(|r| matches!(r, ReportedError::MutationSequence(_))));
    assert_eq!(
        h.host.notifications(),
        vec![HostNotification::Removed { position: 0, count: 5 }]
    );
}

#[test]
fn malformed_async_changeset_reconciles_to_its_inserts() {
    let h = harness(WindowConfig::default());
    h.list.insert_range_at(0, (0..3).map(item).collect()).unwrap();
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    settle(&h.list, &h.executor);

    // Contradictory batch: removes more than exists, then inserts two.
    h.list.remove_range_at_async(1, 5);
    h.list.insert_at_async(0, item(100));
    h.list.insert_at_async(1, item(101));
    h.list.commit_async();
    settle(&h.list, &h.executor);

    assert!(h
        .reporter
        .reports()
        .iter()
        .any(|r| matches!(r, ReportedError::MutationSequence(_))));
    // Delete-all-then-insert-all: only the batch's inserted items remain.
    assert_eq!(h.list.len(), 2);
    assert_eq!(h.list.holder(0).unwrap().descriptor(), item(100));
    assert_eq!(h.list.holder(1).unwrap().descriptor(), item(101));
    settle(&h.list, &h.executor);
    assert_eq!(valid_positions(&h.list), vec![0, 1]);
}

#[test]
fn remeasure_requested_when_size_can_change() {
    let config = WindowConfig {
        size_derived_from_first_item: true,
        ..WindowConfig::default()
    };
    let h = harness(config);
    let (w, hs) = container_specs();
    h.list.measure(w, hs).unwrap();
    assert_eq!(h.host.remeasure_requests(), 0);

    h.list.insert_at(0, item(0)).unwrap();
    assert_eq!(h.host.remeasure_requests(), 1);

    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);
    h.list
        .set_on_batch_applied(Box::new(move |size_changed| {
            if size_changed {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            }
        }));
    h.list.insert_at(1, item(1)).unwrap();
    assert_eq!(h.host.remeasure_requests(), 2);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // The host answers the request by remeasuring with the same specs.
    let size = h.list.remeasure().unwrap().unwrap();
    assert_eq!(size.width, 320.0);
    settle(&h.list, &h.executor);
}
