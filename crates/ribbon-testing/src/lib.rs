//! Deterministic fakes for testing the Ribbon engine.
//!
//! Everything here is driven explicitly: the [`ManualExecutor`] runs
//! background tasks only when pumped, the [`RecordingHost`] is scripted by
//! the test, and [`settle`] pumps executor and calling-context queue until
//! the engine is quiescent. No timers, no real threads, no flakiness.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ribbon_core::{
    AttributeValue, ErrorReporter, HostContainer, LayoutEngine, LayoutError, RenderDescriptor,
    ReportedError, ScrollStatus, SizeSpec, SizedTree, Task, TaskExecutor,
};
use ribbon_window::{HolderFactory, LayoutHolder, WindowedList};
use rustc_hash::FxHashMap;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Attribute key the fake engine reads item identities from.
pub const ITEM_ID_ATTRIBUTE: &str = "test.item_id";

/// Creates a component descriptor carrying a test item id.
pub fn item(id: i64) -> RenderDescriptor {
    RenderDescriptor::component().with_attribute(ITEM_ID_ATTRIBUTE, AttributeValue::Int(id))
}

/// Creates a sticky component descriptor carrying a test item id.
pub fn sticky_item(id: i64) -> RenderDescriptor {
    item(id).with_sticky(true)
}

fn id_of(descriptor: &RenderDescriptor) -> Option<i64> {
    match descriptor.attribute(ITEM_ID_ATTRIBUTE) {
        Some(AttributeValue::Int(id)) => Some(*id),
        _ => None,
    }
}

#[derive(Default)]
struct FakeEngineState {
    default_extent: f32,
    extent_overrides: FxHashMap<i64, f32>,
    failing_ids: FxHashMap<i64, String>,
    compute_count: usize,
    computed_ids: Vec<Option<i64>>,
}

/// A layout engine with scripted sizes and failures.
///
/// Produces trees whose cross-axis size resolves the incoming specs and
/// whose main axis (both width and height report the extent, so the engine
/// works for either orientation) comes from the script.
pub struct FakeLayoutEngine {
    state: Mutex<FakeEngineState>,
}

impl Default for FakeLayoutEngine {
    fn default() -> Self {
        Self::with_extent(100.0)
    }
}

impl FakeLayoutEngine {
    /// Creates an engine producing `extent`-sized items by default.
    pub fn with_extent(extent: f32) -> Self {
        Self {
            state: Mutex::new(FakeEngineState {
                default_extent: extent,
                ..FakeEngineState::default()
            }),
        }
    }

    /// Overrides the extent for one item id.
    pub fn set_extent_for(&self, id: i64, extent: f32) {
        lock(&self.state).extent_overrides.insert(id, extent);
    }

    /// Makes computation fail for one item id.
    pub fn fail_for(&self, id: i64, detail: impl Into<String>) {
        lock(&self.state).failing_ids.insert(id, detail.into());
    }

    /// Total number of `compute` calls so far.
    pub fn compute_count(&self) -> usize {
        lock(&self.state).compute_count
    }

    /// Item ids in computation order (`None` for descriptors without one).
    pub fn computed_ids(&self) -> Vec<Option<i64>> {
        lock(&self.state).computed_ids.clone()
    }
}

impl LayoutEngine for FakeLayoutEngine {
    fn compute(
        &self,
        descriptor: &RenderDescriptor,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<SizedTree, LayoutError> {
        let mut state = lock(&self.state);
        let id = id_of(descriptor);
        state.compute_count += 1;
        state.computed_ids.push(id);
        if let Some(id) = id {
            if let Some(detail) = state.failing_ids.get(&id) {
                return Err(LayoutError::UnresolvedDescriptor {
                    detail: detail.clone(),
                });
            }
        }
        let extent = id
            .and_then(|id| state.extent_overrides.get(&id).copied())
            .unwrap_or(state.default_extent);
        Ok(SizedTree::new(
            width_spec.resolve(extent),
            height_spec.resolve(extent),
        ))
    }
}

/// A background executor that runs nothing until pumped.
#[derive(Default)]
pub struct ManualExecutor {
    tasks: Mutex<VecDeque<Task>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Runs the oldest pending task. Returns false when none were pending.
    pub fn run_one(&self) -> bool {
        let task = lock(&self.tasks).pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs pending tasks, including ones enqueued while running, until
    /// none remain. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl TaskExecutor for ManualExecutor {
    fn execute(&self, task: Task) {
        lock(&self.tasks).push_back(task);
    }
}

/// A host notification observed by [`RecordingHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostNotification {
    Inserted { position: usize, count: usize },
    Removed { position: usize, count: usize },
    Updated { position: usize, count: usize },
    Moved { from: usize, to: usize },
}

#[derive(Default)]
struct HostState {
    scroll_status: ScrollStatus,
    first_visible: Option<usize>,
    last_visible: Option<usize>,
    first_fully_visible: Option<usize>,
    last_fully_visible: Option<usize>,
    notifications: Vec<HostNotification>,
    remeasure_requests: usize,
}

/// A scripted host container that records every notification.
#[derive(Default)]
pub struct RecordingHost {
    state: Mutex<HostState>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the scroll status reported to the engine.
    pub fn set_scroll_status(&self, status: ScrollStatus) {
        lock(&self.state).scroll_status = status;
    }

    /// Scripts the visible span reported to the engine. Fully-visible
    /// bounds default to the same span.
    pub fn set_visible_span(&self, first: usize, last: usize) {
        let mut state = lock(&self.state);
        state.first_visible = Some(first);
        state.last_visible = Some(last);
        state.first_fully_visible = Some(first);
        state.last_fully_visible = Some(last);
    }

    pub fn notifications(&self) -> Vec<HostNotification> {
        lock(&self.state).notifications.clone()
    }

    pub fn clear_notifications(&self) {
        lock(&self.state).notifications.clear();
    }

    pub fn remeasure_requests(&self) -> usize {
        lock(&self.state).remeasure_requests
    }
}

impl HostContainer for RecordingHost {
    fn scroll_status(&self) -> ScrollStatus {
        lock(&self.state).scroll_status
    }

    fn first_visible_position(&self) -> Option<usize> {
        lock(&self.state).first_visible
    }

    fn last_visible_position(&self) -> Option<usize> {
        lock(&self.state).last_visible
    }

    fn first_fully_visible_position(&self) -> Option<usize> {
        lock(&self.state).first_fully_visible
    }

    fn last_fully_visible_position(&self) -> Option<usize> {
        lock(&self.state).last_fully_visible
    }

    fn notify_inserted(&self, position: usize, count: usize) {
        lock(&self.state)
            .notifications
            .push(HostNotification::Inserted { position, count });
    }

    fn notify_removed(&self, position: usize, count: usize) {
        lock(&self.state)
            .notifications
            .push(HostNotification::Removed { position, count });
    }

    fn notify_updated(&self, position: usize, count: usize) {
        lock(&self.state)
            .notifications
            .push(HostNotification::Updated { position, count });
    }

    fn notify_moved(&self, from: usize, to: usize) {
        lock(&self.state)
            .notifications
            .push(HostNotification::Moved { from, to });
    }

    fn request_remeasure(&self) {
        lock(&self.state).remeasure_requests += 1;
    }
}

/// A reporter that records everything routed to it.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<ReportedError>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ReportedError> {
        lock(&self.reports).clone()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.reports).is_empty()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: ReportedError) {
        log::debug!("recorded: {error}");
        lock(&self.reports).push(error);
    }
}

/// A holder factory that counts creations.
#[derive(Default)]
pub struct RecordingHolderFactory {
    created: AtomicUsize,
}

impl RecordingHolderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl HolderFactory for RecordingHolderFactory {
    fn create(&self, descriptor: RenderDescriptor) -> Arc<LayoutHolder> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(LayoutHolder::new(descriptor))
    }
}

/// Pumps the background executor and the calling-context queue until both
/// are quiescent. Returns the total number of tasks that ran.
pub fn settle(list: &WindowedList, executor: &ManualExecutor) -> usize {
    let mut total = 0;
    loop {
        let ran = executor.run_all() + list.drain_queue();
        if ran == 0 {
            return total;
        }
        total += ran;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_engine_scripted_sizes() {
        let engine = FakeLayoutEngine::with_extent(50.0);
        engine.set_extent_for(3, 80.0);
        let tree = engine
            .compute(
                &item(3),
                SizeSpec::exactly(320.0),
                SizeSpec::unspecified(),
            )
            .unwrap();
        assert_eq!(tree.height(), 80.0);
        assert_eq!(tree.width(), 320.0);
        assert_eq!(engine.compute_count(), 1);
        assert_eq!(engine.computed_ids(), vec![Some(3)]);
    }

    #[test]
    fn test_fake_engine_scripted_failure() {
        let engine = FakeLayoutEngine::default();
        engine.fail_for(7, "missing data");
        let result = engine.compute(
            &item(7),
            SizeSpec::exactly(320.0),
            SizeSpec::unspecified(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_manual_executor_pumps_in_order() {
        let executor = ManualExecutor::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            executor.execute(Box::new(move || log.lock().unwrap().push(i)));
        }
        assert_eq!(executor.pending(), 3);
        assert_eq!(executor.run_all(), 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }
}
