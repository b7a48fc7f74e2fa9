//! The windowed list facade.
//!
//! [`WindowedList`] ties the engine together: it owns the holder sequence,
//! derives the range window on measure and viewport changes, schedules sync
//! and async layout, and runs the mutation pipeline. Everything here
//! executes on the calling context; background completions re-enter through
//! the holder locks or the calling-context queue, never directly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use ribbon_core::{
    ConfigError, ErrorReporter, HostContainer, LayoutEngine, LayoutError, LogReporter,
    MutationError, RenderDescriptor, ReportedError, ScrollStatus, Size, SizeSpec, SpecProvider,
    TaskExecutor, TaskQueue,
};

use crate::holder::{DefaultHolderFactory, HolderFactory, LayoutHolder};
use crate::mutation::{apply_literal, fallback_reconcile, Changeset, PendingMutation};
use crate::range::{estimate_range_size, RangeCalculator, RangeWindow};
use crate::scheduler::{BatchPrepareItem, LayoutScheduler};
use crate::traverse::{traverse, TraversalStrategy};
use crate::viewport::{RecomputeDecision, ViewportSpan, ViewportTracker};

/// Engine configuration. Validated once at construction.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    /// Multiplier sizing the look-ahead/look-behind margin relative to the
    /// per-viewport item count.
    pub range_ratio: f32,
    /// Manual per-viewport item count. When set, no reference item is
    /// measured to derive it. Incompatible with
    /// `size_derived_from_first_item`.
    pub estimated_viewport_count: Option<usize>,
    /// The container derives its own main-axis size from the first item.
    pub size_derived_from_first_item: bool,
    /// Report an unbounded item count to the host and wrap indices modulo
    /// the real count.
    pub circular: bool,
    /// Synchronously measure successive items on `measure` until the
    /// viewport is full.
    pub fill_viewport: bool,
    /// Ordering of background layout over the window.
    pub traversal: TraversalStrategy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            range_ratio: 2.0,
            estimated_viewport_count: None,
            size_derived_from_first_item: false,
            circular: false,
            fill_viewport: false,
            traversal: TraversalStrategy::Sequential,
        }
    }
}

impl WindowConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.estimated_viewport_count.is_some() && self.size_derived_from_first_item {
            return Err(ConfigError::ManualRangeWithSelfMeasuringReference);
        }
        if !self.range_ratio.is_finite() || self.range_ratio < 0.0 {
            return Err(ConfigError::InvalidRangeRatio {
                ratio: self.range_ratio,
            });
        }
        Ok(())
    }
}

/// Counters describing the engine's current shape. `total_holders` and
/// `valid_holders` are sampled at call time; the rest accumulate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub total_holders: usize,
    pub valid_holders: usize,
    pub sync_layouts: u64,
    pub async_layouts_scheduled: u64,
    pub batches_applied: u64,
}

/// Callback invoked exactly once per committed batch, with whether the
/// content size could have changed.
pub type BatchCallback = Box<dyn FnMut(bool) + Send>;

#[derive(Clone, Copy, Debug)]
struct MeasuredSpecs {
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    size: Size,
}

struct ListState {
    holders: Vec<Arc<LayoutHolder>>,
    window: Option<RangeWindow>,
    tracker: ViewportTracker,
    measured: Option<MeasuredSpecs>,
    /// Estimated per-viewport item count; manual override or derived from
    /// the measured reference item.
    range_size: Option<usize>,
    open_changeset: Changeset,
    queued_changesets: VecDeque<Changeset>,
    prep_in_flight: bool,
    on_batch_applied: Option<BatchCallback>,
    stats: WindowStats,
}

impl ListState {
    fn outstanding_async(&self) -> usize {
        usize::from(!self.open_changeset.is_empty())
            + self.queued_changesets.len()
            + usize::from(self.prep_in_flight)
    }
}

struct ListShared {
    config: WindowConfig,
    calc: RangeCalculator,
    scheduler: LayoutScheduler,
    provider: Arc<dyn SpecProvider>,
    host: Arc<dyn HostContainer>,
    factory: Arc<dyn HolderFactory>,
    reporter: Arc<dyn ErrorReporter>,
    queue: TaskQueue,
    state: Mutex<ListState>,
}

impl ListShared {
    fn lock_state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Windowing engine for one virtualized collection.
pub struct WindowedList {
    shared: Arc<ListShared>,
}

impl WindowedList {
    /// Creates an engine with the default holder factory and log reporter.
    pub fn new(
        config: WindowConfig,
        engine: Arc<dyn LayoutEngine>,
        provider: Arc<dyn SpecProvider>,
        executor: Arc<dyn TaskExecutor>,
        host: Arc<dyn HostContainer>,
    ) -> Result<Self, ConfigError> {
        Self::with_collaborators(
            config,
            engine,
            provider,
            executor,
            host,
            Arc::new(DefaultHolderFactory),
            Arc::new(LogReporter),
        )
    }

    /// Creates an engine with explicit factory and reporter collaborators.
    pub fn with_collaborators(
        config: WindowConfig,
        engine: Arc<dyn LayoutEngine>,
        provider: Arc<dyn SpecProvider>,
        executor: Arc<dyn TaskExecutor>,
        host: Arc<dyn HostContainer>,
        factory: Arc<dyn HolderFactory>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let calc = RangeCalculator::new(config.range_ratio, config.circular)?;
        let scheduler = LayoutScheduler::new(engine, executor, Arc::clone(&reporter));
        let range_size = config.estimated_viewport_count;
        Ok(Self {
            shared: Arc::new(ListShared {
                config,
                calc,
                scheduler,
                provider,
                host,
                factory,
                reporter,
                queue: TaskQueue::new(),
                state: Mutex::new(ListState {
                    holders: Vec::new(),
                    window: None,
                    tracker: ViewportTracker::new(),
                    measured: None,
                    range_size,
                    open_changeset: Changeset::default(),
                    queued_changesets: VecDeque::new(),
                    prep_in_flight: false,
                    on_batch_applied: None,
                    stats: WindowStats::default(),
                }),
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Measurement
    // ─────────────────────────────────────────────────────────────────────

    /// Measures the container.
    ///
    /// Applies any changesets accumulated before first measurement
    /// atomically, computes the reference item synchronously (its size may
    /// gate the container's own layout pass), derives the range window, and
    /// schedules async layout for the rest of the window.
    pub fn measure(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<Size, LayoutError> {
        let mut commits = Vec::new();
        let result = measure_impl(&self.shared, width_spec, height_spec, &mut commits);
        for size_changed in commits {
            fire_batch_applied(&self.shared, size_changed);
        }
        result
    }

    /// Re-runs `measure` with the last specs, if any.
    pub fn remeasure(&self) -> Result<Option<Size>, LayoutError> {
        let measured = { self.shared.lock_state().measured };
        match measured {
            Some(m) => self.measure(m.width_spec, m.height_spec).map(Some),
            None => Ok(None),
        }
    }

    /// The container size from the last measure, if any.
    pub fn measured_size(&self) -> Option<Size> {
        self.shared.lock_state().measured.map(|m| m.size)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Immediate mutations
    // ─────────────────────────────────────────────────────────────────────

    pub fn insert_at(
        &self,
        position: usize,
        descriptor: RenderDescriptor,
    ) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::Insert {
            position,
            descriptor,
        })
    }

    pub fn insert_range_at(
        &self,
        position: usize,
        descriptors: Vec<RenderDescriptor>,
    ) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::InsertRange {
            position,
            descriptors,
        })
    }

    pub fn remove_at(&self, position: usize) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::Remove { position })
    }

    pub fn remove_range_at(&self, position: usize, count: usize) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::RemoveRange { position, count })
    }

    pub fn update_at(
        &self,
        position: usize,
        descriptor: RenderDescriptor,
    ) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::Update {
            position,
            descriptor,
        })
    }

    pub fn update_range_at(
        &self,
        position: usize,
        descriptors: Vec<RenderDescriptor>,
    ) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::UpdateRange {
            position,
            descriptors,
        })
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<(), MutationError> {
        self.apply_immediate(PendingMutation::Move { from, to })
    }

    fn apply_immediate(&self, op: PendingMutation) -> Result<(), MutationError> {
        let size_changed = {
            let mut state = self.shared.lock_state();
            let outstanding = state.outstanding_async();
            if outstanding > 0 {
                return Err(MutationError::Conflicting {
                    outstanding_changesets: outstanding,
                });
            }
            let mut changeset = Changeset::default();
            changeset.push(op);
            apply_changeset_locked(&self.shared, &mut state, changeset, &mut VecDeque::new())
        };
        fire_batch_applied(&self.shared, size_changed);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Async-queued mutations
    // ─────────────────────────────────────────────────────────────────────

    pub fn insert_at_async(&self, position: usize, descriptor: RenderDescriptor) {
        self.push_async(PendingMutation::Insert {
            position,
            descriptor,
        });
    }

    pub fn insert_range_at_async(&self, position: usize, descriptors: Vec<RenderDescriptor>) {
        self.push_async(PendingMutation::InsertRange {
            position,
            descriptors,
        });
    }

    pub fn remove_at_async(&self, position: usize) {
        self.push_async(PendingMutation::Remove { position });
    }

    pub fn remove_range_at_async(&self, position: usize, count: usize) {
        self.push_async(PendingMutation::RemoveRange { position, count });
    }

    pub fn update_at_async(&self, position: usize, descriptor: RenderDescriptor) {
        self.push_async(PendingMutation::Update {
            position,
            descriptor,
        });
    }

    pub fn update_range_at_async(&self, position: usize, descriptors: Vec<RenderDescriptor>) {
        self.push_async(PendingMutation::UpdateRange {
            position,
            descriptors,
        });
    }

    pub fn move_item_async(&self, from: usize, to: usize) {
        self.push_async(PendingMutation::Move { from, to });
    }

    fn push_async(&self, op: PendingMutation) {
        self.shared.lock_state().open_changeset.push(op);
    }

    /// Seals the open changeset and schedules its application.
    ///
    /// Before first measurement the changeset accumulates and is applied by
    /// `measure`. Afterwards the batch's new items are laid out on the
    /// background context first; application then runs on the next drain of
    /// the calling-context queue. Changesets apply in commit order.
    pub fn commit_async(&self) {
        let mut state = self.shared.lock_state();
        let changeset = std::mem::take(&mut state.open_changeset);
        state.queued_changesets.push_back(changeset);
        pump_async(&self.shared, &mut state);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Viewport and working range
    // ─────────────────────────────────────────────────────────────────────

    /// The host's visible span changed.
    pub fn on_new_visible_range(&self, first_visible: usize, last_visible: usize) {
        let mut state = self.shared.lock_state();
        let total = state.holders.len();
        let span = ViewportSpan {
            first_visible: self.shared.calc.real_position(first_visible, total),
            last_visible: self.shared.calc.real_position(last_visible, total),
            first_fully_visible: self
                .shared
                .host
                .first_fully_visible_position()
                .map(|p| self.shared.calc.real_position(p, total))
                .unwrap_or_else(|| self.shared.calc.real_position(first_visible, total)),
            last_fully_visible: self
                .shared
                .host
                .last_fully_visible_position()
                .map(|p| self.shared.calc.real_position(p, total))
                .unwrap_or_else(|| self.shared.calc.real_position(last_visible, total)),
            total_count: total,
        };
        let decision = state.tracker.on_viewport_changed(span);
        handle_decision(&self.shared, &mut state, decision);
    }

    /// The host's scroll status changed. Stopping flushes the viewport
    /// notification buffered while scrolling, if any.
    pub fn on_scroll_state_changed(&self, status: ScrollStatus) {
        let mut state = self.shared.lock_state();
        let decision = state.tracker.on_scroll_status_changed(status);
        handle_decision(&self.shared, &mut state, decision);
    }

    /// The viewport changed because an item was removed. While idle, the
    /// recompute is deferred one drain of the calling-context queue so the
    /// host's index bookkeeping can settle.
    pub fn on_viewport_changed_after_removal(&self, position: usize) {
        log::trace!("viewport changed after removal at {position}");
        let mut state = self.shared.lock_state();
        let decision = state.tracker.on_viewport_changed_after_removal();
        handle_decision(&self.shared, &mut state, decision);
    }

    /// A collaborator requests layouts for an explicit working range,
    /// without moving the committed window.
    pub fn on_new_working_range(
        &self,
        first: usize,
        last: usize,
        first_fully_visible: usize,
        last_fully_visible: usize,
    ) {
        let mut state = self.shared.lock_state();
        let Some(measured) = state.measured else {
            return;
        };
        let total = state.holders.len();
        if total == 0 || first > last {
            return;
        }
        let end = last.min(total - 1);
        let order = traverse(
            self.shared.config.traversal,
            first.min(end),
            end + 1,
            first_fully_visible,
            last_fully_visible,
        );
        for position in order {
            let holder = Arc::clone(&state.holders[position]);
            let descriptor = holder.descriptor();
            let (child_w, child_h) =
                self.shared
                    .provider
                    .child_specs(measured.width_spec, measured.height_spec, &descriptor);
            if self
                .shared
                .scheduler
                .schedule_async(position, &holder, child_w, child_h)
            {
                state.stats.async_layouts_scheduled += 1;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle and introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Registers the per-commit completion callback.
    pub fn set_on_batch_applied(&self, callback: BatchCallback) {
        self.shared.lock_state().on_batch_applied = Some(callback);
    }

    /// Runs deferred calling-context work (batch applications, deferred
    /// range recomputes). The host calls this once per iteration of its own
    /// event loop. Returns how many tasks ran.
    pub fn drain_queue(&self) -> usize {
        self.shared.queue.drain()
    }

    /// Tears the engine down: no new async work is dispatched, in-flight
    /// work completes and drops its results, deferred work is discarded.
    pub fn detach(&self) {
        self.shared.scheduler.detach();
        self.shared.queue.clear();
    }

    /// Item count to report to the host; the unbounded sentinel in circular
    /// mode.
    pub fn total_count_for_host(&self) -> usize {
        let total = self.shared.lock_state().holders.len();
        self.shared.calc.total_for_host(total)
    }

    /// Real item count.
    pub fn len(&self) -> usize {
        self.shared.lock_state().holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The holder at `position`, if any. Holder identity is stable across
    /// index shifts.
    pub fn holder(&self, position: usize) -> Option<Arc<LayoutHolder>> {
        self.shared.lock_state().holders.get(position).cloned()
    }

    /// The current range window, if one has been computed.
    pub fn window(&self) -> Option<RangeWindow> {
        self.shared.lock_state().window
    }

    pub fn stats(&self) -> WindowStats {
        let state = self.shared.lock_state();
        WindowStats {
            total_holders: state.holders.len(),
            valid_holders: state.holders.iter().filter(|h| h.is_valid()).count(),
            ..state.stats
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Internals (free functions over the shared state)
// ─────────────────────────────────────────────────────────────────────────

fn measure_impl(
    shared: &Arc<ListShared>,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    commits: &mut Vec<bool>,
) -> Result<Size, LayoutError> {
    let mut state = shared.lock_state();

    // Apply everything that accumulated before this measurement in one
    // atomic pass. Skipped while a background preparation is in flight;
    // that changeset applies through the queue.
    if !state.prep_in_flight {
        while let Some(changeset) = state.queued_changesets.pop_front() {
            let size_changed =
                apply_changeset_locked(shared, &mut state, changeset, &mut VecDeque::new());
            commits.push(size_changed);
        }
    }

    state.measured = Some(MeasuredSpecs {
        width_spec,
        height_spec,
        size: Size::ZERO,
    });

    if state.holders.is_empty() {
        state.window = None;
        let size = Size::new(width_spec.resolve(0.0), height_spec.resolve(0.0));
        if let Some(measured) = state.measured.as_mut() {
            measured.size = size;
        }
        return Ok(size);
    }

    let reference = reference_position(shared, &state);
    let holder = Arc::clone(&state.holders[reference]);
    let descriptor = holder.descriptor();
    let (child_w, child_h) = shared
        .provider
        .child_specs(width_spec, height_spec, &descriptor);
    let reference_size = shared
        .scheduler
        .compute_sync(reference, &holder, child_w, child_h)?;
    state.stats.sync_layouts += 1;

    let item_extent = shared.provider.item_extent(reference_size);
    if shared.config.estimated_viewport_count.is_none() {
        let viewport = shared.provider.viewport_extent(width_spec, height_spec);
        state.range_size = Some(estimate_range_size(viewport, item_extent));
    }

    let mut content_extent = item_extent * state.holders.len() as f32;
    if shared.config.fill_viewport {
        let viewport = shared.provider.viewport_extent(width_spec, height_spec);
        if viewport.is_finite() {
            let filled = shared.scheduler.fill_viewport_sync(
                &state.holders,
                shared.provider.as_ref(),
                width_spec,
                height_spec,
                reference + 1,
                viewport,
                item_extent,
            );
            content_extent = content_extent.max(filled);
        }
    }

    let size = shared
        .provider
        .container_size(width_spec, height_spec, reference_size, content_extent);
    if let Some(measured) = state.measured.as_mut() {
        measured.size = size;
    }

    update_window(shared, &mut state, reference);
    Ok(size)
}

/// First item if nothing has been measured yet, else the first visible.
fn reference_position(shared: &ListShared, state: &ListState) -> usize {
    let total = state.holders.len();
    if total == 0 {
        return 0;
    }
    if !state.holders.iter().any(|h| h.is_valid()) {
        return 0;
    }
    match state.tracker.last_span() {
        Some(span) => shared
            .calc
            .real_position(span.first_visible, total)
            .min(total - 1),
        None => 0,
    }
}

/// Recomputes the window around `reference`, evicts holders that fell out
/// of it, and schedules async layout for the rest in traversal order.
fn update_window(shared: &ListShared, state: &mut ListState, reference: usize) {
    let total = state.holders.len();
    if total == 0 {
        state.window = None;
        return;
    }
    let Some(measured) = state.measured else {
        return;
    };
    let Some(range_size) = state.range_size else {
        return;
    };

    let window = shared.calc.window(reference, range_size, total);
    state.window = Some(window);

    for (position, holder) in state.holders.iter().enumerate() {
        if !window.contains(position) && !holder.is_sticky() && holder.is_valid() {
            holder.acquire_state_and_release();
        }
    }

    let positions: Vec<usize> = window.positions().collect();
    if positions.is_empty() {
        return;
    }
    let (first_idx, last_idx) = visible_indices(shared, state, &positions);
    let order = traverse(
        shared.config.traversal,
        0,
        positions.len(),
        first_idx,
        last_idx,
    );
    for index in order {
        let position = positions[index];
        let holder = Arc::clone(&state.holders[position]);
        let descriptor = holder.descriptor();
        let (child_w, child_h) =
            shared
                .provider
                .child_specs(measured.width_spec, measured.height_spec, &descriptor);
        if shared
            .scheduler
            .schedule_async(position, &holder, child_w, child_h)
        {
            state.stats.async_layouts_scheduled += 1;
        }
    }
}

/// Maps the last-seen visible span onto indices of the window's position
/// list, so traversal pivots on what the user actually sees.
fn visible_indices(
    shared: &ListShared,
    state: &ListState,
    positions: &[usize],
) -> (usize, usize) {
    let fallback = (0, positions.len() - 1);
    let total = state.holders.len();
    let Some(span) = state.tracker.last_span() else {
        return fallback;
    };
    if total == 0 {
        return fallback;
    }
    let first = shared.calc.real_position(span.first_visible, total);
    let last = shared.calc.real_position(span.last_visible, total);
    let first_idx = positions.iter().position(|&p| p == first);
    let last_idx = positions.iter().position(|&p| p == last);
    match (first_idx, last_idx) {
        (Some(a), Some(b)) if a <= b => (a, b),
        (Some(a), Some(b)) => (b, a),
        (Some(a), None) => (a, a),
        (None, Some(b)) => (b, b),
        (None, None) => fallback,
    }
}

/// Validates and applies one changeset, then revalidates the window and
/// notifies interested parties. Returns whether the content size could
/// have changed.
fn apply_changeset_locked(
    shared: &ListShared,
    state: &mut ListState,
    changeset: Changeset,
    prepared: &mut VecDeque<Arc<LayoutHolder>>,
) -> bool {
    let size_changed = match changeset.validate(state.holders.len()) {
        Ok(()) => {
            apply_literal(
                changeset.ops(),
                &mut state.holders,
                shared.factory.as_ref(),
                shared.host.as_ref(),
                prepared,
            );
            changeset.may_change_content_size()
        }
        Err(error) => {
            shared
                .reporter
                .report(ReportedError::MutationSequence(error));
            fallback_reconcile(
                changeset.ops(),
                &mut state.holders,
                shared.factory.as_ref(),
                shared.host.as_ref(),
            );
            // The reconciliation rebuilt the sequence; callers must assume
            // the content size changed.
            true
        }
    };
    state.stats.batches_applied += 1;

    if state.measured.is_some() {
        ensure_range_size(shared, state);
        let reference = reference_position(shared, state);
        update_window(shared, state, reference);
    }
    if size_changed && shared.config.size_derived_from_first_item {
        shared.host.request_remeasure();
    }
    size_changed
}

/// Establishes the per-viewport estimate when items appear in a measured
/// but previously empty sequence: the reference holder is computed
/// synchronously, exactly as it would be during `measure`.
fn ensure_range_size(shared: &ListShared, state: &mut ListState) {
    if state.range_size.is_some() || state.holders.is_empty() {
        return;
    }
    let Some(measured) = state.measured else {
        return;
    };
    let reference = reference_position(shared, state);
    let holder = Arc::clone(&state.holders[reference]);
    let descriptor = holder.descriptor();
    let (child_w, child_h) =
        shared
            .provider
            .child_specs(measured.width_spec, measured.height_spec, &descriptor);
    if let Ok(size) = shared
        .scheduler
        .compute_sync(reference, &holder, child_w, child_h)
    {
        state.stats.sync_layouts += 1;
        let viewport = shared
            .provider
            .viewport_extent(measured.width_spec, measured.height_spec);
        state.range_size = Some(estimate_range_size(
            viewport,
            shared.provider.item_extent(size),
        ));
    }
}

/// Starts background preparation for the next queued changeset, if idle.
fn pump_async(shared: &Arc<ListShared>, state: &mut ListState) {
    if state.prep_in_flight {
        return;
    }
    let Some(measured) = state.measured else {
        return;
    };
    let Some(changeset) = state.queued_changesets.pop_front() else {
        return;
    };
    state.prep_in_flight = true;

    let mut prepared = Vec::new();
    let mut items = Vec::new();
    for descriptor in changeset.inserted_descriptors() {
        let holder = shared.factory.create(descriptor.clone());
        let (child_w, child_h) =
            shared
                .provider
                .child_specs(measured.width_spec, measured.height_spec, descriptor);
        items.push(BatchPrepareItem {
            holder: Arc::clone(&holder),
            width_spec: child_w,
            height_spec: child_h,
        });
        prepared.push(holder);
    }

    let shared_for_apply = Arc::clone(shared);
    let on_prepared = Box::new(move || {
        let shared = shared_for_apply;
        let queue = shared.queue.clone();
        queue.post(Box::new(move || {
            apply_prepared_changeset(&shared, changeset, prepared);
        }));
    });
    shared.scheduler.schedule_batch_prepare(items, on_prepared);
}

/// Applies a background-prepared changeset on the calling context.
fn apply_prepared_changeset(
    shared: &Arc<ListShared>,
    changeset: Changeset,
    prepared: Vec<Arc<LayoutHolder>>,
) {
    if shared.scheduler.is_detached() {
        return;
    }
    let size_changed = {
        let mut state = shared.lock_state();
        state.prep_in_flight = false;
        let mut prepared = VecDeque::from(prepared);
        let size_changed = apply_changeset_locked(shared, &mut state, changeset, &mut prepared);
        pump_async(shared, &mut state);
        size_changed
    };
    fire_batch_applied(shared, size_changed);
}

fn handle_decision(
    shared: &Arc<ListShared>,
    state: &mut ListState,
    decision: RecomputeDecision,
) {
    match decision {
        RecomputeDecision::Now => recompute_range(shared, state),
        RecomputeDecision::NextTick => {
            let shared_clone = Arc::clone(shared);
            shared.queue.post(Box::new(move || {
                refresh_viewport_from_host(&shared_clone);
            }));
        }
        RecomputeDecision::Buffered | RecomputeDecision::Skip => {}
    }
}

/// Recomputes the range from the tracker's current span, re-deriving the
/// per-viewport estimate from the reference item when it is measured.
fn recompute_range(shared: &ListShared, state: &mut ListState) {
    if state.measured.is_none() {
        return;
    }
    let total = state.holders.len();
    if total == 0 {
        state.window = None;
        return;
    }
    ensure_range_size(shared, state);
    let reference = reference_position(shared, state);
    if shared.config.estimated_viewport_count.is_none() {
        if let (Some(measured), Some(size)) =
            (state.measured, state.holders[reference].layout_size())
        {
            let viewport = shared
                .provider
                .viewport_extent(measured.width_spec, measured.height_spec);
            state.range_size = Some(estimate_range_size(
                viewport,
                shared.provider.item_extent(size),
            ));
        }
    }
    update_window(shared, state, reference);
}

/// Re-reads the host's scroll status and visible span, feeding both through
/// the tracker. Runs on the calling-context queue for deferred recomputes.
fn refresh_viewport_from_host(shared: &Arc<ListShared>) {
    let mut state = shared.lock_state();
    let mut recompute = matches!(
        state
            .tracker
            .on_scroll_status_changed(shared.host.scroll_status()),
        RecomputeDecision::Now
    );
    let total = state.holders.len();
    if let (Some(first), Some(last)) = (
        shared.host.first_visible_position(),
        shared.host.last_visible_position(),
    ) {
        let span = ViewportSpan {
            first_visible: shared.calc.real_position(first, total),
            last_visible: shared.calc.real_position(last, total),
            first_fully_visible: shared
                .host
                .first_fully_visible_position()
                .map(|p| shared.calc.real_position(p, total))
                .unwrap_or_else(|| shared.calc.real_position(first, total)),
            last_fully_visible: shared
                .host
                .last_fully_visible_position()
                .map(|p| shared.calc.real_position(p, total))
                .unwrap_or_else(|| shared.calc.real_position(last, total)),
            total_count: total,
        };
        if state.tracker.on_viewport_changed(span) == RecomputeDecision::Now {
            recompute = true;
        }
    } else if total == 0 {
        state.window = None;
    }
    if recompute {
        recompute_range(shared, &mut state);
    }
}

/// Invokes the registered batch callback outside the state lock, exactly
/// once per committed batch.
fn fire_batch_applied(shared: &ListShared, size_changed: bool) {
    let callback = { shared.lock_state().on_batch_applied.take() };
    if let Some(mut callback) = callback {
        callback(size_changed);
        let mut state = shared.lock_state();
        if state.on_batch_applied.is_none() {
            state.on_batch_applied = Some(callback);
        }
    }
}
