//! Layout scheduling across the two contexts.
//!
//! The scheduler owns the engine, the background executor, the reporter,
//! and the teardown flag. Synchronous computation runs on the calling
//! thread; everything else is enqueued and completes against holder
//! identity, so index shifts during flight are harmless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ribbon_core::{
    ErrorReporter, LayoutEngine, LayoutError, ReportedError, Size, SizeSpec, SpecProvider, Task,
    TaskExecutor,
};
use web_time::{Duration, Instant};

use crate::holder::LayoutHolder;

/// Time budget for one synchronous fill-viewport pass. Bounds worst-case
/// blocking of the calling thread when items are slow to compute.
const FILL_TIME_BUDGET: Duration = Duration::from_millis(50);

/// Hard cap on items measured by one fill-viewport pass. Prevents runaway
/// loops when items have zero or near-zero extent.
const MAX_FILL_ITEMS: usize = 500;

/// A new-item layout to compute before an async changeset applies.
pub(crate) struct BatchPrepareItem {
    pub holder: Arc<LayoutHolder>,
    pub width_spec: SizeSpec,
    pub height_spec: SizeSpec,
}

/// Issues sync and async layout against holders.
pub(crate) struct LayoutScheduler {
    engine: Arc<dyn LayoutEngine>,
    executor: Arc<dyn TaskExecutor>,
    reporter: Arc<dyn ErrorReporter>,
    closed: Arc<AtomicBool>,
}

impl LayoutScheduler {
    pub fn new(
        engine: Arc<dyn LayoutEngine>,
        executor: Arc<dyn TaskExecutor>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            engine,
            executor,
            reporter,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops dispatching new async work. In-flight computations finish and
    /// drop their results.
    pub fn detach(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Computes one holder's layout on the calling thread. Failures are
    /// reported and the holder stays invalid.
    pub fn compute_sync(
        &self,
        position: usize,
        holder: &LayoutHolder,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<Size, LayoutError> {
        match holder.compute_sync(self.engine.as_ref(), width_spec, height_spec) {
            Ok(size) => Ok(size),
            Err(error) => {
                self.reporter.report(ReportedError::Layout {
                    position: Some(position),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Enqueues one holder's layout on the background context. Returns
    /// false when nothing was scheduled (already compatible, duplicate
    /// request, or detached).
    pub fn schedule_async(
        &self,
        position: usize,
        holder: &Arc<LayoutHolder>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> bool {
        if self.is_detached() {
            return false;
        }
        let Some(seq) = holder.begin_async(width_spec, height_spec) else {
            return false;
        };
        let holder = Arc::clone(holder);
        let engine = Arc::clone(&self.engine);
        let reporter = Arc::clone(&self.reporter);
        let closed = Arc::clone(&self.closed);
        self.executor.execute(Box::new(move || {
            let descriptor = holder.descriptor();
            match engine.compute(&descriptor, width_spec, height_spec) {
                Ok(tree) => {
                    if closed.load(Ordering::Acquire) {
                        holder.abandon_async(seq);
                        return;
                    }
                    if !holder.apply_async(seq, tree) {
                        log::trace!("discarding superseded layout for item at {position}");
                    }
                }
                Err(error) => {
                    holder.abandon_async(seq);
                    if !closed.load(Ordering::Acquire) {
                        reporter.report(ReportedError::Layout {
                            position: Some(position),
                            error,
                        });
                    }
                }
            }
        }));
        true
    }

    /// Computes the layouts of an async changeset's new items on the
    /// background context, then runs `on_prepared` (unless detached by
    /// then).
    pub fn schedule_batch_prepare(&self, items: Vec<BatchPrepareItem>, on_prepared: Task) {
        if self.is_detached() {
            return;
        }
        let engine = Arc::clone(&self.engine);
        let reporter = Arc::clone(&self.reporter);
        let closed = Arc::clone(&self.closed);
        self.executor.execute(Box::new(move || {
            for item in items {
                let Some(seq) = item.holder.begin_async(item.width_spec, item.height_spec) else {
                    continue;
                };
                let descriptor = item.holder.descriptor();
                match engine.compute(&descriptor, item.width_spec, item.height_spec) {
                    Ok(tree) => {
                        item.holder.apply_async(seq, tree);
                    }
                    Err(error) => {
                        item.holder.abandon_async(seq);
                        reporter.report(ReportedError::Layout {
                            position: None,
                            error,
                        });
                    }
                }
            }
            if !closed.load(Ordering::Acquire) {
                on_prepared();
            }
        }));
    }

    /// Synchronously measures successive items until the viewport is full.
    ///
    /// Measures holders from `first` while the accumulated extent is less
    /// than `viewport_extent`, so the item crossing the boundary is
    /// included. Returns the accumulated extent. Failed items are reported
    /// and contribute nothing.
    pub fn fill_viewport_sync(
        &self,
        holders: &[Arc<LayoutHolder>],
        provider: &dyn SpecProvider,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        first: usize,
        viewport_extent: f32,
        initial_extent: f32,
    ) -> f32 {
        let start_time = Instant::now();
        let mut filled = initial_extent;
        let mut position = first;
        let mut measured = 0usize;

        while position < holders.len() && filled < viewport_extent {
            if measured >= MAX_FILL_ITEMS {
                log::warn!(
                    "fill-viewport cap ({MAX_FILL_ITEMS}) reached with {:.0}px unfilled; \
                     viewport may be under-filled",
                    viewport_extent - filled
                );
                break;
            }
            if start_time.elapsed() > FILL_TIME_BUDGET {
                log::warn!(
                    "fill-viewport exceeded time budget ({FILL_TIME_BUDGET:?}) at item {position}; \
                     stopping early"
                );
                break;
            }
            let holder = &holders[position];
            let descriptor = holder.descriptor();
            let (child_w, child_h) = provider.child_specs(width_spec, height_spec, &descriptor);
            if let Ok(size) = self.compute_sync(position, holder, child_w, child_h) {
                filled += provider.item_extent(size);
            }
            measured += 1;
            position += 1;
        }
        filled
    }
}
