//! Layout holders: the per-item owner of a lazily computed layout.
//!
//! A holder's identity is the `Arc` it is shared through; positions shift
//! around it on insert/remove/move, and background completions find it by
//! identity, never by position. All validity/result fields live behind a
//! per-holder mutex so the calling and background contexts can both touch
//! them.

use std::sync::{Arc, Mutex, MutexGuard};

use ribbon_core::{ItemState, LayoutEngine, LayoutError, RenderDescriptor, Size, SizeSpec, SizedTree};

/// One entry in the holder sequence.
#[derive(Debug)]
pub struct LayoutHolder {
    inner: Mutex<HolderInner>,
}

#[derive(Debug)]
struct HolderInner {
    descriptor: RenderDescriptor,
    layout: Option<SizedTree>,
    is_valid: bool,
    last_width_spec: Option<SizeSpec>,
    last_height_spec: Option<SizeSpec>,
    /// Transient state preserved from an evicted tree, waiting for re-entry.
    acquired_state: Option<ItemState>,
    /// Bumped on every new spec request, invalidation, or eviction. An async
    /// result is applied only if the sequence it was issued under is still
    /// current; anything older has been superseded and is discarded.
    request_seq: u64,
    in_flight: Option<InFlightRequest>,
}

#[derive(Clone, Copy, Debug)]
struct InFlightRequest {
    seq: u64,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
}

impl LayoutHolder {
    pub fn new(descriptor: RenderDescriptor) -> Self {
        Self {
            inner: Mutex::new(HolderInner {
                descriptor,
                layout: None,
                is_valid: false,
                last_width_spec: None,
                last_height_spec: None,
                acquired_state: None,
                request_seq: 0,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HolderInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            // A panic mid-computation leaves the holder merely invalid, not
            // structurally broken.
            poisoned.into_inner()
        })
    }

    /// Returns a snapshot of the descriptor.
    pub fn descriptor(&self) -> RenderDescriptor {
        self.lock().descriptor.clone()
    }

    /// Returns whether the descriptor is sticky.
    pub fn is_sticky(&self) -> bool {
        self.lock().descriptor.is_sticky()
    }

    /// Returns whether the holder currently owns a valid layout.
    pub fn is_valid(&self) -> bool {
        self.lock().is_valid
    }

    /// Returns true iff the holder is valid and its layout was computed
    /// with exactly these specs.
    pub fn is_compatible_with(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> bool {
        let inner = self.lock();
        inner.is_valid
            && inner.last_width_spec == Some(width_spec)
            && inner.last_height_spec == Some(height_spec)
    }

    /// Returns the size of the current layout, if valid.
    pub fn layout_size(&self) -> Option<Size> {
        let inner = self.lock();
        if inner.is_valid {
            inner.layout.as_ref().map(|tree| tree.size())
        } else {
            None
        }
    }

    /// Returns whether the holder was evicted with its transient state
    /// preserved for a future re-entry.
    pub fn is_acquiring_state(&self) -> bool {
        self.lock().acquired_state.is_some()
    }

    /// Replaces the descriptor wholesale and invalidates the layout.
    pub fn update_descriptor(&self, descriptor: RenderDescriptor) {
        let mut inner = self.lock();
        inner.descriptor = descriptor;
        invalidate_locked(&mut inner);
    }

    /// Clears validity and discards the layout result. Transient state
    /// previously acquired from an eviction is kept.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        invalidate_locked(&mut inner);
    }

    /// Preserves the tree's transient state for a future re-entry, then
    /// discards the tree and clears validity.
    pub fn acquire_state_and_release(&self) {
        let mut inner = self.lock();
        if let Some(tree) = inner.layout.take() {
            inner.acquired_state = Some(tree.detach_state());
        }
        inner.is_valid = false;
        inner.in_flight = None;
        inner.request_seq = inner.request_seq.wrapping_add(1);
    }

    /// Computes the layout on the calling thread.
    ///
    /// The engine runs outside the holder lock; a request issued after this
    /// one started (spec change, eviction) wins, and this result is then
    /// discarded.
    pub fn compute_sync(
        &self,
        engine: &dyn LayoutEngine,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<Size, LayoutError> {
        let (descriptor, seq) = {
            let mut inner = self.lock();
            if compatible_locked(&inner, width_spec, height_spec) {
                // Idempotent: already valid with these exact specs.
                let size = inner
                    .layout
                    .as_ref()
                    .map(|tree| tree.size())
                    .unwrap_or_default();
                return Ok(size);
            }
            begin_request_locked(&mut inner, width_spec, height_spec);
            (inner.descriptor.clone(), inner.request_seq)
        };

        let tree = engine.compute(&descriptor, width_spec, height_spec)?;
        let size = tree.size();

        let mut inner = self.lock();
        if inner.request_seq == seq {
            apply_result_locked(&mut inner, tree);
        }
        Ok(size)
    }

    /// Registers an async computation request.
    ///
    /// Returns the request sequence to complete against, or `None` when the
    /// request is a no-op: the holder is already valid with identical specs,
    /// or an identically-specced request is already in flight.
    pub(crate) fn begin_async(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Option<u64> {
        let mut inner = self.lock();
        if compatible_locked(&inner, width_spec, height_spec) {
            return None;
        }
        if let Some(pending) = inner.in_flight {
            if pending.seq == inner.request_seq
                && pending.width_spec == width_spec
                && pending.height_spec == height_spec
            {
                return None;
            }
        }
        begin_request_locked(&mut inner, width_spec, height_spec);
        inner.in_flight = Some(InFlightRequest {
            seq: inner.request_seq,
            width_spec,
            height_spec,
        });
        Some(inner.request_seq)
    }

    /// Applies an async result. Returns false when the request was
    /// superseded and the result discarded.
    pub(crate) fn apply_async(&self, seq: u64, tree: SizedTree) -> bool {
        let mut inner = self.lock();
        if inner.request_seq != seq {
            return false;
        }
        apply_result_locked(&mut inner, tree);
        true
    }

    /// Records that an async request failed or was abandoned. The holder
    /// stays invalid.
    pub(crate) fn abandon_async(&self, seq: u64) {
        let mut inner = self.lock();
        if let Some(pending) = inner.in_flight {
            if pending.seq == seq {
                inner.in_flight = None;
            }
        }
    }
}

fn compatible_locked(inner: &HolderInner, width_spec: SizeSpec, height_spec: SizeSpec) -> bool {
    inner.is_valid
        && inner.last_width_spec == Some(width_spec)
        && inner.last_height_spec == Some(height_spec)
}

fn begin_request_locked(inner: &mut HolderInner, width_spec: SizeSpec, height_spec: SizeSpec) {
    inner.request_seq = inner.request_seq.wrapping_add(1);
    inner.last_width_spec = Some(width_spec);
    inner.last_height_spec = Some(height_spec);
    inner.is_valid = false;
    inner.layout = None;
}

fn apply_result_locked(inner: &mut HolderInner, mut tree: SizedTree) {
    if let Some(state) = inner.acquired_state.take() {
        tree.set_state(state);
    }
    inner.layout = Some(tree);
    inner.is_valid = true;
    inner.in_flight = None;
}

fn invalidate_locked(inner: &mut HolderInner) {
    inner.layout = None;
    inner.is_valid = false;
    inner.in_flight = None;
    inner.request_seq = inner.request_seq.wrapping_add(1);
}

/// Creates holders for the engine. An explicit value passed at
/// construction, so tests can observe or customize creation.
pub trait HolderFactory: Send + Sync {
    fn create(&self, descriptor: RenderDescriptor) -> Arc<LayoutHolder>;
}

/// The factory used when callers don't supply one.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHolderFactory;

impl HolderFactory for DefaultHolderFactory {
    fn create(&self, descriptor: RenderDescriptor) -> Arc<LayoutHolder> {
        Arc::new(LayoutHolder::new(descriptor))
    }
}
