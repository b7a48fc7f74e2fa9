//! Structural mutations and changeset application.
//!
//! Mutations arrive either immediately or as an async-queued changeset; in
//! both cases they are validated against the sequence they will apply to,
//! applied in submission order, and translated into host notifications. A
//! malformed changeset is never applied literally: it is reported and falls
//! back to a delete-all-then-insert-all reconciliation.

use std::collections::VecDeque;
use std::sync::Arc;

use ribbon_core::{HostContainer, MutationSequenceError, RenderDescriptor};
use smallvec::SmallVec;

use crate::holder::{HolderFactory, LayoutHolder};

/// One structural edit, in sequence coordinates as of its place in the
/// batch.
#[derive(Clone, Debug)]
pub enum PendingMutation {
    Insert {
        position: usize,
        descriptor: RenderDescriptor,
    },
    InsertRange {
        position: usize,
        descriptors: Vec<RenderDescriptor>,
    },
    Remove {
        position: usize,
    },
    RemoveRange {
        position: usize,
        count: usize,
    },
    Update {
        position: usize,
        descriptor: RenderDescriptor,
    },
    UpdateRange {
        position: usize,
        descriptors: Vec<RenderDescriptor>,
    },
    Move {
        from: usize,
        to: usize,
    },
}

/// A batch of mutations applied and reported atomically.
#[derive(Clone, Debug, Default)]
pub struct Changeset {
    ops: SmallVec<[PendingMutation; 4]>,
}

impl Changeset {
    pub fn push(&mut self, op: PendingMutation) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[PendingMutation] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether applying this batch could change the content size. Pure
    /// moves cannot; everything else can.
    pub fn may_change_content_size(&self) -> bool {
        self.ops
            .iter()
            .any(|op| !matches!(op, PendingMutation::Move { .. }))
    }

    /// Descriptors of the items this batch inserts, in op order. These are
    /// the "new items" whose background layout gates an async application.
    pub fn inserted_descriptors(&self) -> impl Iterator<Item = &RenderDescriptor> {
        self.ops.iter().flat_map(|op| {
            let descriptors: &[RenderDescriptor] = match op {
                PendingMutation::Insert { descriptor, .. } => std::slice::from_ref(descriptor),
                PendingMutation::InsertRange { descriptors, .. } => descriptors,
                _ => &[],
            };
            descriptors.iter()
        })
    }

    /// Checks every op against the sequence length as it would exist at
    /// that point in the batch.
    pub fn validate(&self, len: usize) -> Result<(), MutationSequenceError> {
        let mut len = len;
        let mut removed_any = false;
        for op in &self.ops {
            match op {
                PendingMutation::Insert { position, .. } => {
                    if *position > len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "insert",
                            position: *position,
                            len,
                        });
                    }
                    len += 1;
                }
                PendingMutation::InsertRange {
                    position,
                    descriptors,
                } => {
                    if *position > len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "insert_range",
                            position: *position,
                            len,
                        });
                    }
                    len += descriptors.len();
                }
                PendingMutation::Remove { position } => {
                    if *position >= len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "remove",
                            position: *position,
                            len,
                        });
                    }
                    len -= 1;
                    removed_any = true;
                }
                PendingMutation::RemoveRange { position, count } => {
                    if position.saturating_add(*count) > len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "remove_range",
                            position: *position,
                            len,
                        });
                    }
                    len -= count;
                    removed_any = true;
                }
                PendingMutation::Update { position, .. } => {
                    if *position >= len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "update",
                            position: *position,
                            len,
                        });
                    }
                }
                PendingMutation::UpdateRange {
                    position,
                    descriptors,
                } => {
                    if position.saturating_add(descriptors.len()) > len {
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "update_range",
                            position: *position,
                            len,
                        });
                    }
                }
                PendingMutation::Move { from, to } => {
                    if *from >= len || *to >= len {
                        // A move past the end after a removal in the same
                        // batch is the classic contradictory pair.
                        if removed_any {
                            return Err(MutationSequenceError::MoveOfRemovedItem {
                                from: *from,
                                to: *to,
                            });
                        }
                        return Err(MutationSequenceError::OutOfBounds {
                            op: "move",
                            position: (*from).max(*to),
                            len,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Applies a validated changeset literally.
///
/// `prepared` supplies holders for inserted items in op order (async path);
/// when exhausted, holders are created through the factory.
pub(crate) fn apply_literal(
    ops: &[PendingMutation],
    holders: &mut Vec<Arc<LayoutHolder>>,
    factory: &dyn HolderFactory,
    host: &dyn HostContainer,
    prepared: &mut VecDeque<Arc<LayoutHolder>>,
) {
    for op in ops {
        match op {
            PendingMutation::Insert {
                position,
                descriptor,
            } => {
                let holder = prepared
                    .pop_front()
                    .unwrap_or_else(|| factory.create(descriptor.clone()));
                holders.insert(*position, holder);
                host.notify_inserted(*position, 1);
            }
            PendingMutation::InsertRange {
                position,
                descriptors,
            } => {
                for (offset, descriptor) in descriptors.iter().enumerate() {
                    let holder = prepared
                        .pop_front()
                        .unwrap_or_else(|| factory.create(descriptor.clone()));
                    holders.insert(position + offset, holder);
                }
                host.notify_inserted(*position, descriptors.len());
            }
            PendingMutation::Remove { position } => {
                holders.remove(*position);
                host.notify_removed(*position, 1);
            }
            PendingMutation::RemoveRange { position, count } => {
                holders.drain(*position..position + count);
                host.notify_removed(*position, *count);
            }
            PendingMutation::Update {
                position,
                descriptor,
            } => {
                holders[*position].update_descriptor(descriptor.clone());
                host.notify_updated(*position, 1);
            }
            PendingMutation::UpdateRange {
                position,
                descriptors,
            } => {
                for (offset, descriptor) in descriptors.iter().enumerate() {
                    holders[position + offset].update_descriptor(descriptor.clone());
                }
                host.notify_updated(*position, descriptors.len());
            }
            PendingMutation::Move { from, to } => {
                // Holder identity, including any computed layout, travels
                // with the item.
                let holder = holders.remove(*from);
                holders.insert(*to, holder);
                host.notify_moved(*from, *to);
            }
        }
    }
}

/// Safe reconciliation for a malformed changeset: release every existing
/// holder (preserving transient state), then apply the batch's inserted and
/// updated descriptors in order onto the emptied sequence.
pub(crate) fn fallback_reconcile(
    ops: &[PendingMutation],
    holders: &mut Vec<Arc<LayoutHolder>>,
    factory: &dyn HolderFactory,
    host: &dyn HostContainer,
) {
    let old_len = holders.len();
    for holder in holders.drain(..) {
        holder.acquire_state_and_release();
    }
    if old_len > 0 {
        host.notify_removed(0, old_len);
    }
    for op in ops {
        match op {
            PendingMutation::Insert { descriptor, .. }
            | PendingMutation::Update { descriptor, .. } => {
                holders.push(factory.create(descriptor.clone()));
            }
            PendingMutation::InsertRange { descriptors, .. }
            | PendingMutation::UpdateRange { descriptors, .. } => {
                for descriptor in descriptors {
                    holders.push(factory.create(descriptor.clone()));
                }
            }
            _ => {}
        }
    }
    if !holders.is_empty() {
        host.notify_inserted(0, holders.len());
    }
}
