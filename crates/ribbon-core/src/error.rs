//! Error taxonomy and the reporting collaborator.
//!
//! Configuration and mutation-conflict errors surface synchronously to the
//! caller. Layout and malformed-changeset errors are recovered locally and
//! only observable through the [`ErrorReporter`].

use std::fmt;

/// Incompatible options detected at construction. Fatal to setup; nothing
/// is built.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A manual per-viewport item count was supplied together with deriving
    /// the container's own size from the first item; the two are mutually
    /// exclusive.
    ManualRangeWithSelfMeasuringReference,
    /// The range ratio must be finite and >= 0.
    InvalidRangeRatio { ratio: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualRangeWithSelfMeasuringReference => write!(
                f,
                "a manual viewport item count cannot be combined with deriving \
                 the container size from the first item"
            ),
            Self::InvalidRangeRatio { ratio } => {
                write!(f, "range ratio must be finite and >= 0, got {ratio}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Illegal mixing of immediate and async-queued mutations. Rejected;
/// nothing is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationError {
    /// An immediate mutation was issued while async changesets were still
    /// outstanding for the same sequence.
    Conflicting { outstanding_changesets: usize },
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflicting {
                outstanding_changesets,
            } => write!(
                f,
                "immediate mutation while {outstanding_changesets} async changeset(s) \
                 are outstanding; complete the pending batch first"
            ),
        }
    }
}

impl std::error::Error for MutationError {}

/// A single item's layout computation failed. Isolated to that holder;
/// siblings are unaffected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// The item description could not be resolved into a tree.
    UnresolvedDescriptor { detail: String },
    /// The layout engine failed internally.
    Engine { detail: String },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedDescriptor { detail } => {
                write!(f, "item description could not be resolved: {detail}")
            }
            Self::Engine { detail } => write!(f, "layout engine failure: {detail}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// A changeset whose operations contradict the sequence they are applied
/// to. The batch is not applied literally; it falls back to a
/// delete-all-then-insert-all reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationSequenceError {
    /// An operation addressed a position outside the sequence as it would
    /// exist at that point in the batch.
    OutOfBounds {
        op: &'static str,
        position: usize,
        len: usize,
    },
    /// A move addressed an item a prior operation in the same batch had
    /// already removed.
    MoveOfRemovedItem { from: usize, to: usize },
}

impl fmt::Display for MutationSequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { op, position, len } => {
                write!(f, "{op} at {position} is out of bounds for length {len}")
            }
            Self::MoveOfRemovedItem { from, to } => {
                write!(f, "move {from} -> {to} addresses an already-removed item")
            }
        }
    }
}

impl std::error::Error for MutationSequenceError {}

/// An error recovered inside the engine and routed to the reporter.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportedError {
    /// A holder's layout computation failed. `position` is the holder's
    /// position at scheduling time, when still known.
    Layout {
        position: Option<usize>,
        error: LayoutError,
    },
    /// A malformed changeset triggered the fallback reconciliation.
    MutationSequence(MutationSequenceError),
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout { position: Some(p), error } => {
                write!(f, "layout of item at {p} failed: {error}")
            }
            Self::Layout { position: None, error } => write!(f, "item layout failed: {error}"),
            Self::MutationSequence(error) => write!(f, "malformed changeset: {error}"),
        }
    }
}

/// Receives errors the engine recovered from. Must be callable from both
/// contexts.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: ReportedError);
}

/// Default reporter: routes everything to the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: ReportedError) {
        log::error!("{error}");
    }
}
