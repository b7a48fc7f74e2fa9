//! Contracts and primitives for the Ribbon windowing engine.
//!
//! This crate holds everything the engine in `ribbon-window` shares with
//! its collaborators: size specs, render descriptors, sized trees, the
//! layout-engine / spec-provider / host-container traits, the two
//! schedulable contexts, and the error taxonomy.

mod descriptor;
mod engine;
mod error;
mod executor;
mod host;
mod size_spec;
mod tree;

pub use descriptor::{AttributeValue, DescriptorKind, RenderDescriptor};
pub use engine::{AxisSpecProvider, LayoutEngine, Orientation, SpecProvider};
pub use error::{
    ConfigError, ErrorReporter, LayoutError, LogReporter, MutationError, MutationSequenceError,
    ReportedError,
};
pub use executor::{BackgroundExecutor, Task, TaskExecutor, TaskQueue};
pub use host::{HostContainer, ScrollStatus};
pub use size_spec::{SizeMode, SizeSpec};
pub use tree::{ItemState, NodeIdVec, Size, SizedTree};
