//! Collaborator traits for layout computation.
//!
//! The engine that turns a descriptor into a sized tree, and the axis
//! policy that derives child specs and viewport estimates, are both external
//! collaborators. Ribbon only depends on these contracts.

use crate::descriptor::RenderDescriptor;
use crate::error::LayoutError;
use crate::size_spec::SizeSpec;
use crate::tree::{Size, SizedTree};

/// Computes one item's concrete layout.
///
/// Implementations may be slow and must be safely callable from the
/// background context.
pub trait LayoutEngine: Send + Sync {
    /// Computes a sized tree for `descriptor` under the given specs.
    fn compute(
        &self,
        descriptor: &RenderDescriptor,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<SizedTree, LayoutError>;
}

/// Scroll axis of the hosting container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Derives child measurement specs from container specs, and maps sizes to
/// main-axis extents for range estimation.
pub trait SpecProvider: Send + Sync {
    /// Returns the `(width, height)` specs an item should be measured with,
    /// given the container's own specs.
    fn child_specs(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        descriptor: &RenderDescriptor,
    ) -> (SizeSpec, SizeSpec);

    /// Returns the container's main-axis extent under the given specs.
    /// Infinite when the container is unbounded on its scroll axis.
    fn viewport_extent(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> f32;

    /// Returns the main-axis extent of a measured item size.
    fn item_extent(&self, size: Size) -> f32;

    /// Resolves the container's own size from its specs, the measured
    /// reference item, and the estimated total content extent.
    fn container_size(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        reference: Size,
        content_extent: f32,
    ) -> Size;
}

/// A [`SpecProvider`] for plain vertical or horizontal lists: the cross axis
/// inherits the container spec, the scroll axis is unconstrained.
#[derive(Clone, Copy, Debug)]
pub struct AxisSpecProvider {
    orientation: Orientation,
}

impl AxisSpecProvider {
    pub fn vertical() -> Self {
        Self {
            orientation: Orientation::Vertical,
        }
    }

    pub fn horizontal() -> Self {
        Self {
            orientation: Orientation::Horizontal,
        }
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

impl SpecProvider for AxisSpecProvider {
    fn child_specs(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        _descriptor: &RenderDescriptor,
    ) -> (SizeSpec, SizeSpec) {
        match self.orientation {
            Orientation::Vertical => (width_spec, SizeSpec::unspecified()),
            Orientation::Horizontal => (SizeSpec::unspecified(), height_spec),
        }
    }

    fn viewport_extent(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> f32 {
        let spec = match self.orientation {
            Orientation::Vertical => height_spec,
            Orientation::Horizontal => width_spec,
        };
        if spec.is_bounded() {
            spec.size()
        } else {
            f32::INFINITY
        }
    }

    fn item_extent(&self, size: Size) -> f32 {
        match self.orientation {
            Orientation::Vertical => size.height,
            Orientation::Horizontal => size.width,
        }
    }

    fn container_size(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        reference: Size,
        content_extent: f32,
    ) -> Size {
        match self.orientation {
            Orientation::Vertical => Size::new(
                width_spec.resolve(reference.width),
                height_spec.resolve(content_extent),
            ),
            Orientation::Horizontal => Size::new(
                width_spec.resolve(content_extent),
                height_spec.resolve(reference.height),
            ),
        }
    }
}
