//! Render descriptors: the lightweight per-item description.
//!
//! A descriptor is all the engine knows about an item that does not hold a
//! materialized layout. Descriptors are immutable; an "update" replaces the
//! descriptor wholesale and invalidates whatever layout was computed from
//! the old one.

use rustc_hash::FxHashMap;

/// Whether an item is produced by the declarative component pipeline or
/// wraps a host view directly.
///
/// Resolved once at descriptor creation and carried as data; nothing
/// downstream re-inspects the item to find out which it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Item content is computed by the layout engine.
    Component,
    /// Item content wraps a host-provided view; the layout engine only
    /// measures its box.
    View,
}

/// A caller-supplied attribute value attached to a descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Immutable description of one item in the collection.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderDescriptor {
    kind: DescriptorKind,
    span_size: u32,
    is_sticky: bool,
    is_full_span: bool,
    custom_attributes: FxHashMap<String, AttributeValue>,
}

impl RenderDescriptor {
    /// Creates a component-backed descriptor.
    pub fn component() -> Self {
        Self::new(DescriptorKind::Component)
    }

    /// Creates a view-backed descriptor.
    pub fn view() -> Self {
        Self::new(DescriptorKind::View)
    }

    fn new(kind: DescriptorKind) -> Self {
        Self {
            kind,
            span_size: 1,
            is_sticky: false,
            is_full_span: false,
            custom_attributes: FxHashMap::default(),
        }
    }

    /// Sets the number of layout spans the item occupies. Clamped to >= 1.
    pub fn with_span_size(mut self, span_size: u32) -> Self {
        self.span_size = span_size.max(1);
        self
    }

    /// Marks the item sticky: once computed it is exempt from window
    /// eviction.
    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.is_sticky = sticky;
        self
    }

    /// Marks the item as spanning the full cross axis.
    pub fn with_full_span(mut self, full_span: bool) -> Self {
        self.is_full_span = full_span;
        self
    }

    /// Attaches a caller-defined attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.custom_attributes.insert(key.into(), value);
        self
    }

    /// Returns the descriptor kind.
    #[inline]
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Returns the span size (always >= 1).
    #[inline]
    pub fn span_size(&self) -> u32 {
        self.span_size
    }

    /// Returns whether the item is sticky.
    #[inline]
    pub fn is_sticky(&self) -> bool {
        self.is_sticky
    }

    /// Returns whether the item spans the full cross axis.
    #[inline]
    pub fn is_full_span(&self) -> bool {
        self.is_full_span
    }

    /// Looks up a caller-defined attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.custom_attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = RenderDescriptor::component();
        assert_eq!(d.kind(), DescriptorKind::Component);
        assert_eq!(d.span_size(), 1);
        assert!(!d.is_sticky());
        assert!(!d.is_full_span());
    }

    #[test]
    fn test_span_size_clamped() {
        let d = RenderDescriptor::view().with_span_size(0);
        assert_eq!(d.span_size(), 1);
    }

    #[test]
    fn test_attributes() {
        let d = RenderDescriptor::component()
            .with_attribute("id", AttributeValue::Int(7))
            .with_attribute("label", AttributeValue::Str("row".into()));
        assert_eq!(d.attribute("id"), Some(&AttributeValue::Int(7)));
        assert_eq!(d.attribute("missing"), None);
    }
}
