//! Size specs handed to item layout computation.

/// How a single dimension is constrained during measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeMode {
    /// The measured tree must take exactly the given size.
    Exactly,
    /// The measured tree may take at most the given size.
    AtMost,
    /// The measured tree determines its own size.
    Unspecified,
}

/// A single-dimension measurement constraint.
///
/// A holder's cached layout is compatible with a new request only when the
/// specs it was computed with are *equal* to the requested ones. Equality is
/// bit-exact: modes must match and the sizes must have identical bit
/// patterns. There is no tolerance.
#[derive(Clone, Copy, Debug)]
pub struct SizeSpec {
    mode: SizeMode,
    size: f32,
}

impl SizeSpec {
    /// Creates a spec requiring exactly `size`.
    pub fn exactly(size: f32) -> Self {
        Self {
            mode: SizeMode::Exactly,
            size,
        }
    }

    /// Creates a spec allowing at most `size`.
    pub fn at_most(size: f32) -> Self {
        Self {
            mode: SizeMode::AtMost,
            size,
        }
    }

    /// Creates an unconstrained spec.
    pub fn unspecified() -> Self {
        Self {
            mode: SizeMode::Unspecified,
            size: 0.0,
        }
    }

    /// Returns the constraint mode.
    #[inline]
    pub fn mode(&self) -> SizeMode {
        self.mode
    }

    /// Returns the constraint size. Meaningless for [`SizeMode::Unspecified`].
    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Returns true if this spec puts a finite upper bound on the dimension.
    pub fn is_bounded(&self) -> bool {
        self.mode != SizeMode::Unspecified && self.size.is_finite()
    }

    /// Resolves a measured extent against this spec.
    pub fn resolve(&self, measured: f32) -> f32 {
        match self.mode {
            SizeMode::Exactly => self.size,
            SizeMode::AtMost => measured.min(self.size),
            SizeMode::Unspecified => measured,
        }
    }
}

impl PartialEq for SizeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.size.to_bits() == other.size.to_bits()
    }
}

impl Eq for SizeSpec {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_equality_is_bitwise() {
        assert_eq!(SizeSpec::exactly(100.0), SizeSpec::exactly(100.0));
        assert_ne!(SizeSpec::exactly(100.0), SizeSpec::exactly(100.1));
        assert_ne!(SizeSpec::exactly(100.0), SizeSpec::at_most(100.0));
    }

    #[test]
    fn test_unspecified_specs_are_equal() {
        assert_eq!(SizeSpec::unspecified(), SizeSpec::unspecified());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(SizeSpec::exactly(50.0).resolve(80.0), 50.0);
        assert_eq!(SizeSpec::at_most(50.0).resolve(80.0), 50.0);
        assert_eq!(SizeSpec::at_most(50.0).resolve(30.0), 30.0);
        assert_eq!(SizeSpec::unspecified().resolve(80.0), 80.0);
    }

    #[test]
    fn test_bounded() {
        assert!(SizeSpec::exactly(10.0).is_bounded());
        assert!(!SizeSpec::at_most(f32::INFINITY).is_bounded());
        assert!(!SizeSpec::unspecified().is_bounded());
    }
}
