//! Range window math.
//!
//! The window is the span of positions guaranteed to (eventually) hold
//! valid layouts: the estimated per-viewport span around the reference
//! index, padded on both sides by `range_size * range_ratio`. In circular
//! mode the span lives in virtual (unwrapped) space and membership wraps
//! modulo the real item count.

use ribbon_core::ConfigError;

/// Total item count reported to the host in circular mode, so scrolling
/// never reaches an edge in either direction.
pub const CIRCULAR_COUNT_SENTINEL: usize = i32::MAX as usize;

/// Viewport extents beyond this are treated as unbounded.
const MAX_REASONABLE_VIEWPORT: f32 = 100_000.0;

/// Per-viewport item count assumed when the viewport is unbounded.
const UNBOUNDED_VIEWPORT_ITEM_COUNT: usize = 20;

/// Estimates how many items fit one viewport from the measured reference
/// item, falling back to a fixed count when the viewport is unbounded or
/// the reference item has no extent.
pub fn estimate_range_size(viewport_extent: f32, item_extent: f32) -> usize {
    if viewport_extent.is_infinite() || viewport_extent > MAX_REASONABLE_VIEWPORT {
        log::warn!(
            "unbounded viewport extent ({viewport_extent}); assuming {UNBOUNDED_VIEWPORT_ITEM_COUNT} \
             items per viewport. Consider constraining the container on its scroll axis."
        );
        return UNBOUNDED_VIEWPORT_ITEM_COUNT;
    }
    if item_extent <= 0.0 {
        log::warn!(
            "reference item has no extent; assuming {UNBOUNDED_VIEWPORT_ITEM_COUNT} items per viewport"
        );
        return UNBOUNDED_VIEWPORT_ITEM_COUNT;
    }
    ((viewport_extent / item_extent).ceil() as usize).max(1)
}

/// An inclusive span of positions that should hold valid layouts.
///
/// `start`/`end` are virtual coordinates: in circular mode they may lie
/// outside `[0, total)` and wrap on access; otherwise they are clamped at
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeWindow {
    start: i64,
    end: i64,
    total: usize,
    circular: bool,
}

impl RangeWindow {
    /// Returns whether the real position is inside the window.
    pub fn contains(&self, position: usize) -> bool {
        if self.total == 0 || position >= self.total {
            return false;
        }
        let p = position as i64;
        if !self.circular {
            return p >= self.start && p <= self.end;
        }
        let total = self.total as i64;
        let len = self.end - self.start + 1;
        if len >= total {
            return true;
        }
        (p - self.start).rem_euclid(total) < len
    }

    /// Number of distinct positions in the window.
    pub fn len(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.end - self.start + 1).max(0) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real position of the window's first (virtual) slot.
    pub fn first(&self) -> usize {
        if self.total == 0 {
            0
        } else if self.circular {
            self.start.rem_euclid(self.total as i64) as usize
        } else {
            self.start as usize
        }
    }

    /// Iterates the window's real positions in ascending virtual order.
    pub fn positions(&self) -> Positions {
        Positions {
            current: self.start,
            end: self.end,
            total: self.total as i64,
            circular: self.circular,
        }
    }
}

/// Iterator over a window's real positions.
#[derive(Clone, Debug)]
pub struct Positions {
    current: i64,
    end: i64,
    total: i64,
    circular: bool,
}

impl Iterator for Positions {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.total == 0 || self.current > self.end {
            return None;
        }
        let virtual_pos = self.current;
        self.current += 1;
        let real = if self.circular {
            virtual_pos.rem_euclid(self.total)
        } else {
            virtual_pos
        };
        Some(real as usize)
    }
}

/// Derives range windows from a reference index and the estimated
/// per-viewport item count.
#[derive(Clone, Copy, Debug)]
pub struct RangeCalculator {
    range_ratio: f32,
    circular: bool,
}

impl RangeCalculator {
    /// Creates a calculator. The ratio must be finite and >= 0.
    pub fn new(range_ratio: f32, circular: bool) -> Result<Self, ConfigError> {
        if !range_ratio.is_finite() || range_ratio < 0.0 {
            return Err(ConfigError::InvalidRangeRatio { ratio: range_ratio });
        }
        Ok(Self {
            range_ratio,
            circular,
        })
    }

    #[inline]
    pub fn is_circular(&self) -> bool {
        self.circular
    }

    /// Extra look-ahead/look-behind span on each side of the viewport span.
    pub fn layout_range_size(&self, range_size: usize) -> usize {
        (range_size as f32 * self.range_ratio).round() as usize
    }

    /// Computes the window around `reference` for `total` items.
    pub fn window(&self, reference: usize, range_size: usize, total: usize) -> RangeWindow {
        if total == 0 {
            return RangeWindow {
                start: 0,
                end: -1,
                total: 0,
                circular: self.circular,
            };
        }
        let reference = reference.min(total - 1) as i64;
        let layout_range = self.layout_range_size(range_size) as i64;
        let raw_start = reference - layout_range;
        let raw_end = reference + range_size as i64 + layout_range;
        if self.circular {
            // Cap the virtual span at one full revolution so positions()
            // never yields duplicates.
            let len = (raw_end - raw_start + 1).min(total as i64);
            RangeWindow {
                start: raw_start,
                end: raw_start + len - 1,
                total,
                circular: true,
            }
        } else {
            RangeWindow {
                start: raw_start.max(0),
                end: raw_end.min(total as i64 - 1),
                total,
                circular: false,
            }
        }
    }

    /// Item count to report to the host container.
    pub fn total_for_host(&self, real_total: usize) -> usize {
        if self.circular && real_total >= 1 {
            CIRCULAR_COUNT_SENTINEL
        } else {
            real_total
        }
    }

    /// Maps a host-reported position into real index space.
    pub fn real_position(&self, position: usize, total: usize) -> usize {
        if self.circular && total > 0 {
            position % total
        } else {
            position
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(ratio: f32) -> RangeCalculator {
        RangeCalculator::new(ratio, false).unwrap()
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        assert!(RangeCalculator::new(-0.5, false).is_err());
        assert!(RangeCalculator::new(f32::NAN, false).is_err());
    }

    #[test]
    fn test_window_spans_reference_plus_padding() {
        // range_size 3, ratio 2.0 -> padding 6 each side.
        let window = calc(2.0).window(0, 3, 30);
        for offset in 0..=9 {
            assert!(window.contains(offset), "offset {offset} should be valid");
        }
        assert!(!window.contains(10));
    }

    #[test]
    fn test_window_clamped_at_edges() {
        let window = calc(1.0).window(2, 4, 8);
        // [2-4, 2+4+4] clamped to [0, 7].
        assert_eq!(window.positions().collect::<Vec<_>>(), (0..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_reference_clamped_to_total() {
        let window = calc(0.0).window(100, 2, 5);
        assert!(window.contains(4));
        assert!(!window.contains(0));
    }

    #[test]
    fn test_empty_total() {
        let window = calc(2.0).window(0, 3, 0);
        assert!(window.is_empty());
        assert!(!window.contains(0));
        assert_eq!(window.positions().count(), 0);
    }

    #[test]
    fn test_circular_window_wraps() {
        let calc = RangeCalculator::new(0.0, true).unwrap();
        let window = calc.window(9, 3, 10);
        // Virtual [9, 12] wraps to {9, 0, 1, 2}.
        assert_eq!(window.positions().collect::<Vec<_>>(), vec![9, 0, 1, 2]);
        assert!(window.contains(9));
        assert!(window.contains(0));
        assert!(window.contains(2));
        assert!(!window.contains(5));
    }

    #[test]
    fn test_circular_window_backward_wrap() {
        let calc = RangeCalculator::new(1.0, true).unwrap();
        let window = calc.window(0, 2, 10);
        // Virtual [-2, 4] wraps to {8, 9, 0, 1, 2, 3, 4}.
        assert_eq!(
            window.positions().collect::<Vec<_>>(),
            vec![8, 9, 0, 1, 2, 3, 4]
        );
        assert!(window.contains(8));
        assert!(!window.contains(6));
    }

    #[test]
    fn test_circular_span_capped_at_one_revolution() {
        let calc = RangeCalculator::new(4.0, true).unwrap();
        let window = calc.window(0, 3, 5);
        assert_eq!(window.len(), 5);
        let mut positions = window.positions().collect::<Vec<_>>();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sentinel_total() {
        let calc = RangeCalculator::new(2.0, true).unwrap();
        assert_eq!(calc.total_for_host(1), CIRCULAR_COUNT_SENTINEL);
        assert_eq!(calc.total_for_host(500), CIRCULAR_COUNT_SENTINEL);
        assert_eq!(calc.total_for_host(0), 0);

        let flat = RangeCalculator::new(2.0, false).unwrap();
        assert_eq!(flat.total_for_host(500), 500);
    }

    #[test]
    fn test_estimate_range_size() {
        assert_eq!(estimate_range_size(300.0, 100.0), 3);
        assert_eq!(estimate_range_size(301.0, 100.0), 4);
        assert_eq!(estimate_range_size(50.0, 100.0), 1);
    }

    #[test]
    fn test_estimate_range_size_unbounded_viewport_falls_back() {
        assert_eq!(estimate_range_size(f32::INFINITY, 100.0), 20);
        assert_eq!(estimate_range_size(200_000.0, 100.0), 20);
        assert_eq!(estimate_range_size(300.0, 0.0), 20);
    }
}
