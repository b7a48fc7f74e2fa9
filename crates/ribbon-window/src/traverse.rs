//! Traversal strategies ordering background layout work.
//!
//! A traversal is a pure, finite, restartable function of
//! `(start, end, first_visible, last_visible)`: identical inputs yield
//! identical sequences, which the deterministic tests rely on.

/// How background work over a window is ordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalStrategy {
    /// `start..end` in increasing order.
    #[default]
    Sequential,
    /// Centered expansion from the visible span's midpoint, alternately one
    /// step below then one step above, lower index first, then whatever
    /// remains of either side. Front-loads work nearest to what the user
    /// already sees.
    Bidirectional,
}

/// Creates the iteration order for `strategy` over `[start, end)`.
pub fn traverse(
    strategy: TraversalStrategy,
    start: usize,
    end: usize,
    first_visible: usize,
    last_visible: usize,
) -> Traversal {
    match strategy {
        TraversalStrategy::Sequential => Traversal::Sequential(start..end),
        TraversalStrategy::Bidirectional => Traversal::Bidirectional(Bidirectional::new(
            start,
            end,
            first_visible,
            last_visible,
        )),
    }
}

/// Iterator over window positions in strategy order.
#[derive(Clone, Debug)]
pub enum Traversal {
    Sequential(std::ops::Range<usize>),
    Bidirectional(Bidirectional),
}

impl Iterator for Traversal {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::Sequential(range) => range.next(),
            Self::Bidirectional(bidi) => bidi.next(),
        }
    }
}

/// State of a centered-expansion traversal.
#[derive(Clone, Debug)]
pub struct Bidirectional {
    start: usize,
    end: usize,
    pivot: Option<usize>,
    next_low: Option<usize>,
    next_high: usize,
    low_turn: bool,
}

impl Bidirectional {
    fn new(start: usize, end: usize, first_visible: usize, last_visible: usize) -> Self {
        if start >= end {
            return Self {
                start,
                end,
                pivot: None,
                next_low: None,
                next_high: end,
                low_turn: true,
            };
        }
        let mid = if last_visible >= first_visible {
            // Integer midpoint of the visible span; lands on the lower
            // index when the span has even length.
            first_visible + (last_visible - first_visible) / 2
        } else {
            start
        };
        Self {
            start,
            end,
            pivot: Some(mid.clamp(start, end - 1)),
            next_low: None,
            next_high: end,
            low_turn: true,
        }
    }
}

impl Iterator for Bidirectional {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if let Some(pivot) = self.pivot.take() {
            self.next_low = if pivot > self.start {
                Some(pivot - 1)
            } else {
                None
            };
            self.next_high = pivot + 1;
            self.low_turn = true;
            return Some(pivot);
        }
        for prefer_low in [self.low_turn, !self.low_turn] {
            if prefer_low {
                if let Some(low) = self.next_low {
                    self.next_low = if low > self.start { Some(low - 1) } else { None };
                    self.low_turn = false;
                    return Some(low);
                }
            } else if self.next_high < self.end {
                let high = self.next_high;
                self.next_high += 1;
                self.low_turn = true;
                return Some(high);
            }
        }
        None
    }
}
