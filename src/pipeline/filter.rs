//! The dimension filter: a pure predicate over decoded pixel sizes.

use serde::{Deserialize, Serialize};

/// Inclusive pixel-dimension bounds, caller-supplied.
///
/// An inverted range (`min > max` on either axis) is not an error; it simply
/// matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRange {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl FilterRange {
    pub fn new(min_width: u32, max_width: u32, min_height: u32, max_height: u32) -> Self {
        Self {
            min_width,
            max_width,
            min_height,
            max_height,
        }
    }
}

impl Default for FilterRange {
    /// The unbounded range: every image passes.
    fn default() -> Self {
        Self {
            min_width: 0,
            max_width: u32::MAX,
            min_height: 0,
            max_height: u32::MAX,
        }
    }
}

/// True iff both dimensions fall within the range, bounds inclusive.
pub fn keep(width: u32, height: u32, range: &FilterRange) -> bool {
    range.min_width <= width
        && width <= range.max_width
        && range.min_height <= height
        && height <= range.max_height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let r = FilterRange::new(300, 900, 200, 800);
        assert!(keep(300, 200, &r));
        assert!(keep(900, 800, &r));
        assert!(keep(500, 500, &r));
    }

    #[test]
    fn rejects_outside_either_axis() {
        let r = FilterRange::new(300, 900, 200, 800);
        assert!(!keep(299, 500, &r));
        assert!(!keep(901, 500, &r));
        assert!(!keep(500, 199, &r));
        assert!(!keep(500, 801, &r));
        assert!(!keep(100, 100, &r));
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let r = FilterRange::new(900, 300, 0, u32::MAX);
        assert!(!keep(300, 100, &r));
        assert!(!keep(900, 100, &r));
        assert!(!keep(600, 100, &r));
    }

    #[test]
    fn default_range_accepts_everything() {
        let r = FilterRange::default();
        assert!(keep(1, 1, &r));
        assert!(keep(u32::MAX, u32::MAX, &r));
    }
}
