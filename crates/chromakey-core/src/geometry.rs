//! Integer pixel rectangles for buffer bounds and processing windows.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, half-open: `x1 <= x < x2`, `y1 <= y < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct RectI {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl RectI {
    /// Create a new rectangle from its corners.
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle anchored at the origin. Sizes beyond `i32::MAX` saturate.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, saturate_i32(width), saturate_i32(height))
    }

    #[inline]
    pub fn width(self) -> u32 {
        span(self.x1, self.x2)
    }

    #[inline]
    pub fn height(self) -> u32 {
        span(self.y1, self.y2)
    }

    /// True when the rectangle holds no pixels.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Check if a pixel coordinate is inside the rectangle.
    #[inline]
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Check if `other` lies entirely inside this rectangle.
    /// An empty rectangle is covered by anything.
    pub fn covers(self, other: Self) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.y1 >= self.y1
                && other.x2 <= self.x2
                && other.y2 <= self.y2)
    }

    /// Split into horizontal bands of at most `rows` rows each.
    ///
    /// Bands are independent processing windows; rendering each of them
    /// produces the same pixels as rendering the whole rectangle.
    pub fn split_rows(self, rows: u32) -> Vec<Self> {
        if self.is_empty() {
            return Vec::new();
        }
        let step = rows.max(1) as i32;
        (self.y1..self.y2)
            .step_by(step as usize)
            .map(|y| Self::new(self.x1, y, self.x2, y.saturating_add(step).min(self.y2)))
            .collect()
    }
}

const fn saturate_i32(v: u32) -> i32 {
    if v > i32::MAX as u32 {
        i32::MAX
    } else {
        v as i32
    }
}

/// Length of `[lo, hi)`, 0 when inverted. Exact for the full `i32` range.
#[inline]
fn span(lo: i32, hi: i32) -> u32 {
    (i64::from(hi) - i64::from(lo)).max(0) as u32
}
