// ============================================================
// Layer 3 — Location and Size Domain Types
// ============================================================
// A Location is the active reading window over the match matrix:
//
//           query axis →
//         ┌─────────────────────┐
//   doc   │   q_start           │
//   axis  │   ┌───q_offset──┐   │
//    ↓    │ d_start         │   │
//         │   │  d_offset   │   │
//         │   └─────────────┘   │
//         └─────────────────────┘
//
// Fields are f32 because policies may produce fractional
// positions; every consumer floors start and offset separately
// before using them as indices.
//
// A SizePair holds the valid (unpadded) lengths of one example.

use serde::{Deserialize, Serialize};

/// Valid document / query lengths of one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizePair {
    pub doc:   usize,
    pub query: usize,
}

impl SizePair {
    pub fn new(doc: usize, query: usize) -> Self {
        Self { doc, query }
    }
}

/// Rectangular window (d_start, q_start, d_offset, q_offset).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub d_start:  f32,
    pub q_start:  f32,
    pub d_offset: f32,
    pub q_offset: f32,
}

impl Location {
    /// Step 0: top-left corner, zero size.
    pub const ORIGIN: Location = Location { d_start: 0.0, q_start: 0.0, d_offset: 0.0, q_offset: 0.0 };

    /// Cheap filler window evaluated for stopped examples; the
    /// result is always discarded by the freeze rule.
    pub const FILLER: Location = Location { d_start: 1.0, q_start: 1.0, d_offset: 1.0, q_offset: 1.0 };

    pub fn new(d_start: f32, q_start: f32, d_offset: f32, q_offset: f32) -> Self {
        Self { d_start, q_start, d_offset, q_offset }
    }

    /// True when the start index has left the valid range on
    /// either axis, i.e. start > size - 1.
    pub fn overflows(&self, size: SizePair) -> bool {
        self.d_start > size.doc as f32 - 1.0 || self.q_start > size.query as f32 - 1.0
    }

    pub fn same_doc_span(&self, other: &Location) -> bool {
        self.d_start == other.d_start && self.d_offset == other.d_offset
    }

    pub fn same_query_span(&self, other: &Location) -> bool {
        self.q_start == other.q_start && self.q_offset == other.q_offset
    }

    /// (start, length) on the document axis as indices.
    pub fn doc_window(&self) -> (usize, usize) {
        (floor_index(self.d_start), floor_index(self.d_offset))
    }

    /// (start, length) on the query axis as indices.
    pub fn query_window(&self) -> (usize, usize) {
        (floor_index(self.q_start), floor_index(self.q_offset))
    }

    /// Document index one past the end of the window.
    pub fn doc_end(&self) -> usize {
        floor_index(self.d_start + self.d_offset)
    }

    pub fn query_end(&self) -> usize {
        floor_index(self.q_start + self.q_offset)
    }
}

/// Floor to a non-negative index. Negative and NaN inputs map to 0.
pub fn floor_index(value: f32) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as usize
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_on_either_axis() {
        let size = SizePair::new(5, 3);
        assert!(!Location::new(4.0, 0.0, 1.0, 3.0).overflows(size));
        assert!(Location::new(5.0, 0.0, 1.0, 3.0).overflows(size));
        assert!(Location::new(0.0, 3.0, 1.0, 1.0).overflows(size));
    }

    #[test]
    fn test_empty_document_always_overflows() {
        // size - 1 = -1, so even the origin is out of range
        assert!(Location::ORIGIN.overflows(SizePair::new(0, 4)));
    }

    #[test]
    fn test_windows_floor_independently() {
        let loc = Location::new(1.6, 0.0, 2.6, 3.0);
        assert_eq!(loc.doc_window(), (1, 2));
        // end floors the sum, not the parts
        assert_eq!(loc.doc_end(), 4);
    }

    #[test]
    fn test_span_comparison_per_axis() {
        let a = Location::new(2.0, 0.0, 1.0, 3.0);
        let b = Location::new(2.0, 1.0, 1.0, 2.0);
        assert!(a.same_doc_span(&b));
        assert!(!a.same_query_span(&b));
    }

    #[test]
    fn test_floor_index_clamps_negative() {
        assert_eq!(floor_index(-3.0), 0);
        assert_eq!(floor_index(f32::NAN), 0);
        assert_eq!(floor_index(2.99), 2);
    }
}
