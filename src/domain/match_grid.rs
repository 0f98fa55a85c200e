// ============================================================
// Layer 3 — Host-side Match Grid
// ============================================================
// A plain row-major copy of the batched match matrix
// [batch, doc_len, query_len]. Region search policies that scan
// scores one cell at a time read this instead of the tensor, so
// they carry no framework types and their decisions are never
// part of a gradient graph.

#[derive(Debug, Clone, PartialEq)]
pub struct MatchGrid {
    values:  Vec<f32>,
    batch:   usize,
    doc_len: usize,
    q_len:   usize,
}

impl MatchGrid {
    /// Wrap row-major values. Returns None when the length does
    /// not match the stated dimensions.
    pub fn new(values: Vec<f32>, dims: [usize; 3]) -> Option<Self> {
        let [batch, doc_len, q_len] = dims;
        if values.len() != batch * doc_len * q_len {
            return None;
        }
        Some(Self { values, batch, doc_len, q_len })
    }

    pub fn zeros(dims: [usize; 3]) -> Self {
        let [batch, doc_len, q_len] = dims;
        Self { values: vec![0.0; batch * doc_len * q_len], batch, doc_len, q_len }
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.batch, self.doc_len, self.q_len]
    }

    /// One document row of one example (all padded query columns).
    pub fn row(&self, example: usize, row: usize) -> &[f32] {
        let start = (example * self.doc_len + row) * self.q_len;
        &self.values[start..start + self.q_len]
    }

    /// Max score of `row` over the query columns [q_start, q_end).
    /// Returns NEG_INFINITY for an empty column range.
    pub fn row_density(&self, example: usize, row: usize, q_start: usize, q_end: usize) -> f32 {
        let q_end = q_end.min(self.q_len);
        if row >= self.doc_len || q_start >= q_end {
            return f32::NEG_INFINITY;
        }
        self.row(example, row)[q_start..q_end]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}
