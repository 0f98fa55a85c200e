// ============================================================
// Layer 4 — Read Batcher
// ============================================================
// Stacks pre-padded ReadSamples into the tensors the reader
// consumes:
//
//   Input:  N samples, docs padded to Ld, queries padded to Lq
//   Output: ReadBatch { doc_ids [N, Ld], query_ids [N, Lq],
//                       sizes [(doc_len, query_len); N] }
//
//   [s1_t1, s1_t2, ..., s1_tLd, s2_t1, ..., sN_tLd] → [N, Ld]
//
// Padding itself happens upstream; this step only checks that the
// rows are regular and that every valid length fits its row.
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::data::dataset::ReadSample;
use crate::domain::error::{ReaderError, ReaderResult};
use crate::domain::location::SizePair;

// ─── ReadBatch ────────────────────────────────────────────────────────────────
/// A batch of query/document pairs ready for the reader.
#[derive(Debug, Clone)]
pub struct ReadBatch<B: Backend> {
    /// Document token ids — shape: [batch_size, max_doc_len]
    pub doc_ids: Tensor<B, 2, Int>,

    /// Query token ids — shape: [batch_size, max_query_len]
    pub query_ids: Tensor<B, 2, Int>,

    /// Valid (unpadded) lengths per example
    pub sizes: Vec<SizePair>,
}

impl<B: Backend> ReadBatch<B> {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check the tensors against the per-example lengths.
    pub fn validate(&self) -> ReaderResult<()> {
        let [doc_rows, doc_width]     = self.doc_ids.dims();
        let [query_rows, query_width] = self.query_ids.dims();

        if doc_rows != self.sizes.len() || query_rows != self.sizes.len() {
            return Err(ReaderError::Batch(format!(
                "{} size pairs for {doc_rows} documents and {query_rows} queries",
                self.sizes.len()
            )));
        }
        if let Some((i, size)) = self
            .sizes
            .iter()
            .enumerate()
            .find(|(_, s)| s.doc > doc_width || s.query > query_width)
        {
            return Err(ReaderError::Batch(format!(
                "example {i} has lengths ({}, {}) but rows are padded to ({doc_width}, {query_width})",
                size.doc, size.query
            )));
        }
        Ok(())
    }
}

// ─── ReadBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct
/// GPU/CPU.
#[derive(Clone, Debug)]
pub struct ReadBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ReadBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Convert padded samples into a single ReadBatch.
    pub fn batch(&self, items: &[ReadSample]) -> ReaderResult<ReadBatch<B>> {
        let batch_size  = items.len();
        let doc_width   = regular_width(items.iter().map(|s| s.doc.len()), "document")?;
        let query_width = regular_width(items.iter().map(|s| s.query.len()), "query")?;

        let doc_flat: Vec<i32>   = items.iter().flat_map(|s| s.doc.iter().map(|&x| x as i32)).collect();
        let query_flat: Vec<i32> = items.iter().flat_map(|s| s.query.iter().map(|&x| x as i32)).collect();

        let batch = ReadBatch {
            doc_ids: Tensor::<B, 1, Int>::from_ints(doc_flat.as_slice(), &self.device)
                .reshape([batch_size, doc_width]),
            query_ids: Tensor::<B, 1, Int>::from_ints(query_flat.as_slice(), &self.device)
                .reshape([batch_size, query_width]),
            sizes: items.iter().map(|s| SizePair::new(s.doc_len, s.query_len)).collect(),
        };
        batch.validate()?;
        Ok(batch)
    }
}

// Every row must have the same padded width
fn regular_width(mut widths: impl Iterator<Item = usize>, what: &str) -> ReaderResult<usize> {
    let Some(first) = widths.next() else {
        return Ok(0);
    };
    match widths.find(|&w| w != first) {
        Some(other) => Err(ReaderError::Batch(format!(
            "ragged {what} rows: widths {first} and {other} in one batch"
        ))),
        None => Ok(first),
    }
}
