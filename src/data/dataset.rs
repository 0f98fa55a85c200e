// ============================================================
// Layer 4 — Read Dataset
// ============================================================
// One query/document pair, already encoded and padded, plus the
// in-memory dataset that serves them to the scorer in order.
//
// The JSON shape of one sample:
//
//   { "id": "q1-d7", "query": [4, 9, 0], "query_len": 2,
//     "doc": [3, 5, 8, 1, 0, 0], "doc_len": 4 }
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One encoded query/document pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadSample {
    /// Free-form identifier carried into the score log
    #[serde(default)]
    pub id: String,

    /// Padded query token ids
    pub query: Vec<u32>,
    pub query_len: usize,

    /// Padded document token ids
    pub doc: Vec<u32>,
    pub doc_len: usize,
}

pub struct ReadDataset {
    samples: Vec<ReadSample>,
}

impl ReadDataset {
    pub fn new(samples: Vec<ReadSample>) -> Self {
        Self { samples }
    }

    /// Consecutive chunks of at most `batch_size` samples.
    pub fn chunks(&self, batch_size: usize) -> impl Iterator<Item = &[ReadSample]> {
        self.samples.chunks(batch_size.max(1))
    }
}

impl Dataset<ReadSample> for ReadDataset {
    fn get(&self, index: usize) -> Option<ReadSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
