// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and the tensors the reader
// consumes.
//
// The pipeline flows in this order:
//
//   queries.tsv / corpus .txt files
//       │
//       ▼
//   loader            → reads files, skips malformed lines
//       │
//       ▼
//   TextCleaner       → cleans and tokenises raw text
//       │
//       ▼
//   Vocab (infra)     → words to token ids
//       │
//       ▼
//   ReadDataset       → encoded, padded ReadSamples
//       │
//       ▼
//   ReadBatcher       → stacks samples into a ReadBatch
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Query, sample and corpus file loaders
pub mod loader;

/// Text cleaning and word tokenisation
pub mod preprocessor;

/// ReadSample and the in-memory dataset
pub mod dataset;

/// Stacks samples into reader batches
pub mod batcher;
