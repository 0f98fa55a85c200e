// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File formats and output sinks shared by the use cases:
//
//   vocab.rs         — word ↔ id mapping built from corpus counts,
//                      saved as "word\tcount" lines. Id 0 is UNK.
//
//   word_vectors.rs  — pre-trained embeddings in the text word2vec
//                      layout, realigned to a vocabulary and
//                      turned into the reader's embedding tensor.
//
//   config_store.rs  — ReaderConfig and report JSON files.
//
//   metrics.rs       — per-example score CSV.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Vocabulary building, encoding and persistence
pub mod vocab;

/// Word vector loading, alignment and saving
pub mod word_vectors;

/// JSON config and report persistence
pub mod config_store;

/// Score CSV logger
pub mod metrics;
