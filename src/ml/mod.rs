// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// The domain layer stays framework-free: region search reads a
// host-side MatchGrid, locations are plain f32 records.
//
// What's in this layer, leaves first:
//
//   slicer.rs     — per-example windows out of a padded batch
//   glimpse.rs    — candidate next window (fix_hard, all_next_hard)
//   matching.rs   — embeddings and the doc × query match matrix
//   density.rs    — density thresholds and the DensityScan search
//   jump.rs       — sharpens a glimpse into a jump location
//   pooling.rs    — dynamic pooling index maps
//   resize.rs     — bilinear crop-and-resize
//   conv.rs       — 2-D interaction CNN and 1-D doc/query CNN
//   recurrent.rs  — GRU matcher
//   masking.rs    — length-aware stochastic keep-mask
//   represent.rs  — representation builders + location reuse
//   history.rs    — pre-allocated per-step history streams
//   aggregate.rs  — max / sum / interaction_concat + ratios
//   config.rs     — ReaderConfig → ReaderPlan resolution
//   reader.rs     — the step loop (SelectiveJumpReader)
//
// Reference: Burn Book §3 (Building Blocks)
//            Pang et al. (2016) Text Matching as Image Recognition

pub mod slicer;
pub mod glimpse;
pub mod matching;
pub mod density;
pub mod jump;
pub mod pooling;
pub mod resize;
pub mod conv;
pub mod recurrent;
pub mod masking;
pub mod represent;
pub mod history;
pub mod aggregate;
pub mod config;

/// The selective jump reader control loop
pub mod reader;
