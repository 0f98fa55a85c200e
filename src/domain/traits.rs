// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams where an implementation can be swapped without
// touching the code that drives it:
//
//   RegionSearch  — the density-threshold jump operator.
//                   DensityScan (ml layer) is the built-in one;
//                   tests and experiments can inject another.
//   TokenCodec    — word ↔ id mapping. Vocab implements it.
//   Persistable   — text-file round trip for Vocab and
//                   WordVectors.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::fmt::Debug;

use anyhow::Result;

use crate::domain::location::{Location, SizePair};
use crate::domain::match_grid::MatchGrid;

// ─── RegionSearch ─────────────────────────────────────────────────────────────
/// Scans a glimpse window for a sub-window whose score density
/// reaches a threshold.
///
/// The returned decision is a plain host value: it never carries
/// gradient information back into the representation pipeline.
pub trait RegionSearch: Debug + Send + Sync {
    /// One new location per example.
    ///
    /// * `glimpse`         - candidate window per example
    /// * `min_density`     - per-example density threshold
    /// * `min_jump_offset` - lower bound on the returned doc length
    fn search(
        &self,
        grid:            &MatchGrid,
        sizes:           &[SizePair],
        glimpse:         &[Location],
        min_density:     &[f32],
        min_jump_offset: usize,
    ) -> Vec<Location>;
}

// ─── TokenCodec ───────────────────────────────────────────────────────────────
/// Any component that maps tokens to integer ids and back.
pub trait TokenCodec {
    /// Unknown tokens map to the codec's UNK id.
    fn encode(&self, tokens: &[String]) -> Vec<u32>;

    fn decode(&self, ids: &[u32]) -> Vec<String>;

    fn len(&self) -> usize;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// Implementations:
///   - Vocab       → "word\tcount" per line
///   - WordVectors → "<count> <dim>" header + one vector per line
pub trait Persistable: Sized {
    fn save(&self, path: &str) -> Result<()>;

    fn load(path: &str) -> Result<Self>;
}
