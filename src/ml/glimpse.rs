// ============================================================
// Layer 5 — Glimpse Policy
// ============================================================
// Proposes the next candidate window g_{t+1} from the last jump
// location j_t. Pure function of the location and the valid
// sizes; no scores are read.
//
//   fix_hard       [start, start + min(size, remaining))
//   all_next_hard  [start, doc_len)
//
// where start = floor(d_start + d_offset) of the last jump, and
// the query window is always the whole valid query.

use crate::domain::location::{floor_index, Location, SizePair};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlimpsePolicy {
    /// Fixed-size forward scan window.
    FixHard { size: usize },
    /// Everything from the jump point to the end of the document.
    AllNextHard,
}

impl GlimpsePolicy {
    pub fn propose(&self, sizes: &[SizePair], locations: &[Location]) -> Vec<Location> {
        sizes
            .iter()
            .zip(locations)
            .map(|(size, loc)| self.propose_one(*size, loc))
            .collect()
    }

    fn propose_one(&self, size: SizePair, loc: &Location) -> Location {
        let start     = floor_index(loc.d_start + loc.d_offset) as i64;
        let remaining = size.doc as i64 - start;
        let d_offset  = match self {
            GlimpsePolicy::FixHard { size: fixed } => remaining.min(*fixed as i64),
            GlimpsePolicy::AllNextHard => remaining,
        };
        // A negative offset only happens past the end; the caller
        // sees the start overflow and freezes the example anyway.
        Location::new(start as f32, 0.0, d_offset as f32, size.query as f32)
    }
}
