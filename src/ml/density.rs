// ============================================================
// Layer 5 — Density Region Search
// ============================================================
// Built-in RegionSearch used by the min_density_hard jump.
//
// Row density is the best match score of a document row over the
// query window. Inside the glimpse window the scan looks for the
// first row that reaches the threshold, then grows the window
// while the following rows keep reaching it:
//
//   density:   .1  .2  .8  .9  .7  .1  .3
//   threshold: .5        ┌──────────┐
//   glimpse:   [────────────────────────)
//   jump:              [2, 3 rows)
//
// If no row qualifies, the jump lands just past the scanned
// window with zero length; when that is the document end, the
// controller's overflow check stops the example.

use crate::domain::location::{Location, SizePair};
use crate::domain::match_grid::MatchGrid;
use crate::domain::traits::RegionSearch;

#[derive(Debug, Clone, Copy, Default)]
pub struct DensityScan;

impl RegionSearch for DensityScan {
    fn search(
        &self,
        grid:            &MatchGrid,
        sizes:           &[SizePair],
        glimpse:         &[Location],
        min_density:     &[f32],
        min_jump_offset: usize,
    ) -> Vec<Location> {
        glimpse
            .iter()
            .enumerate()
            .map(|(i, loc)| scan_one(grid, i, sizes[i], loc, min_density[i], min_jump_offset))
            .collect()
    }
}

fn scan_one(
    grid:            &MatchGrid,
    example:         usize,
    size:            SizePair,
    loc:             &Location,
    threshold:       f32,
    min_jump_offset: usize,
) -> Location {
    let doc_len        = size.doc.min(grid.dims()[1]);
    let (start, _)     = loc.doc_window();
    let end            = loc.doc_end().min(doc_len);
    let (q_start, _)   = loc.query_window();
    let q_end          = loc.query_end();
    let dense = |row: usize| grid.row_density(example, row, q_start, q_end) >= threshold;

    match (start..end).find(|&row| dense(row)) {
        Some(first) => {
            let mut stop = first + 1;
            while stop < end && dense(stop) {
                stop += 1;
            }
            let len = (stop - first).max(min_jump_offset).min(doc_len - first);
            Location::new(first as f32, loc.q_start, len as f32, loc.q_offset)
        }
        None => Location::new(end.max(start) as f32, loc.q_start, 0.0, loc.q_offset),
    }
}

/// Per-example thresholds.
///
/// With `use_ratio` the configured value is a ratio r and the
/// threshold becomes mean + (max - mean) * r over the row
/// densities of the valid document rows.
pub fn density_thresholds(
    grid:        &MatchGrid,
    sizes:       &[SizePair],
    min_density: f32,
    use_ratio:   bool,
) -> Vec<f32> {
    if !use_ratio {
        return vec![min_density; sizes.len()];
    }
    let [_, doc_len, q_len] = grid.dims();
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let rows = size.doc.min(doc_len);
            let cols = size.query.min(q_len);
            if rows == 0 || cols == 0 {
                return min_density;
            }
            let densities: Vec<f32> = (0..rows).map(|r| grid.row_density(i, r, 0, cols)).collect();
            let mean = densities.iter().sum::<f32>() / rows as f32;
            let max  = densities.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            (max - mean) * min_density + mean
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    // One example, 7 doc rows, 2 query columns. Row densities are
    // .1 .2 .8 .9 .7 .1 .3
    fn grid() -> MatchGrid {
        let values = vec![
            0.1, 0.0,
            0.2, 0.1,
            0.0, 0.8,
            0.9, 0.2,
            0.7, 0.7,
            0.1, 0.0,
            0.0, 0.3,
        ];
        MatchGrid::new(values, [1, 7, 2]).unwrap()
    }

    fn whole_doc() -> Location {
        Location::new(0.0, 0.0, 7.0, 2.0)
    }

    #[test]
    fn test_finds_first_dense_run() {
        let out = DensityScan.search(&grid(), &[SizePair::new(7, 2)], &[whole_doc()], &[0.5], 1);
        assert_eq!(out[0], Location::new(2.0, 0.0, 3.0, 2.0));
    }

    #[test]
    fn test_min_jump_offset_widens_window() {
        let out = DensityScan.search(&grid(), &[SizePair::new(7, 2)], &[whole_doc()], &[0.85], 2);
        // only row 3 qualifies, widened to 2 rows
        assert_eq!(out[0], Location::new(3.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn test_widening_stops_at_document_end() {
        let loc = Location::new(5.0, 0.0, 2.0, 2.0);
        let out = DensityScan.search(&grid(), &[SizePair::new(7, 2)], &[loc], &[0.25], 5);
        assert_eq!(out[0], Location::new(6.0, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_no_match_skips_past_window() {
        let loc  = Location::new(0.0, 0.0, 2.0, 2.0);
        let size = SizePair::new(7, 2);
        let out  = DensityScan.search(&grid(), &[size], &[loc], &[0.5], 1);
        assert_eq!(out[0], Location::new(2.0, 0.0, 0.0, 2.0));

        // scanning to the end with nothing found overflows
        let out = DensityScan.search(&grid(), &[size], &[whole_doc()], &[5.0], 1);
        assert!(out[0].overflows(size));
    }

    #[test]
    fn test_ratio_threshold() {
        let sizes = [SizePair::new(7, 2)];
        let t = density_thresholds(&grid(), &sizes, 0.0, true);
        // ratio 0 → plain mean of the densities
        let mean = (0.1 + 0.2 + 0.8 + 0.9 + 0.7 + 0.1 + 0.3) / 7.0;
        assert!((t[0] - mean).abs() < 1e-6);

        let t = density_thresholds(&grid(), &sizes, 1.0, true);
        assert!((t[0] - 0.9).abs() < 1e-6);

        let t = density_thresholds(&grid(), &sizes, 0.4, false);
        assert_eq!(t, vec![0.4]);
    }
}
