// ============================================================
// Layer 5 — Jump Policy
// ============================================================
// Sharpens a glimpse window g_{t+1} into the definite jump
// location j_{t+1}.
//
//   max_hard          single row with the largest |score|
//   min_density_hard  RegionSearch over the glimpse window
//   all               the glimpse window itself
//   test              one-row step, for exercising the loop
//
// Offset truncation (max_jump_offset / max_jump_offset2) is
// applied afterwards by the controller, not here.

use std::sync::Arc;

use burn::prelude::*;

use crate::domain::location::{Location, SizePair};
use crate::domain::match_grid::MatchGrid;
use crate::domain::traits::RegionSearch;
use crate::ml::matching::host_grid;
use crate::ml::slicer::batch_slice;

#[derive(Debug, Clone)]
pub enum JumpPolicy {
    MaxHard,
    MinDensityHard {
        search:          Arc<dyn RegionSearch>,
        min_jump_offset: usize,
    },
    All,
    Test,
}

/// Read-only inputs shared by every jump variant.
pub struct JumpInput<'a, B: Backend> {
    pub matrix:     &'a Tensor<B, 3>,
    pub grid:       Option<&'a MatchGrid>,
    pub sizes:      &'a [SizePair],
    pub thresholds: &'a [f32],
}

impl JumpPolicy {
    pub fn jump<B: Backend>(&self, input: &JumpInput<'_, B>, glimpse: &[Location]) -> Vec<Location> {
        match self {
            JumpPolicy::MaxHard => max_row_jump(input.matrix, glimpse),
            JumpPolicy::MinDensityHard { search, min_jump_offset } => {
                let owned;
                let grid = match input.grid {
                    Some(grid) => grid,
                    None => {
                        owned = host_grid(input.matrix);
                        &owned
                    }
                };
                search.search(grid, input.sizes, glimpse, input.thresholds, *min_jump_offset)
            }
            JumpPolicy::All => glimpse.to_vec(),
            JumpPolicy::Test => glimpse
                .iter()
                .map(|g| {
                    Location::new(g.d_start + g.q_start.min(1.0), g.q_start, 1.0, g.q_offset)
                })
                .collect(),
        }
    }
}

/// Pick the row with the largest absolute score inside each
/// example's own glimpse window. Ties go to the lowest row.
fn max_row_jump<B: Backend>(matrix: &Tensor<B, 3>, glimpse: &[Location]) -> Vec<Location> {
    let windows: Vec<(usize, usize)> = glimpse.iter().map(Location::doc_window).collect();
    let starts:  Vec<usize> = windows.iter().map(|w| w.0).collect();
    let widths:  Vec<usize> = windows.iter().map(|w| w.1).collect();
    let width = widths.iter().copied().max().unwrap_or(0);

    let row_max: Vec<f32> = if width == 0 {
        Vec::new()
    } else {
        // [bs, width, q_len] → [bs, width, 1]
        batch_slice(matrix.clone(), &starts, &widths, 0.0)
            .abs()
            .max_dim(2)
            .into_data()
            .iter::<f32>()
            .collect()
    };

    glimpse
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let own  = &row_max[(i * width).min(row_max.len())..(i * width + widths[i]).min(row_max.len())];
            let best = first_argmax(own);
            Location::new((starts[i] + best) as f32, g.q_start, 1.0, g.q_offset)
        })
        .collect()
}

/// Index of the first maximum; 0 for an empty slice.
pub fn first_argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::density::DensityScan;
    use crate::ml::test_util::{matrix, TestBackend};

    fn sizes() -> Vec<SizePair> {
        vec![SizePair::new(4, 2), SizePair::new(4, 2)]
    }

    // Example 0 rows |max|: 0.1, 0.9, -3.0 (abs 3), 0.2
    // Example 1 rows |max|: 0.5, 0.5, 0.5, 0.5 (all tied)
    fn scores() -> Tensor<TestBackend, 3> {
        matrix(
            vec![
                0.1, 0.0,
                0.9, 0.2,
                -3.0, 1.0,
                0.2, 0.1,
                0.5, 0.5,
                0.5, 0.1,
                0.0, 0.5,
                0.5, 0.5,
            ],
            [2, 4, 2],
        )
    }

    fn run(policy: &JumpPolicy, glimpse: &[Location]) -> Vec<Location> {
        let matrix = scores();
        let sizes  = sizes();
        let input  = JumpInput { matrix: &matrix, grid: None, sizes: &sizes, thresholds: &[0.4, 0.4] };
        policy.jump(&input, glimpse)
    }

    #[test]
    fn test_max_hard_picks_largest_absolute_row() {
        let glimpse = [Location::new(0.0, 0.0, 4.0, 2.0), Location::new(0.0, 0.0, 4.0, 2.0)];
        let out = run(&JumpPolicy::MaxHard, &glimpse);
        assert_eq!(out[0], Location::new(2.0, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_max_hard_ties_go_to_first_row() {
        let glimpse = [Location::new(0.0, 0.0, 1.0, 2.0), Location::new(1.0, 0.0, 3.0, 2.0)];
        let out = run(&JumpPolicy::MaxHard, &glimpse);
        assert_eq!(out[1], Location::new(1.0, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_max_hard_ignores_rows_outside_own_window() {
        // example 0 only looks at rows 0..2; row 2 holds the global max
        let glimpse = [Location::new(0.0, 0.0, 2.0, 2.0), Location::new(0.0, 0.0, 4.0, 2.0)];
        let out = run(&JumpPolicy::MaxHard, &glimpse);
        assert_eq!(out[0].d_start, 1.0);
    }

    #[test]
    fn test_all_is_identity() {
        let glimpse = [Location::new(1.0, 0.0, 2.0, 2.0), Location::new(3.0, 0.0, 1.0, 2.0)];
        assert_eq!(run(&JumpPolicy::All, &glimpse), glimpse.to_vec());
    }

    #[test]
    fn test_test_jump_step() {
        let glimpse = [Location::new(2.0, 0.0, 2.0, 2.0), Location::new(1.0, 3.0, 2.0, 2.0)];
        let out = run(&JumpPolicy::Test, &glimpse);
        assert_eq!(out[0], Location::new(2.0, 0.0, 1.0, 2.0));
        assert_eq!(out[1], Location::new(2.0, 3.0, 1.0, 2.0));
    }

    #[test]
    fn test_min_density_builds_grid_when_missing() {
        let policy = JumpPolicy::MinDensityHard { search: Arc::new(DensityScan), min_jump_offset: 1 };
        let glimpse = [Location::new(0.0, 0.0, 4.0, 2.0), Location::new(0.0, 0.0, 4.0, 2.0)];
        let out = run(&policy, &glimpse);
        // example 0: row 1 (0.9) is the first ≥ 0.4, row 2 (1.0) extends it
        assert_eq!(out[0], Location::new(1.0, 0.0, 2.0, 2.0));
        // example 1: every row reaches 0.5
        assert_eq!(out[1], Location::new(0.0, 0.0, 4.0, 2.0));
    }

    #[test]
    fn test_first_argmax() {
        assert_eq!(first_argmax(&[]), 0);
        assert_eq!(first_argmax(&[1.0, 3.0, 3.0]), 1);
    }
}
