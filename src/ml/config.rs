// ============================================================
// Layer 5 — Reader Configuration
// ============================================================
// ReaderConfig is the user-facing, serialisable form: variant
// names as strings, optional parameters as Options. It is turned
// into a ReaderPlan exactly once by `resolve()`, which is the only
// place configuration errors are raised:
//
//   unknown variant name            → Unimplemented
//   variant without its parameter   → MissingParameter
//   value the encoders cannot use   → InvalidParameter
//
// The step loop only ever sees the resolved enums.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ReaderError, ReaderResult};
use crate::domain::traits::RegionSearch;
use crate::domain::variants::{AggregateKind, GlimpseKind, InteractionKind, JumpKind, RepresentKind};
use crate::ml::aggregate::AggregatePlan;
use crate::ml::density::DensityScan;
use crate::ml::glimpse::GlimpsePolicy;
use crate::ml::jump::JumpPolicy;
use crate::ml::represent::RepresentPlan;

// Pooled grid of the 2-D interaction CNN is GRID x GRID
const GRID: usize = 5;
// cnn_hard pools the query branch in windows of 10
const QUERY_POOL: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub interaction:      String,
    pub glimpse:          String,
    pub glimpse_fix_size: Option<usize>,
    pub jump:             String,
    pub min_density:      Option<f32>,
    pub use_ratio:        bool,
    pub min_jump_offset:  usize,
    pub represent:        String,
    pub separate:         bool,
    pub aggregate:        String,
    pub rnn_size:         Option<usize>,
    pub max_jump_offset:  Option<usize>,
    pub max_jump_offset2: Option<usize>,
    pub keep_prob:        f64,
    pub max_jump_step:    usize,
    pub mask_sampling:    bool,
    pub mask_seed:        u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            interaction:      "dot".to_string(),
            glimpse:          "fix_hard".to_string(),
            glimpse_fix_size: Some(10),
            jump:             "max_hard".to_string(),
            min_density:      None,
            use_ratio:        false,
            min_jump_offset:  1,
            represent:        "sum_hard".to_string(),
            separate:         false,
            aggregate:        "max".to_string(),
            rnn_size:         None,
            max_jump_offset:  None,
            max_jump_offset2: None,
            keep_prob:        1.0,
            max_jump_step:    10,
            mask_sampling:    false,
            mask_seed:        42,
        }
    }
}

/// Threshold rule for min_density_hard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityRule {
    pub min_density: f32,
    pub use_ratio:   bool,
}

/// Fully validated reader settings.
#[derive(Debug, Clone)]
pub struct ReaderPlan {
    pub interaction:      InteractionKind,
    pub glimpse:          GlimpsePolicy,
    pub jump:             JumpPolicy,
    pub represent:        RepresentPlan,
    pub aggregate:        AggregatePlan,
    pub density:          Option<DensityRule>,
    pub max_jump_offset:  Option<usize>,
    pub max_jump_offset2: Option<usize>,
    pub max_jump_step:    usize,
    pub mask_sampling:    bool,
    pub mask_seed:        u64,
}

impl ReaderConfig {
    /// Resolve with the built-in DensityScan region search.
    pub fn resolve(&self) -> ReaderResult<ReaderPlan> {
        self.resolve_with(Arc::new(DensityScan))
    }

    /// Resolve with a caller-provided region search operator.
    pub fn resolve_with(&self, search: Arc<dyn RegionSearch>) -> ReaderResult<ReaderPlan> {
        let interaction: InteractionKind = self.interaction.parse()?;
        let glimpse_kind: GlimpseKind    = self.glimpse.parse()?;
        let jump_kind: JumpKind          = self.jump.parse()?;
        let represent_kind: RepresentKind = self.represent.parse()?;
        let aggregate_kind: AggregateKind = self.aggregate.parse()?;

        if self.max_jump_step == 0 {
            return Err(ReaderError::invalid("max_jump_step", "at least one step is required"));
        }
        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            return Err(ReaderError::invalid("keep_prob", format!("{} is outside (0, 1]", self.keep_prob)));
        }

        let glimpse = match glimpse_kind {
            GlimpseKind::FixHard => {
                let size = self
                    .glimpse_fix_size
                    .ok_or_else(|| ReaderError::missing("glimpse_fix_size", "glimpse 'fix_hard'"))?;
                if size == 0 {
                    return Err(ReaderError::invalid("glimpse_fix_size", "must be at least 1"));
                }
                GlimpsePolicy::FixHard { size }
            }
            GlimpseKind::AllNextHard => GlimpsePolicy::AllNextHard,
        };

        let density = self.min_density.map(|min_density| DensityRule { min_density, use_ratio: self.use_ratio });
        let jump = match jump_kind {
            JumpKind::MaxHard => JumpPolicy::MaxHard,
            JumpKind::MinDensityHard => {
                if density.is_none() {
                    return Err(ReaderError::missing("min_density", "jump 'min_density_hard'"));
                }
                JumpPolicy::MinDensityHard { search, min_jump_offset: self.min_jump_offset }
            }
            JumpKind::All => JumpPolicy::All,
            JumpKind::Test => JumpPolicy::Test,
        };

        let represent = self.represent_plan(represent_kind)?;
        let aggregate = self.aggregate_plan(aggregate_kind, represent_kind)?;

        Ok(ReaderPlan {
            interaction,
            glimpse,
            jump,
            represent,
            aggregate,
            density,
            max_jump_offset: self.max_jump_offset,
            max_jump_offset2: self.max_jump_offset2,
            max_jump_step: self.max_jump_step,
            mask_sampling: self.mask_sampling,
            mask_seed: self.mask_seed,
        })
    }

    fn represent_plan(&self, kind: RepresentKind) -> ReaderResult<RepresentPlan> {
        Ok(match kind {
            RepresentKind::SumHard => RepresentPlan::SumHard,
            RepresentKind::InteractionCopyHard => RepresentPlan::InteractionCopyHard,
            RepresentKind::InteractionCnnHardResize => {
                let (rows, cols) = self.interaction_grid("represent 'interaction_cnn_hard_resize'")?;
                RepresentPlan::InteractionCnnHardResize { rows, cols }
            }
            RepresentKind::InteractionCnnHard => {
                let (rows, cols) = self.interaction_grid("represent 'interaction_cnn_hard'")?;
                RepresentPlan::InteractionCnnHard { rows, cols }
            }
            RepresentKind::RnnHard => {
                let rnn_size = self.rnn_size.ok_or_else(|| ReaderError::missing("rnn_size", "represent 'rnn_hard'"))?;
                if rnn_size == 0 {
                    return Err(ReaderError::invalid("rnn_size", "must be at least 1"));
                }
                RepresentPlan::RnnHard { rnn_size }
            }
            RepresentKind::CnnHard => {
                let max_len = self
                    .max_jump_offset
                    .ok_or_else(|| ReaderError::missing("max_jump_offset", "represent 'cnn_hard'"))?;
                divisible("max_jump_offset", max_len, QUERY_POOL)?;
                RepresentPlan::CnnHard { max_len, separate: self.separate, keep_prob: self.keep_prob }
            }
            RepresentKind::Test => RepresentPlan::Test,
        })
    }

    fn aggregate_plan(&self, kind: AggregateKind, represent: RepresentKind) -> ReaderResult<AggregatePlan> {
        Ok(match kind {
            AggregateKind::Max => AggregatePlan::Max,
            AggregateKind::Sum => AggregatePlan::Sum,
            AggregateKind::InteractionConcat => {
                if represent != RepresentKind::InteractionCopyHard {
                    return Err(ReaderError::invalid(
                        "aggregate",
                        format!("'interaction_concat' needs represent 'interaction_copy_hard', not '{represent}'"),
                    ));
                }
                let (rows, cols) = self.interaction_grid("aggregate 'interaction_concat'")?;
                AggregatePlan::InteractionConcat { rows: self.max_jump_step * rows, cols }
            }
        })
    }

    // Both offset caps, each divisible by the pooling grid.
    fn interaction_grid(&self, context: &str) -> ReaderResult<(usize, usize)> {
        let rows = self.max_jump_offset.ok_or_else(|| ReaderError::missing("max_jump_offset", context))?;
        let cols = self.max_jump_offset2.ok_or_else(|| ReaderError::missing("max_jump_offset2", context))?;
        divisible("max_jump_offset", rows, GRID)?;
        divisible("max_jump_offset2", cols, GRID)?;
        Ok((rows, cols))
    }
}

fn divisible(parameter: &'static str, value: usize, by: usize) -> ReaderResult<()> {
    if value == 0 || value % by != 0 {
        return Err(ReaderError::invalid(parameter, format!("{value} must be a positive multiple of {by}")));
    }
    Ok(())
}
