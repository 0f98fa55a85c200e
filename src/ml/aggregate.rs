// ============================================================
// Layer 5 — Aggregation
// ============================================================
// Folds the state history r_0 .. r_T into one signal per example.
//
//   max                 elementwise max over all slots (r_0 = 0 included)
//   sum                 Σ slots − r_T · (T − steps)
//                       frozen repeats after a stop are removed
//   interaction_concat  local slices r_1 .. r_T stacked along the
//                       document axis → 2-D CNN → 200 features
//
// Plus the two read diagnostics, stop_ratio and complete_ratio.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::domain::location::{Location, SizePair};
use crate::ml::conv::{InteractionCnn, InteractionCnnConfig};
use crate::ml::pooling::pool_index_2d;
use crate::ml::slicer::fit_axis;

/// A resolved aggregation variant with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatePlan {
    Max,
    Sum,
    /// rows = max_jump_step * max_jump_offset, cols = max_jump_offset2
    InteractionConcat { rows: usize, cols: usize },
}

impl AggregatePlan {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Aggregator<B> {
        match *self {
            AggregatePlan::Max => Aggregator::Max,
            AggregatePlan::Sum => Aggregator::Sum,
            AggregatePlan::InteractionConcat { rows, cols } => Aggregator::InteractionConcat {
                cnn: InteractionCnnConfig::new(rows, cols).init(device),
                rows,
                cols,
            },
        }
    }
}

#[derive(Debug)]
pub enum Aggregator<B: Backend> {
    Max,
    Sum,
    InteractionConcat { cnn: InteractionCnn<B>, rows: usize, cols: usize },
}

/// Per-example values the aggregators need besides the states.
pub struct AggregateInput<'a> {
    /// Loop iterations actually run (T)
    pub time:         usize,
    pub steps:        &'a [usize],
    pub total_offset: &'a [f32],
    pub sizes:        &'a [SizePair],
}

impl<B: Backend> Aggregator<B> {
    /// `slots` are the written state slots r_0 ..= r_T.
    /// Returns `[b, features]`.
    pub fn aggregate(&self, slots: &[Tensor<B, 3>], input: &AggregateInput<'_>, device: &B::Device) -> Tensor<B, 2> {
        let batch = input.steps.len();
        let Some(last) = slots.last() else {
            return Tensor::zeros([batch, 1], device);
        };
        let [bs, rows, cols] = last.dims();

        match self {
            Aggregator::Max => Tensor::stack::<4>(slots.to_vec(), 0)
                .max_dim(0)
                .reshape([bs, rows * cols]),
            Aggregator::Sum => {
                let total = Tensor::stack::<4>(slots.to_vec(), 0).sum_dim(0).reshape([bs, rows, cols]);
                let repeats: Vec<f32> = input
                    .steps
                    .iter()
                    .map(|&step| input.time.saturating_sub(step) as f32)
                    .collect();
                let repeats = Tensor::<B, 3>::from_data(TensorData::new(repeats, [bs, 1, 1]), device);
                (total - last.clone() * repeats).reshape([bs, rows * cols])
            }
            Aggregator::InteractionConcat { cnn, rows: max_rows, cols: max_cols } => {
                let local = if slots.len() > 1 {
                    Tensor::cat(slots[1..].to_vec(), 1)
                } else {
                    Tensor::zeros([bs, 0, cols], device)
                };
                let local = fit_axis(fit_axis(local, 1, *max_rows, 0.0), 2, *max_cols, 0.0);
                let d_lens: Vec<usize> = input.total_offset.iter().map(|&o| o.max(0.0) as usize).collect();
                let q_lens: Vec<usize> = input.sizes.iter().map(|s| s.query).collect();
                let index = pool_index_2d(&d_lens, &q_lens, *max_rows, *max_cols);
                cnn.forward(local, Some(&index))
            }
        }
    }
}

/// Fraction of examples whose stop flag is set. 0 for an empty batch.
pub fn stop_ratio(stopped: &[bool]) -> f32 {
    if stopped.is_empty() {
        return 0.0;
    }
    stopped.iter().filter(|s| **s).count() as f32 / stopped.len() as f32
}

/// Per-example min((d_start + d_offset) / doc_len, 1) at the last
/// location. Empty documents count as fully read.
pub fn completion(last: &[Location], sizes: &[SizePair]) -> Vec<f32> {
    last.iter()
        .zip(sizes)
        .map(|(loc, size)| {
            if size.doc == 0 {
                1.0
            } else {
                ((loc.d_start + loc.d_offset) / size.doc as f32).clamp(0.0, 1.0)
            }
        })
        .collect()
}

/// Batch mean of `completion`. 0 for an empty batch.
pub fn complete_ratio(last: &[Location], sizes: &[SizePair]) -> f32 {
    mean(&completion(last, sizes))
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
