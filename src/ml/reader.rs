// ============================================================
// Layer 5 — Selective Jump Reader
// ============================================================
// The step loop. For t = 0, 1, ... while someone is still
// running and t < max_jump_step:
//
//   j_t ──Glimpse──▶ g_{t+1} ──Jump──▶ j_{t+1} ──Represent──▶ r_{t+1}
//          │                   │ truncate offsets
//          └ overflow → stop   └ overflow → stop
//
// Every example carries its own stop flag. A stopped example's
// location, state and counters are frozen: the history gets its
// previous value again, and the representation is computed on the
// cheap filler window and thrown away.
//
// After the loop the aggregator folds r_0 .. r_T into the signal.
//
// Reference: Burn Book §3 (Building Blocks)

use std::cell::RefCell;

use burn::prelude::*;
use tracing::debug;

use crate::data::batcher::ReadBatch;
use crate::domain::error::ReaderResult;
use crate::domain::location::Location;
use crate::ml::aggregate::{complete_ratio, completion, stop_ratio, AggregateInput, Aggregator};
use crate::ml::config::ReaderPlan;
use crate::ml::density::density_thresholds;
use crate::ml::history::StepHistory;
use crate::ml::jump::{JumpInput, JumpPolicy};
use crate::ml::masking::MaskSampler;
use crate::ml::matching::{embed, host_grid, match_matrix};
use crate::ml::represent::{represent_step, ReadContext, RepresentBuilder, Representer};

/// Everything recorded about one read besides the signal.
#[derive(Debug, Clone)]
pub struct Diagnostics<B: Backend> {
    /// Steps taken before stopping, per example
    pub steps:          Vec<usize>,
    /// `[example][slot]`, slot 0 is the origin
    pub locations:      Vec<Vec<Location>>,
    pub match_matrix:   Tensor<B, 3>,
    pub stop_ratio:     f32,
    pub complete_ratio: f32,
    /// Per-example terms of `complete_ratio`
    pub complete:       Vec<f32>,
    pub stopped:        Vec<bool>,
    pub doc_emb:        Tensor<B, 3>,
    pub total_offset:   Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ReadOutput<B: Backend> {
    /// `[batch, features]`
    pub signal:      Tensor<B, 2>,
    pub diagnostics: Diagnostics<B>,
}

#[derive(Debug)]
pub struct SelectiveJumpReader<B: Backend> {
    plan:         ReaderPlan,
    word_vectors: Tensor<B, 2>,
    builder:      RepresentBuilder<B>,
    aggregator:   Aggregator<B>,
    device:       B::Device,
}

impl<B: Backend> SelectiveJumpReader<B> {
    /// `word_vectors` is the `[vocab, dim]` embedding table; row 0
    /// is the padding token.
    pub fn new(plan: ReaderPlan, word_vectors: Tensor<B, 2>, device: &B::Device) -> Self {
        let [_, embed_dim] = word_vectors.dims();
        let builder    = plan.represent.init(embed_dim, device);
        let aggregator = plan.aggregate.init(device);
        Self { plan, word_vectors, builder, aggregator, device: device.clone() }
    }

    /// Read a batch with the configured representation builder.
    pub fn read(&self, batch: &ReadBatch<B>) -> ReaderResult<ReadOutput<B>> {
        self.read_with(batch, &self.builder)
    }

    /// Read a batch with an injected representation builder.
    pub fn read_with<R>(&self, batch: &ReadBatch<B>, builder: &R) -> ReaderResult<ReadOutput<B>>
    where
        R: Representer<B> + ?Sized,
    {
        batch.validate()?;
        let plan  = &self.plan;
        let sizes = batch.sizes.as_slice();
        let bs    = batch.len();

        // ── Setup: embeddings and the match matrix ───────────────────────────
        let doc_emb   = embed(&self.word_vectors, batch.doc_ids.clone());
        let query_emb = embed(&self.word_vectors, batch.query_ids.clone());
        let matrix    = match_matrix(plan.interaction, &batch.doc_ids, &batch.query_ids, &doc_emb, &query_emb);

        let grid = match plan.jump {
            JumpPolicy::MinDensityHard { .. } => Some(host_grid(&matrix)),
            _ => None,
        };
        let thresholds = match (&grid, plan.density) {
            (Some(grid), Some(rule)) => density_thresholds(grid, sizes, rule.min_density, rule.use_ratio),
            _ => vec![0.0; bs],
        };

        let ctx = ReadContext {
            doc_ids:      &batch.doc_ids,
            query_ids:    &batch.query_ids,
            word_vectors: &self.word_vectors,
            matrix:       &matrix,
            sizes,
            mask:         RefCell::new(MaskSampler::new(plan.mask_seed, plan.mask_sampling)),
        };
        let jump_input = JumpInput { matrix: &matrix, grid: grid.as_ref(), sizes, thresholds: &thresholds };

        // ── Step loop ────────────────────────────────────────────────────────
        let mut history      = StepHistory::new(bs, plan.max_jump_step);
        let mut stopped      = vec![false; bs];
        let mut steps        = vec![0usize; bs];
        let mut total_offset = vec![0.0f32; bs];
        let mut time         = 0;

        while time < plan.max_jump_step && !stopped.iter().all(|s| *s) {
            let current = history.location(time).to_vec();

            let mut glimpse = plan.glimpse.propose(sizes, &current);
            for i in 0..bs {
                if glimpse[i].overflows(sizes[i]) {
                    glimpse[i] = current[i];
                    stopped[i] = true;
                }
            }

            let mut jumped = plan.jump.jump(&jump_input, &glimpse);
            for i in 0..bs {
                self.truncate(&mut jumped[i]);
                if jumped[i].overflows(sizes[i]) {
                    stopped[i] = true;
                }
            }

            let next: Vec<Location> = (0..bs)
                .map(|i| if stopped[i] { current[i] } else { jumped[i] })
                .collect();
            history.push_locations(next);

            represent_step(builder, &ctx, &mut history, time, &stopped)?;

            for i in (0..bs).filter(|&i| !stopped[i]) {
                steps[i]        += 1;
                total_offset[i] += jumped[i].d_offset;
            }

            let running = stopped.iter().filter(|s| !**s).count();
            debug!(time, running, "selective jump step finished");
            time += 1;
        }

        // ── Aggregate ────────────────────────────────────────────────────────
        let slots  = history.states.written(time);
        let signal = self.aggregator.aggregate(
            &slots,
            &AggregateInput { time, steps: &steps, total_offset: &total_offset, sizes },
            &self.device,
        );

        let last = history.location(time);
        let diagnostics = Diagnostics {
            stop_ratio:     stop_ratio(&stopped),
            complete_ratio: complete_ratio(last, sizes),
            complete:       completion(last, sizes),
            locations:      history.per_example_locations(),
            match_matrix:   matrix,
            doc_emb,
            steps,
            stopped,
            total_offset,
        };

        Ok(ReadOutput { signal, diagnostics })
    }

    fn truncate(&self, location: &mut Location) {
        if let Some(cap) = self.plan.max_jump_offset {
            location.d_offset = location.d_offset.min(cap as f32);
        }
        if let Some(cap) = self.plan.max_jump_offset2 {
            location.q_offset = location.q_offset.min(cap as f32);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ReaderError;
    use crate::domain::location::SizePair;
    use crate::ml::config::ReaderConfig;
    use crate::ml::test_util::{floats, id_batch, TestBackend};
    use std::cell::Cell;

    type B = TestBackend;

    fn word_vectors() -> Tensor<B, 2> {
        Tensor::<B, 2>::ones([6, 2], &Default::default())
    }

    fn reader(config: ReaderConfig) -> SelectiveJumpReader<B> {
        SelectiveJumpReader::new(config.resolve().unwrap(), word_vectors(), &Default::default())
    }

    fn scan_config(steps: usize) -> ReaderConfig {
        ReaderConfig {
            interaction:      "indicator".into(),
            glimpse:          "fix_hard".into(),
            glimpse_fix_size: Some(2),
            jump:             "all".into(),
            represent:        "sum_hard".into(),
            max_jump_step:    steps,
            ..ReaderConfig::default()
        }
    }

    // doc [1 2 3 1 2], query [1 2 4]; indicator rows: 1 1 0 1 1
    fn scenario_batch() -> ReadBatch<B> {
        ReadBatch {
            doc_ids:   id_batch(vec![1, 2, 3, 1, 2], [1, 5]),
            query_ids: id_batch(vec![1, 2, 4], [1, 3]),
            sizes:     vec![SizePair::new(5, 3)],
        }
    }

    #[test]
    fn test_fixed_scan_scenario() {
        let out = reader(scan_config(3)).read(&scenario_batch()).unwrap();
        let d = &out.diagnostics;
        assert_eq!(
            d.locations[0],
            vec![
                Location::ORIGIN,
                Location::new(0.0, 0.0, 2.0, 3.0),
                Location::new(2.0, 0.0, 2.0, 3.0),
                Location::new(4.0, 0.0, 1.0, 3.0),
            ]
        );
        assert_eq!(d.steps, vec![3]);
        assert_eq!(d.stopped, vec![false]);
        assert_eq!(d.total_offset, vec![5.0]);
        assert_eq!(d.stop_ratio, 0.0);
        assert_eq!(d.complete_ratio, 1.0);
        // block sums 2, 1, 1 → max
        assert_eq!(floats(out.signal), vec![2.0]);
    }

    #[test]
    fn test_sum_without_stop_is_uncorrected() {
        let config = ReaderConfig { aggregate: "sum".into(), ..scan_config(3) };
        let out = reader(config).read(&scenario_batch()).unwrap();
        assert_eq!(floats(out.signal), vec![4.0]);
    }

    #[test]
    fn test_zero_length_documents_stop_immediately() {
        let batch = ReadBatch {
            doc_ids:   id_batch(vec![0; 6], [2, 3]),
            query_ids: id_batch(vec![1, 2, 1, 0], [2, 2]),
            sizes:     vec![SizePair::new(0, 2), SizePair::new(0, 1)],
        };
        let config = ReaderConfig { jump: "max_hard".into(), ..scan_config(5) };
        let out = reader(config).read(&batch).unwrap();
        let d = &out.diagnostics;
        assert_eq!(d.stopped, vec![true, true]);
        assert_eq!(d.steps, vec![0, 0]);
        assert_eq!(d.stop_ratio, 1.0);
        assert_eq!(d.complete_ratio, 1.0);
        assert_eq!(d.locations[0], vec![Location::ORIGIN, Location::ORIGIN]);
        assert!(floats(out.signal).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_stopped_example_is_frozen() {
        // example 0 has 2 tokens and stops after one step
        let batch = ReadBatch {
            doc_ids:   id_batch(vec![1, 1, 0, 0, 0, 1, 2, 3, 1, 2], [2, 5]),
            query_ids: id_batch(vec![1, 2, 4, 1, 2, 4], [2, 3]),
            sizes:     vec![SizePair::new(2, 3), SizePair::new(5, 3)],
        };
        let config = ReaderConfig { aggregate: "sum".into(), ..scan_config(6) };
        let out = reader(config).read(&batch).unwrap();
        let d = &out.diagnostics;

        assert_eq!(d.steps, vec![1, 3]);
        assert_eq!(d.stopped, vec![true, true]);
        let first = Location::new(0.0, 0.0, 2.0, 3.0);
        assert!(d.locations[0][1..].iter().all(|loc| *loc == first));
        assert_eq!(d.total_offset, vec![2.0, 5.0]);
        // example 0: one block of 2 matches; example 1: 2 + 1 + 1
        assert_eq!(floats(out.signal), vec![2.0, 4.0]);
    }

    #[test]
    fn test_sum_and_max_agree_on_single_steps() {
        let batch = ReadBatch {
            doc_ids:   id_batch(vec![1, 2, 2, 0], [2, 2]),
            query_ids: id_batch(vec![1, 2, 2, 0], [2, 2]),
            sizes:     vec![SizePair::new(2, 2), SizePair::new(1, 1)],
        };
        let max = reader(scan_config(4)).read(&batch).unwrap();
        let sum = reader(ReaderConfig { aggregate: "sum".into(), ..scan_config(4) }).read(&batch).unwrap();
        assert_eq!(max.diagnostics.steps, vec![1, 1]);
        assert_eq!(floats(max.signal), floats(sum.signal));
    }

    #[test]
    fn test_max_jump_picks_strongest_row_and_truncates() {
        let config = ReaderConfig {
            glimpse:          "all_next_hard".into(),
            jump:             "max_hard".into(),
            max_jump_offset2: Some(2),
            ..scan_config(1)
        };
        let out = reader(config).read(&scenario_batch()).unwrap();
        // rows 0, 1, 3, 4 tie at 1 → first row wins, query offset capped at 2
        assert_eq!(out.diagnostics.locations[0][1], Location::new(0.0, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_density_jump_runs_end_to_end() {
        let config = ReaderConfig {
            glimpse:     "all_next_hard".into(),
            jump:        "min_density_hard".into(),
            min_density: Some(0.5),
            ..scan_config(4)
        };
        let out = reader(config).read(&scenario_batch()).unwrap();
        let d = &out.diagnostics;
        // dense runs: rows 0-1, then rows 3-4
        assert_eq!(d.locations[0][1], Location::new(0.0, 0.0, 2.0, 3.0));
        assert_eq!(d.locations[0][2], Location::new(3.0, 0.0, 2.0, 3.0));
        assert!(d.stopped[0]);
        assert_eq!(floats(out.signal), vec![2.0]);
    }

    // ── Representation variants through the full loop ─────────────────────
    //
    // Example 0 is the scenario document; example 1 has 2 tokens and a
    // 1-token query, so it stops on step 3 while example 0 runs the
    // whole budget of 4. max_hard visits rows 0, 1, 3, 4 and 0, 1.

    fn mixed_batch() -> ReadBatch<B> {
        ReadBatch {
            doc_ids:   id_batch(vec![1, 2, 3, 1, 2, 1, 2, 0, 0, 0], [2, 5]),
            query_ids: id_batch(vec![1, 2, 4, 1, 0, 0], [2, 3]),
            sizes:     vec![SizePair::new(5, 3), SizePair::new(2, 1)],
        }
    }

    fn variant_config(represent: &str, aggregate: &str) -> ReaderConfig {
        ReaderConfig {
            jump:             "max_hard".into(),
            represent:        represent.into(),
            aggregate:        aggregate.into(),
            max_jump_offset:  Some(10),
            max_jump_offset2: Some(5),
            rnn_size:         Some(4),
            ..scan_config(4)
        }
    }

    fn assert_variant_reads(represent: &str, aggregate: &str, dims: [usize; 2]) {
        let reader = reader(variant_config(represent, aggregate));
        let batch  = mixed_batch();
        let first  = reader.read(&batch).unwrap();
        let second = reader.read(&batch).unwrap();
        let d = &first.diagnostics;

        assert_eq!(first.signal.dims(), dims, "{represent}/{aggregate}");
        assert_eq!(d.steps, vec![4, 2]);
        assert_eq!(d.stopped, vec![false, true]);
        // the full-budget example is not counted as stopped
        assert_eq!(d.stop_ratio, 0.5);
        assert_eq!(d.complete, vec![1.0, 1.0]);
        assert_eq!(d.locations[0].len(), 5);
        assert_eq!(d.locations[0][4], Location::new(4.0, 0.0, 1.0, 3.0));

        let frozen = Location::new(1.0, 0.0, 1.0, 1.0);
        assert_eq!(d.locations[1][1], Location::new(0.0, 0.0, 1.0, 1.0));
        assert!(d.locations[1][2..].iter().all(|loc| *loc == frozen), "{:?}", d.locations[1]);

        assert_eq!(floats(first.signal), floats(second.signal));
    }

    #[test]
    fn test_interaction_copy_hard_reads_mixed_batch() {
        // one document row by the padded query width of 3
        assert_variant_reads("interaction_copy_hard", "max", [2, 3]);
    }

    #[test]
    fn test_interaction_concat_reads_mixed_batch() {
        assert_variant_reads("interaction_copy_hard", "interaction_concat", [2, 200]);
    }

    #[test]
    fn test_interaction_cnn_hard_reads_mixed_batch() {
        assert_variant_reads("interaction_cnn_hard", "max", [2, 200]);
    }

    #[test]
    fn test_interaction_cnn_hard_resize_reads_mixed_batch() {
        assert_variant_reads("interaction_cnn_hard_resize", "sum", [2, 200]);
    }

    #[test]
    fn test_rnn_hard_reads_mixed_batch() {
        assert_variant_reads("rnn_hard", "max", [2, 1]);
    }

    #[test]
    fn test_cnn_hard_reads_mixed_batch() {
        assert_variant_reads("cnn_hard", "max", [2, 1]);
    }

    /// Counts builder calls; always returns ones.
    struct CountingOnes {
        calls: Cell<usize>,
    }

    impl Representer<B> for CountingOnes {
        fn represent(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3> {
            self.calls.set(self.calls.get() + 1);
            Tensor::ones([locations.len(), 1, 1], &ctx.device())
        }
    }

    #[test]
    fn test_injected_builder_drives_the_loop() {
        // the test jump advances one row per step: 0, 1, 2
        let config = ReaderConfig { glimpse: "all_next_hard".into(), jump: "test".into(), ..scan_config(3) };
        let stub = CountingOnes { calls: Cell::new(0) };
        let out = reader(config).read_with(&scenario_batch(), &stub).unwrap();
        assert_eq!(out.diagnostics.steps, vec![3]);
        assert_eq!(stub.calls.get(), 3);
        assert_eq!(out.diagnostics.locations[0][3], Location::new(2.0, 0.0, 1.0, 3.0));
        assert_eq!(floats(out.signal), vec![1.0]);
    }

    #[test]
    fn test_inconsistent_batch_is_rejected() {
        let batch = ReadBatch {
            doc_ids:   id_batch(vec![1, 2], [1, 2]),
            query_ids: id_batch(vec![1], [1, 1]),
            sizes:     vec![SizePair::new(3, 1)],
        };
        assert!(matches!(reader(scan_config(2)).read(&batch), Err(ReaderError::Batch(_))));
    }
}
