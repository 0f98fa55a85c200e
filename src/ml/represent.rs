// ============================================================
// Layer 5 — Representation Builders
// ============================================================
// Computes r_{t+1} for the region at the jump location j_{t+1}.
//
//   sum_hard                     Σ match cells in the rectangle    [b, 1, 1]
//   interaction_copy_hard        raw match rows (full query width) [b, d_off, Lq]
//   interaction_cnn_hard_resize  crop-and-resize → 2-D CNN          [b, 1, 200]
//   interaction_cnn_hard         local doc·queryᵀ → 2-D CNN         [b, 1, 200]
//   rnn_hard                     GRU final states, dot product     [b, 1, 1]
//   cnn_hard                     1-D CNNs + dense head             [b, 1, 1]
//   test                         ones                              [b, 1, 1]
//
// Location-stability reuse (represent_step):
//
//   time ≥ 1 and j_{t+1} == j_t  →  copy r_t, skip the builder
//
// The builder is skipped only when every example reuses; with a
// partial overlap it runs and the reusing rows are overwritten
// with r_t. cnn_hard reuses its document and query branches
// independently through the TwoBranch seam.

use std::cell::RefCell;

use burn::prelude::*;

use crate::domain::error::ReaderResult;
use crate::domain::location::{Location, SizePair};
use crate::ml::conv::{DocQueryCnn, DocQueryCnnConfig, InteractionCnn, InteractionCnnConfig};
use crate::ml::history::{check_shape, example_mask, StateStream, StepHistory};
use crate::ml::masking::MaskSampler;
use crate::ml::matching::embed;
use crate::ml::pooling::pool_index_2d;
use crate::ml::recurrent::{GruMatcher, GruMatcherConfig};
use crate::ml::resize::{crop_and_resize, CropBox};
use crate::ml::slicer::batch_slice;

/// Everything a builder may read during one read call.
pub struct ReadContext<'a, B: Backend> {
    pub doc_ids:      &'a Tensor<B, 2, Int>,
    pub query_ids:    &'a Tensor<B, 2, Int>,
    pub word_vectors: &'a Tensor<B, 2>,
    pub matrix:       &'a Tensor<B, 3>,
    pub sizes:        &'a [SizePair],
    /// Per-read RNG for the cnn_hard keep-mask
    pub mask:         RefCell<MaskSampler>,
}

impl<'a, B: Backend> ReadContext<'a, B> {
    pub fn device(&self) -> B::Device {
        self.matrix.device()
    }
}

// ─── Traits ───────────────────────────────────────────────────────────────────
/// Builds a `[b, rows, cols]` representation for each location.
pub trait Representer<B: Backend> {
    fn represent(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3>;

    /// Builders with separate document and query branches expose
    /// them here so each branch gets its own reuse decision.
    fn two_branch(&self) -> Option<&dyn TwoBranch<B>> {
        None
    }
}

pub trait TwoBranch<B: Backend> {
    fn encode_doc(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3>;
    fn encode_query(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3>;
    fn combine(&self, doc: Tensor<B, 3>, query: Tensor<B, 3>) -> Tensor<B, 3>;
}

// ─── Plan ─────────────────────────────────────────────────────────────────────
/// A resolved representation variant with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum RepresentPlan {
    SumHard,
    InteractionCopyHard,
    InteractionCnnHardResize { rows: usize, cols: usize },
    InteractionCnnHard { rows: usize, cols: usize },
    RnnHard { rnn_size: usize },
    CnnHard { max_len: usize, separate: bool, keep_prob: f64 },
    Test,
}

impl RepresentPlan {
    pub fn init<B: Backend>(&self, embed_dim: usize, device: &B::Device) -> RepresentBuilder<B> {
        match *self {
            RepresentPlan::SumHard => RepresentBuilder::SumHard,
            RepresentPlan::InteractionCopyHard => RepresentBuilder::InteractionCopyHard,
            RepresentPlan::InteractionCnnHardResize { rows, cols } => RepresentBuilder::InteractionCnnHardResize {
                cnn:  InteractionCnnConfig::new(rows, cols).init(device),
                crop: [rows, cols],
            },
            RepresentPlan::InteractionCnnHard { rows, cols } => RepresentBuilder::InteractionCnnHard {
                cnn: InteractionCnnConfig::new(rows, cols).init(device),
                rows,
                cols,
            },
            RepresentPlan::RnnHard { rnn_size } => RepresentBuilder::RnnHard {
                gru: GruMatcherConfig::new(embed_dim, rnn_size).init(device),
            },
            RepresentPlan::CnnHard { max_len, separate, keep_prob } => RepresentBuilder::CnnHard {
                cnn: DocQueryCnnConfig::new(embed_dim, max_len)
                    .with_separate(separate)
                    .with_dropout(1.0 - keep_prob)
                    .init(device),
            },
            RepresentPlan::Test => RepresentBuilder::Test,
        }
    }
}

// ─── Built-in builders ────────────────────────────────────────────────────────
#[derive(Debug)]
pub enum RepresentBuilder<B: Backend> {
    SumHard,
    InteractionCopyHard,
    InteractionCnnHardResize { cnn: InteractionCnn<B>, crop: [usize; 2] },
    InteractionCnnHard { cnn: InteractionCnn<B>, rows: usize, cols: usize },
    RnnHard { gru: GruMatcher<B> },
    CnnHard { cnn: DocQueryCnn<B> },
    Test,
}

impl<B: Backend> Representer<B> for RepresentBuilder<B> {
    fn represent(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3> {
        let bs = locations.len();
        match self {
            RepresentBuilder::SumHard => rectangle_sums(ctx.matrix, locations),
            RepresentBuilder::InteractionCopyHard => {
                let (starts, lens) = doc_windows(locations);
                batch_slice(ctx.matrix.clone(), &starts, &lens, 0.0)
            }
            RepresentBuilder::InteractionCnnHardResize { cnn, crop } => {
                let boxes: Vec<CropBox> = locations
                    .iter()
                    .zip(ctx.sizes)
                    .map(|(loc, size)| normalized_box(loc, *size))
                    .collect();
                let grid = crop_and_resize(ctx.matrix.clone(), &boxes, *crop);
                cnn.forward(grid, None).unsqueeze_dim(1)
            }
            RepresentBuilder::InteractionCnnHard { cnn, rows, cols } => {
                let (doc, d_lens)   = doc_tokens(ctx, locations);
                let (query, q_lens) = query_tokens(ctx, locations);
                let [_, d_width, _] = doc.dims();
                let [_, q_width, _] = query.dims();
                let local = if d_width == 0 || q_width == 0 {
                    Tensor::zeros([bs, *rows, *cols], &ctx.device())
                } else {
                    doc.matmul(query.swap_dims(1, 2))
                };
                let index = pool_index_2d(&d_lens, &q_lens, *rows, *cols);
                cnn.forward(local, Some(&index)).unsqueeze_dim(1)
            }
            RepresentBuilder::RnnHard { gru } => {
                let (doc, d_lens)   = doc_tokens(ctx, locations);
                let (query, q_lens) = query_tokens(ctx, locations);
                gru.forward(doc, &d_lens, query, &q_lens).reshape([bs, 1, 1])
            }
            RepresentBuilder::CnnHard { .. } => {
                let doc   = self.encode_doc(ctx, locations);
                let query = self.encode_query(ctx, locations);
                self.combine(doc, query)
            }
            RepresentBuilder::Test => Tensor::ones([bs, 1, 1], &ctx.device()),
        }
    }

    fn two_branch(&self) -> Option<&dyn TwoBranch<B>> {
        match self {
            RepresentBuilder::CnnHard { .. } => Some(self),
            _ => None,
        }
    }
}

impl<B: Backend> TwoBranch<B> for RepresentBuilder<B> {
    fn encode_doc(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3> {
        match self {
            RepresentBuilder::CnnHard { cnn } => {
                let (doc, d_lens) = doc_tokens(ctx, locations);
                let doc_lens: Vec<usize> = ctx.sizes.iter().map(|s| s.doc).collect();
                let keep = ctx.mask.borrow_mut().sample_tensor::<B>(&doc_lens, cnn.slots(), &ctx.device());
                cnn.encode_doc(doc, &d_lens, keep)
            }
            other => other.represent(ctx, locations),
        }
    }

    fn encode_query(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3> {
        match self {
            RepresentBuilder::CnnHard { cnn } => {
                let (query, q_lens) = query_tokens(ctx, locations);
                cnn.encode_query(query, &q_lens)
            }
            other => other.represent(ctx, locations),
        }
    }

    fn combine(&self, doc: Tensor<B, 3>, query: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            RepresentBuilder::CnnHard { cnn } => cnn.score(doc, query).unsqueeze_dim(1),
            _ => doc,
        }
    }
}

// ─── Step with reuse ──────────────────────────────────────────────────────────
/// Compute (or reuse) r_{t+1} and write it into the history.
///
/// The locations for slot `time + 1` must already be in the
/// history. Stopped examples are evaluated on the filler window
/// and their result is dropped by the freeze rule.
pub fn represent_step<B, R>(
    builder: &R,
    ctx:     &ReadContext<'_, B>,
    history: &mut StepHistory<B>,
    time:    usize,
    stopped: &[bool],
) -> ReaderResult<()>
where
    B: Backend,
    R: Representer<B> + ?Sized,
{
    let previous = history.location(time).to_vec();
    let next     = history.location(time + 1).to_vec();
    let running: Vec<bool> = stopped.iter().map(|s| !s).collect();
    let eval: Vec<Location> = next
        .iter()
        .zip(stopped)
        .map(|(loc, &stop)| if stop { Location::FILLER } else { *loc })
        .collect();

    let reuse_when = |same: &dyn Fn(&Location, &Location) -> bool| -> Vec<bool> {
        next.iter().zip(&previous).map(|(n, p)| time >= 1 && same(n, p)).collect()
    };

    let state = match builder.two_branch() {
        Some(branches) => {
            let doc_reuse   = reuse_when(&|n, p| n.same_doc_span(p));
            let query_reuse = reuse_when(&|n, p| n.same_query_span(p));
            let both: Vec<bool> = doc_reuse.iter().zip(&query_reuse).map(|(d, q)| *d && *q).collect();

            let doc   = reuse_or_build(&history.doc, time, &doc_reuse, || branches.encode_doc(ctx, &eval))?;
            let query = reuse_or_build(&history.query, time, &query_reuse, || branches.encode_query(ctx, &eval))?;
            history.doc.record(time, doc.clone(), &running)?;
            history.query.record(time, query.clone(), &running)?;
            reuse_or_build(&history.states, time, &both, || branches.combine(doc, query))?
        }
        None => {
            let reuse = reuse_when(&|n, p| n == p);
            reuse_or_build(&history.states, time, &reuse, || builder.represent(ctx, &eval))?
        }
    };

    history.states.record(time, state, &running)
}

fn reuse_or_build<B, F>(
    stream: &StateStream<B>,
    time:   usize,
    reuse:  &[bool],
    build:  F,
) -> ReaderResult<Tensor<B, 3>>
where
    B: Backend,
    F: FnOnce() -> Tensor<B, 3>,
{
    match stream.get(time) {
        Some(previous) if !reuse.is_empty() && reuse.iter().all(|r| *r) => Ok(previous.clone()),
        Some(previous) if reuse.iter().any(|r| *r) => {
            let fresh = build();
            check_shape(stream.name(), previous, &fresh)?;
            let mask = example_mask(reuse, fresh.dims(), &fresh.device());
            Ok(fresh.mask_where(mask, previous.clone()))
        }
        _ => Ok(build()),
    }
}

// ─── Region helpers ───────────────────────────────────────────────────────────
fn doc_windows(locations: &[Location]) -> (Vec<usize>, Vec<usize>) {
    locations.iter().map(Location::doc_window).unzip()
}

fn query_windows(locations: &[Location]) -> (Vec<usize>, Vec<usize>) {
    locations.iter().map(Location::query_window).unzip()
}

fn doc_tokens<B: Backend>(ctx: &ReadContext<'_, B>, locations: &[Location]) -> (Tensor<B, 3>, Vec<usize>) {
    let (starts, lens) = doc_windows(locations);
    (embed_window(ctx, ctx.doc_ids, &starts, &lens), lens)
}

fn query_tokens<B: Backend>(ctx: &ReadContext<'_, B>, locations: &[Location]) -> (Tensor<B, 3>, Vec<usize>) {
    let (starts, lens) = query_windows(locations);
    (embed_window(ctx, ctx.query_ids, &starts, &lens), lens)
}

// Token window (pad id 0) → embeddings [bs, W, dim]
fn embed_window<B: Backend>(
    ctx:    &ReadContext<'_, B>,
    ids:    &Tensor<B, 2, Int>,
    starts: &[usize],
    lens:   &[usize],
) -> Tensor<B, 3> {
    let window = batch_slice(ids.clone(), starts, lens, 0i64);
    let [bs, width] = window.dims();
    if width == 0 {
        let [_, dim] = ctx.word_vectors.dims();
        return Tensor::zeros([bs, 0, dim], &ctx.device());
    }
    embed(ctx.word_vectors, window)
}

// Σ cells of [d_start, d_end) × [q_start, q_end), clipped to the matrix
fn rectangle_sums<B: Backend>(matrix: &Tensor<B, 3>, locations: &[Location]) -> Tensor<B, 3> {
    let [_, doc_len, q_len] = matrix.dims();
    let device = matrix.device();
    let sums: Vec<Tensor<B, 3>> = locations
        .iter()
        .enumerate()
        .map(|(i, loc)| {
            let (d_start, _) = loc.doc_window();
            let (q_start, _) = loc.query_window();
            let d_end = loc.doc_end().min(doc_len);
            let q_end = loc.query_end().min(q_len);
            if d_start >= d_end || q_start >= q_end {
                return Tensor::zeros([1, 1, 1], &device);
            }
            matrix
                .clone()
                .narrow(0, i, 1)
                .narrow(1, d_start, d_end - d_start)
                .narrow(2, q_start, q_end - q_start)
                .sum()
                .reshape([1, 1, 1])
        })
        .collect();
    Tensor::cat(sums, 0)
}

// Box corners are the first and last row/column of the window,
// divided by the valid lengths.
fn normalized_box(loc: &Location, size: SizePair) -> CropBox {
    let (d_start, d_offset) = loc.doc_window();
    let (q_start, q_offset) = loc.query_window();
    let doc_len   = size.doc.max(1) as f32;
    let query_len = size.query.max(1) as f32;
    let last = |start: usize, offset: usize| (start + offset) as f32 - 1.0;
    CropBox {
        y1: d_start as f32 / doc_len,
        x1: q_start as f32 / query_len,
        y2: last(d_start, d_offset) / doc_len,
        x2: last(q_start, q_offset) / query_len,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ReaderError;
    use crate::ml::test_util::{floats, id_batch, matrix, TestBackend};
    use std::cell::Cell;

    type B = TestBackend;

    struct Fixture {
        doc_ids:      Tensor<B, 2, Int>,
        query_ids:    Tensor<B, 2, Int>,
        word_vectors: Tensor<B, 2>,
        matrix:       Tensor<B, 3>,
        sizes:        Vec<SizePair>,
    }

    impl Fixture {
        // 2 examples, doc length 4, query length 2, vectors of dim 2
        fn new() -> Self {
            Self {
                doc_ids:      id_batch(vec![1, 2, 3, 1, 2, 2, 0, 0], [2, 4]),
                query_ids:    id_batch(vec![1, 2, 3, 0], [2, 2]),
                word_vectors: matrix(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0], [1, 4, 2]).reshape([4, 2]),
                matrix:       matrix((0..16).map(|v| v as f32).collect(), [2, 4, 2]),
                sizes:        vec![SizePair::new(4, 2), SizePair::new(2, 1)],
            }
        }

        fn ctx(&self) -> ReadContext<'_, B> {
            ReadContext {
                doc_ids:      &self.doc_ids,
                query_ids:    &self.query_ids,
                word_vectors: &self.word_vectors,
                matrix:       &self.matrix,
                sizes:        &self.sizes,
                mask:         RefCell::new(MaskSampler::new(3, true)),
            }
        }
    }

    /// Returns d_start + 100 * call_number and counts its calls.
    struct CountingStub {
        calls: Cell<usize>,
    }

    impl Representer<B> for CountingStub {
        fn represent(&self, ctx: &ReadContext<'_, B>, locations: &[Location]) -> Tensor<B, 3> {
            self.calls.set(self.calls.get() + 1);
            let values: Vec<f32> = locations
                .iter()
                .map(|l| l.d_start + 100.0 * self.calls.get() as f32)
                .collect();
            Tensor::<B, 1>::from_floats(values.as_slice(), &ctx.device()).reshape([locations.len(), 1, 1])
        }
    }

    fn history_with(slots: &[Vec<Location>]) -> StepHistory<B> {
        let mut history = StepHistory::new(slots[0].len(), 4);
        for locations in slots {
            history.push_locations(locations.clone());
        }
        history
    }

    #[test]
    fn test_sum_hard_sums_the_rectangle() {
        let f = Fixture::new();
        let locations = [Location::new(1.0, 0.0, 2.0, 2.0), Location::new(0.0, 1.0, 1.0, 1.0)];
        let out = RepresentBuilder::<B>::SumHard.represent(&f.ctx(), &locations);
        assert_eq!(out.dims(), [2, 1, 1]);
        // example 0 rows 1..3 = 2+3+4+5, example 1 cell (0,1) = 9
        assert_eq!(floats(out), vec![14.0, 9.0]);
    }

    #[test]
    fn test_sum_hard_clips_and_handles_empty() {
        let f = Fixture::new();
        let locations = [Location::new(3.0, 0.0, 5.0, 9.0), Location::new(2.0, 0.0, 0.0, 2.0)];
        let out = RepresentBuilder::<B>::SumHard.represent(&f.ctx(), &locations);
        assert_eq!(floats(out), vec![13.0, 0.0]);
    }

    #[test]
    fn test_interaction_copy_hard_keeps_full_query_width() {
        let f = Fixture::new();
        let locations = [Location::new(1.0, 0.0, 2.0, 1.0), Location::new(0.0, 0.0, 2.0, 1.0)];
        let out = RepresentBuilder::<B>::InteractionCopyHard.represent(&f.ctx(), &locations);
        assert_eq!(out.dims(), [2, 2, 2]);
        assert_eq!(floats(out), vec![2.0, 3.0, 4.0, 5.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_variant_output_shapes() {
        let f = Fixture::new();
        let device = Default::default();
        let locations = [Location::new(0.0, 0.0, 3.0, 2.0), Location::new(1.0, 0.0, 1.0, 1.0)];
        let cases = [
            (RepresentPlan::InteractionCnnHardResize { rows: 10, cols: 5 }, [2, 1, 200]),
            (RepresentPlan::InteractionCnnHard { rows: 10, cols: 5 }, [2, 1, 200]),
            (RepresentPlan::RnnHard { rnn_size: 3 }, [2, 1, 1]),
            (RepresentPlan::CnnHard { max_len: 10, separate: false, keep_prob: 1.0 }, [2, 1, 1]),
            (RepresentPlan::Test, [2, 1, 1]),
        ];
        for (plan, dims) in cases {
            let builder: RepresentBuilder<B> = plan.init(2, &device);
            assert_eq!(builder.represent(&f.ctx(), &locations).dims(), dims, "{plan:?}");
        }
    }

    #[test]
    fn test_unchanged_locations_skip_the_builder() {
        let f = Fixture::new();
        let stub = CountingStub { calls: Cell::new(0) };
        let loc = vec![Location::new(1.0, 0.0, 1.0, 2.0), Location::new(0.0, 0.0, 1.0, 1.0)];
        let mut history = history_with(&[loc.clone(), loc]);

        represent_step(&stub, &f.ctx(), &mut history, 0, &[false, false]).unwrap();
        assert_eq!(stub.calls.get(), 1);
        let first = floats(history.states.get(1).unwrap().clone());

        represent_step(&stub, &f.ctx(), &mut history, 1, &[false, false]).unwrap();
        assert_eq!(stub.calls.get(), 1);
        assert_eq!(floats(history.states.get(2).unwrap().clone()), first);
    }

    #[test]
    fn test_partial_reuse_keeps_previous_rows() {
        let f = Fixture::new();
        let stub = CountingStub { calls: Cell::new(0) };
        let step1 = vec![Location::new(1.0, 0.0, 1.0, 2.0), Location::new(0.0, 0.0, 1.0, 1.0)];
        let step2 = vec![Location::new(1.0, 0.0, 1.0, 2.0), Location::new(1.0, 0.0, 1.0, 1.0)];
        let mut history = history_with(&[step1, step2]);

        represent_step(&stub, &f.ctx(), &mut history, 0, &[false, false]).unwrap();
        represent_step(&stub, &f.ctx(), &mut history, 1, &[false, false]).unwrap();
        assert_eq!(stub.calls.get(), 2);
        // example 0 reused 101, example 1 recomputed 1 + 200
        assert_eq!(floats(history.states.get(2).unwrap().clone()), vec![101.0, 201.0]);
    }

    #[test]
    fn test_stopped_examples_read_filler_and_stay_frozen() {
        let f = Fixture::new();
        let stub = CountingStub { calls: Cell::new(0) };
        let step1 = vec![Location::new(2.0, 0.0, 1.0, 2.0), Location::new(0.0, 0.0, 1.0, 1.0)];
        let mut history = history_with(&[step1]);

        represent_step(&stub, &f.ctx(), &mut history, 0, &[false, true]).unwrap();
        // stopped example keeps the zero slot
        assert_eq!(floats(history.states.get(1).unwrap().clone()), vec![102.0, 0.0]);
    }

    #[test]
    fn test_copy_hard_offset_change_is_an_error() {
        let f = Fixture::new();
        let builder = RepresentBuilder::<B>::InteractionCopyHard;
        let step1 = vec![Location::new(0.0, 0.0, 1.0, 2.0); 2];
        let step2 = vec![Location::new(1.0, 0.0, 2.0, 2.0); 2];
        let mut history = history_with(&[step1, step2]);

        represent_step(&builder, &f.ctx(), &mut history, 0, &[false, false]).unwrap();
        let err = represent_step(&builder, &f.ctx(), &mut history, 1, &[false, false]).unwrap_err();
        assert!(matches!(err, ReaderError::ShapeMismatch { stream: "state", .. }));
    }

    #[test]
    fn test_cnn_hard_reuses_branches_independently() {
        let f = Fixture::new();
        let device = Default::default();
        let builder: RepresentBuilder<B> =
            RepresentPlan::CnnHard { max_len: 10, separate: true, keep_prob: 1.0 }.init(2, &device);
        let step1 = vec![Location::new(0.0, 0.0, 2.0, 2.0), Location::new(0.0, 0.0, 1.0, 1.0)];
        let step2 = vec![Location::new(2.0, 0.0, 2.0, 2.0), Location::new(1.0, 0.0, 1.0, 1.0)];
        let mut history = history_with(&[step1, step2]);

        represent_step(&builder, &f.ctx(), &mut history, 0, &[false, false]).unwrap();
        let query_before = floats(history.query.get(1).unwrap().clone());
        represent_step(&builder, &f.ctx(), &mut history, 1, &[false, false]).unwrap();

        // query span unchanged for both examples → query branch copied
        assert_eq!(floats(history.query.get(2).unwrap().clone()), query_before);
        assert_eq!(history.states.get(2).unwrap().dims(), [2, 1, 1]);
    }

    #[test]
    fn test_normalized_box_covers_window() {
        let b = normalized_box(&Location::new(2.0, 0.0, 2.0, 3.0), SizePair::new(4, 3));
        assert_eq!(b, CropBox { y1: 0.5, x1: 0.0, y2: 0.75, x2: 2.0 / 3.0 });
    }
}
