// ============================================================
// Layer 5 — Convolutional Encoders
// ============================================================
// Two encoders share this file:
//
//   InteractionCnn — 2-D, over a (local) match matrix
//       [bs, H, W] → conv 5x5 (1→8) → relu
//                  → optional dynamic-index gather
//                  → max-pool to a 5x5 grid → [bs, 8*5*5]
//
//   DocQueryCnn    — 1-D, over token embeddings (cnn_hard)
//       doc   [bs, L, dim] → conv k=3 (dim→4) → relu → gather
//                          → keep-mask → max-pool /5
//       query [bs, L, dim] → conv k=3 (dim→4) → relu → gather
//                          → max-pool /10
//       concat → dropout → dense(4) relu → dense(1) relu
//
// The query branch reuses the document convolution unless the
// configuration asks for separate weights.
//
// Reference: Burn Book §3 (Building Blocks)
//            Pang et al. (2016) MatchPyramid — dynamic pooling

use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig, Conv2d, Conv2dConfig},
        pool::{MaxPool1d, MaxPool1dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig1d, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::pooling::{gather_1d, gather_2d, pool_index_1d};
use crate::ml::slicer::fit_axis;

// ─── InteractionCnn ───────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct InteractionCnnConfig {
    /// Input rows; must be a multiple of `grid`
    pub rows: usize,
    /// Input columns; must be a multiple of `grid`
    pub cols: usize,
    #[config(default = 8)]
    pub channels: usize,
    #[config(default = 5)]
    pub kernel: usize,
    /// Pooled output is grid x grid per channel
    #[config(default = 5)]
    pub grid: usize,
}

impl InteractionCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> InteractionCnn<B> {
        let conv = Conv2dConfig::new([1, self.channels], [self.kernel, self.kernel])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let window = [self.rows / self.grid, self.cols / self.grid];
        let pool   = MaxPool2dConfig::new(window).with_strides(window).init();
        InteractionCnn { conv, pool, rows: self.rows, cols: self.cols }
    }
}

#[derive(Module, Debug)]
pub struct InteractionCnn<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    rows: usize,
    cols: usize,
}

impl<B: Backend> InteractionCnn<B> {
    /// region: [bs, rows, cols] → [bs, channels * grid * grid]
    pub fn forward(&self, region: Tensor<B, 3>, pool_index: Option<&[(Vec<usize>, Vec<usize>)]>) -> Tensor<B, 2> {
        let [bs, _, _] = region.dims();
        let region = fit_axis(fit_axis(region, 1, self.rows, 0.0), 2, self.cols, 0.0);
        let x = relu(self.conv.forward(region.reshape([bs, 1, self.rows, self.cols])));
        let x = match pool_index {
            Some(index) => gather_2d(x, index),
            None => x,
        };
        self.pool.forward(x).flatten::<2>(1, 3)
    }
}

// ─── DocQueryCnn ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DocQueryCnnConfig {
    pub embed_dim: usize,
    /// Fixed window length both branches are fitted to (max_jump_offset)
    pub max_len: usize,
    #[config(default = 3)]
    pub kernel: usize,
    #[config(default = 4)]
    pub filters: usize,
    #[config(default = 5)]
    pub doc_pool: usize,
    #[config(default = 10)]
    pub query_pool: usize,
    #[config(default = 4)]
    pub hidden: usize,
    /// Give the query branch its own convolution weights
    #[config(default = false)]
    pub separate: bool,
    /// Probability of zeroing an activation before the dense head
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl DocQueryCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DocQueryCnn<B> {
        let conv = || {
            Conv1dConfig::new(self.embed_dim, self.filters, self.kernel)
                .with_padding(PaddingConfig1d::Same)
                .init(device)
        };
        let doc_conv   = conv();
        let query_conv = if self.separate { Some(conv()) } else { None };

        DocQueryCnn {
            doc_conv,
            query_conv,
            doc_pool:   MaxPool1dConfig::new(self.doc_pool).with_stride(self.doc_pool).init(),
            query_pool: MaxPool1dConfig::new(self.query_pool).with_stride(self.query_pool).init(),
            hidden:     LinearConfig::new(self.head_input_dim(), self.hidden).init(device),
            output:     LinearConfig::new(self.hidden, 1).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            max_len:    self.max_len,
        }
    }

    /// Width of the concatenated doc + query features.
    pub fn head_input_dim(&self) -> usize {
        self.filters * (self.max_len / self.doc_pool + self.max_len / self.query_pool)
    }
}

#[derive(Module, Debug)]
pub struct DocQueryCnn<B: Backend> {
    doc_conv:   Conv1d<B>,
    query_conv: Option<Conv1d<B>>,
    doc_pool:   MaxPool1d,
    query_pool: MaxPool1d,
    hidden:     Linear<B>,
    output:     Linear<B>,
    dropout:    Dropout,
    max_len:    usize,
}

impl<B: Backend> DocQueryCnn<B> {
    /// Fixed number of slots the keep-mask covers.
    pub fn slots(&self) -> usize {
        self.max_len
    }

    /// doc_emb [bs, W, dim], keep_mask [bs, max_len] → [bs, filters, max_len / doc_pool]
    pub fn encode_doc(&self, doc_emb: Tensor<B, 3>, lengths: &[usize], keep_mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let features = self.convolve(&self.doc_conv, doc_emb, lengths);
        let [bs, _, slots] = features.dims();
        let masked = features * keep_mask.reshape([bs, 1, slots]);
        self.doc_pool.forward(masked)
    }

    /// query_emb [bs, W, dim] → [bs, filters, max_len / query_pool]
    pub fn encode_query(&self, query_emb: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 3> {
        let conv = self.query_conv.as_ref().unwrap_or(&self.doc_conv);
        self.query_pool.forward(self.convolve(conv, query_emb, lengths))
    }

    /// Dense head over both branches → [bs, 1]
    pub fn score(&self, doc_repr: Tensor<B, 3>, query_repr: Tensor<B, 3>) -> Tensor<B, 2> {
        let joint = Tensor::cat(vec![doc_repr.flatten::<2>(1, 2), query_repr.flatten::<2>(1, 2)], 1);
        let joint = self.dropout.forward(joint);
        relu(self.output.forward(relu(self.hidden.forward(joint))))
    }

    fn convolve(&self, conv: &Conv1d<B>, emb: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 3> {
        // [bs, W, dim] → [bs, dim, max_len]
        let x = fit_axis(emb, 1, self.max_len, 0.0).swap_dims(1, 2);
        let x = relu(conv.forward(x));
        gather_1d(x, &pool_index_1d(lengths, self.max_len))
    }
}
