// ============================================================
// Layer 5 — Length-aware Keep Mask
// ============================================================
// The cnn_hard document branch drops pooled slots at random
// before max-pooling. Short documents keep more of their slots:
//
//   p = clamp(min(ceil(slots² / doc_len), slots) / 50, 0, 1)
//
// The mask is drawn per slot, per example and per step from a
// seeded StdRng, so a read is reproducible for a fixed seed.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::{rngs::StdRng, Rng, SeedableRng};

// Normaliser of the keep probability
const KEEP_SCALE: f64 = 50.0;

/// Probability that one of `slots` pooled positions survives for a
/// document of `doc_len` tokens.
pub fn keep_probability(slots: usize, doc_len: usize) -> f64 {
    let slots = slots as f64;
    let expected = if doc_len == 0 {
        slots
    } else {
        (slots * slots / doc_len as f64).ceil().min(slots)
    };
    (expected / KEEP_SCALE).clamp(0.0, 1.0)
}

#[derive(Debug)]
pub struct MaskSampler {
    rng:     StdRng,
    enabled: bool,
}

impl MaskSampler {
    pub fn new(seed: u64, enabled: bool) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), enabled }
    }

    /// Host-side 0/1 mask, row-major `[doc_lens.len(), slots]`.
    pub fn sample(&mut self, doc_lens: &[usize], slots: usize) -> Vec<f32> {
        if !self.enabled {
            return vec![1.0; doc_lens.len() * slots];
        }
        let mut mask = Vec::with_capacity(doc_lens.len() * slots);
        for &len in doc_lens {
            let p = keep_probability(slots, len);
            mask.extend((0..slots).map(|_| if self.rng.gen_bool(p) { 1.0 } else { 0.0 }));
        }
        mask
    }

    pub fn sample_tensor<B: Backend>(&mut self, doc_lens: &[usize], slots: usize, device: &B::Device) -> Tensor<B, 2> {
        let mask = self.sample(doc_lens, slots);
        Tensor::from_data(TensorData::new(mask, [doc_lens.len(), slots]), device)
    }
}
