// ============================================================
// Layer 5 — GRU Matcher (rnn_hard)
// ============================================================
// One GRU, shared by the document and the query window:
//
//   doc window   [bs, Wd, dim] ─┐
//                               ├─ GRU → final state at true length
//   query window [bs, Wq, dim] ─┘         [bs, hidden] each
//
//   score = Σ doc_state · query_state   → [bs, 1]
//
// "Final state" means the hidden state after the last real token,
// not after the padding; a zero-length window gives zeros.

use burn::{
    nn::gru::{Gru, GruConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct GruMatcherConfig {
    pub embed_dim: usize,
    pub hidden:    usize,
}

impl GruMatcherConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruMatcher<B> {
        GruMatcher {
            gru:    GruConfig::new(self.embed_dim, self.hidden, true).init(device),
            hidden: self.hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruMatcher<B: Backend> {
    gru:    Gru<B>,
    hidden: usize,
}

impl<B: Backend> GruMatcher<B> {
    /// `[bs, W, dim]` → `[bs, hidden]`, read at `lengths[i] - 1`.
    pub fn final_state(&self, window: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
        let [bs, width, _] = window.dims();
        let device = window.device();
        if bs == 0 || width == 0 {
            return Tensor::zeros([bs, self.hidden], &device);
        }

        let states = self.gru.forward(window, None); // [bs, W, hidden]
        let finals: Vec<Tensor<B, 2>> = lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                if len == 0 {
                    Tensor::zeros([1, self.hidden], &device)
                } else {
                    states
                        .clone()
                        .narrow(0, i, 1)
                        .narrow(1, len.min(width) - 1, 1)
                        .reshape([1, self.hidden])
                }
            })
            .collect();
        Tensor::cat(finals, 0)
    }

    /// Dot product of the two final states → `[bs, 1]`
    pub fn forward(
        &self,
        doc:       Tensor<B, 3>,
        doc_len:   &[usize],
        query:     Tensor<B, 3>,
        query_len: &[usize],
    ) -> Tensor<B, 2> {
        let d = self.final_state(doc, doc_len);
        let q = self.final_state(query, query_len);
        (d * q).sum_dim(1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{floats, TestBackend};

    fn matcher() -> GruMatcher<TestBackend> {
        GruMatcherConfig::new(3, 4).init(&Default::default())
    }

    #[test]
    fn test_zero_length_gives_zero_state() {
        let m = matcher();
        let x = Tensor::<TestBackend, 3>::ones([2, 5, 3], &Default::default());
        let s = m.final_state(x, &[0, 5]);
        assert_eq!(s.dims(), [2, 4]);
        let v = floats(s);
        assert!(v[..4].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_state_ignores_trailing_padding() {
        let m = matcher();
        let device = Default::default();
        let short = Tensor::<TestBackend, 3>::ones([1, 2, 3], &device);
        let padded = Tensor::cat(vec![short.clone(), Tensor::zeros([1, 3, 3], &device)], 1);
        let a = floats(m.final_state(short, &[2]));
        let b = floats(m.final_state(padded, &[2]));
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_score_shape() {
        let m = matcher();
        let device = Default::default();
        let d = Tensor::<TestBackend, 3>::ones([2, 4, 3], &device);
        let q = Tensor::<TestBackend, 3>::ones([2, 2, 3], &device);
        assert_eq!(m.forward(d, &[4, 1], q, &[2, 2]).dims(), [2, 1]);
    }

    #[test]
    fn test_empty_window_scores_zero() {
        let m = matcher();
        let device = Default::default();
        let d = Tensor::<TestBackend, 3>::zeros([1, 0, 3], &device);
        let q = Tensor::<TestBackend, 3>::ones([1, 2, 3], &device);
        assert_eq!(floats(m.forward(d, &[0], q, &[2])), vec![0.0]);
    }
}
