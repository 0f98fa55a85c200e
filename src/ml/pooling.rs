// ============================================================
// Layer 5 — Dynamic Pooling Index
// ============================================================
// A fixed-size max-pool over a padded feature map would mostly
// pool padding for short inputs. Dynamic pooling first stretches
// the true content over the whole padded extent, then pools:
//
//   true length 3, max length 6
//   index:  [0, 0, 1, 1, 2, 2]
//
// Output slot i reads source position floor(i * len / max).
// A zero length maps every slot to position 0.

use burn::prelude::*;

/// Per-example index map for one axis.
pub fn pool_index_1d(lengths: &[usize], max_len: usize) -> Vec<Vec<usize>> {
    lengths.iter().map(|&len| axis_index(len, max_len)).collect()
}

/// Per-example (row map, column map) pair.
pub fn pool_index_2d(
    len_a: &[usize],
    len_b: &[usize],
    max_a: usize,
    max_b: usize,
) -> Vec<(Vec<usize>, Vec<usize>)> {
    len_a
        .iter()
        .zip(len_b)
        .map(|(&a, &b)| (axis_index(a, max_a), axis_index(b, max_b)))
        .collect()
}

fn axis_index(len: usize, max_len: usize) -> Vec<usize> {
    let len = len.min(max_len);
    (0..max_len).map(|i| i * len / max_len).collect()
}

/// Rearrange `[bs, c, L]` along the last axis with a 1-D index map.
pub fn gather_1d<B: Backend>(features: Tensor<B, 3>, index: &[Vec<usize>]) -> Tensor<B, 3> {
    let device = features.device();
    let parts: Vec<Tensor<B, 3>> = index
        .iter()
        .enumerate()
        .map(|(i, idx)| {
            features
                .clone()
                .narrow(0, i, 1)
                .select(2, index_tensor::<B>(idx, &device))
        })
        .collect();
    Tensor::cat(parts, 0)
}

/// Rearrange `[bs, c, H, W]` along both spatial axes.
pub fn gather_2d<B: Backend>(features: Tensor<B, 4>, index: &[(Vec<usize>, Vec<usize>)]) -> Tensor<B, 4> {
    let device = features.device();
    let parts: Vec<Tensor<B, 4>> = index
        .iter()
        .enumerate()
        .map(|(i, (rows, cols))| {
            features
                .clone()
                .narrow(0, i, 1)
                .select(2, index_tensor::<B>(rows, &device))
                .select(3, index_tensor::<B>(cols, &device))
        })
        .collect();
    Tensor::cat(parts, 0)
}

fn index_tensor<B: Backend>(idx: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = idx.iter().map(|&i| i as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}
