// ============================================================
// Layer 5 — Batched Region Slicer
// ============================================================
// Cuts one window per example out of a padded batch:
//
//   batch  [bs, L, ...]      start = [1, 0, 3]
//                            length = [2, 4, 1]
//   region [bs, 4, ...]      ← width is max(length) for everyone
//
// Every example receives the full max(length) window; entries
// past its own length are either padding or the data that
// legitimately follows, and the caller masks them. If a window
// would run past the end of the buffer, the buffer is padded on
// axis 1 with `pad_value` first, so the result is always a
// regular [bs, width, ...] tensor.
//
// The functions are generic over rank and element kind so the
// same code cuts token ids [bs, L] (Int), embeddings
// [bs, L, dim] and match matrices [bs, Ld, Lq] (Float).

use burn::tensor::{backend::Backend, Element, ElementConversion, Numeric, Tensor};

/// Extract `[bs, max(length), ...]` windows starting at `start[i]`.
pub fn batch_slice<B, const D: usize, K, E>(
    batch:     Tensor<B, D, K>,
    start:     &[usize],
    length:    &[usize],
    pad_value: E,
) -> Tensor<B, D, K>
where
    B: Backend,
    K: Numeric<B>,
    K::Elem: Element,
    E: ElementConversion + Copy,
{
    let dims  = batch.dims();
    let width = length.iter().copied().max().unwrap_or(0);

    if dims[0] == 0 {
        return batch;
    }
    if width == 0 {
        let mut empty = dims;
        empty[1] = 0;
        return Tensor::zeros(empty, &batch.device());
    }

    // Pad once for the furthest-reaching request in the batch
    let furthest = start.iter().map(|&s| s + width).max().unwrap_or(width);
    let batch    = pad_axis(batch, 1, furthest.saturating_sub(dims[1]), pad_value);

    let windows: Vec<Tensor<B, D, K>> = (0..dims[0])
        .map(|i| {
            batch
                .clone()
                .narrow(0, i, 1)
                .narrow(1, start[i], width)
        })
        .collect();

    Tensor::cat(windows, 0)
}

/// Append `amount` entries of `value` at the end of axis `dim`.
pub fn pad_axis<B, const D: usize, K, E>(
    tensor: Tensor<B, D, K>,
    dim:    usize,
    amount: usize,
    value:  E,
) -> Tensor<B, D, K>
where
    B: Backend,
    K: Numeric<B>,
    K::Elem: Element,
    E: ElementConversion,
{
    if amount == 0 {
        return tensor;
    }
    let mut pad_dims = tensor.dims();
    pad_dims[dim] = amount;
    let pad = Tensor::<B, D, K>::full(pad_dims, value, &tensor.device());
    Tensor::cat(vec![tensor, pad], dim)
}

/// Pad or truncate axis `dim` to exactly `target` entries.
/// Used wherever a variable window feeds a fixed-size encoder.
pub fn fit_axis<B, const D: usize, K, E>(
    tensor: Tensor<B, D, K>,
    dim:    usize,
    target: usize,
    value:  E,
) -> Tensor<B, D, K>
where
    B: Backend,
    K: Numeric<B>,
    K::Elem: Element,
    E: ElementConversion,
{
    let current = tensor.dims()[dim];
    if current == 0 {
        let mut dims = tensor.dims();
        dims[dim] = target;
        Tensor::full(dims, value, &tensor.device())
    } else if current < target {
        pad_axis(tensor, dim, target - current, value)
    } else if current > target {
        tensor.narrow(dim, 0, target)
    } else {
        tensor
    }
}
