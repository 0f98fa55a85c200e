// ============================================================
// Layer 5 — Crop and Resize
// ============================================================
// Bilinear crop of a box out of each example's match matrix,
// resampled onto a fixed grid. Boxes use normalized coordinates
// relative to the padded extent (0.0 = first row, 1.0 = last
// row), like TF's crop_and_resize. Samples that land outside the
// matrix read 0.
//
// Built from select + weighted sums so it stays an ordinary
// differentiable tensor expression.

use burn::prelude::*;

/// Normalized box: (y1, x1) top-left, (y2, x2) bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub y1: f32,
    pub x1: f32,
    pub y2: f32,
    pub x2: f32,
}

// One output sample along an axis: blend of two source
// positions, or nothing at all when out of range.
struct AxisSample {
    lo:   usize,
    hi:   usize,
    w_lo: f32,
    w_hi: f32,
}

fn sample_axis(v1: f32, v2: f32, extent: usize, n: usize) -> Vec<AxisSample> {
    let last = extent.saturating_sub(1) as f32;
    (0..n)
        .map(|i| {
            let pos = if n > 1 {
                v1 * last + i as f32 * (v2 - v1) * last / (n - 1) as f32
            } else {
                0.5 * (v1 + v2) * last
            };
            if extent == 0 || pos < 0.0 || pos > last {
                return AxisSample { lo: 0, hi: 0, w_lo: 0.0, w_hi: 0.0 };
            }
            let lo   = pos.floor();
            let frac = pos - lo;
            let hi   = pos.ceil().min(last);
            AxisSample { lo: lo as usize, hi: hi as usize, w_lo: 1.0 - frac, w_hi: frac }
        })
        .collect()
}

/// `[bs, H, W]` → `[bs, crop[0], crop[1]]`, one box per example.
pub fn crop_and_resize<B: Backend>(images: Tensor<B, 3>, boxes: &[CropBox], crop: [usize; 2]) -> Tensor<B, 3> {
    let [bs, height, width] = images.dims();
    let device = images.device();
    if bs == 0 || height == 0 || width == 0 {
        return Tensor::zeros([bs, crop[0], crop[1]], &device);
    }

    let crops: Vec<Tensor<B, 3>> = boxes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let rows  = sample_axis(b.y1, b.y2, height, crop[0]);
            let cols  = sample_axis(b.x1, b.x2, width, crop[1]);
            let image = images.clone().narrow(0, i, 1).reshape([height, width]);

            // Blend along rows: [crop_h, W]
            let (lo, hi, w_lo, w_hi) = axis_tensors::<B>(&rows, &device);
            let blended = image.clone().select(0, lo) * w_lo.reshape([crop[0], 1])
                + image.select(0, hi) * w_hi.reshape([crop[0], 1]);

            // Then along columns: [crop_h, crop_w]
            let (lo, hi, w_lo, w_hi) = axis_tensors::<B>(&cols, &device);
            let out = blended.clone().select(1, lo) * w_lo.reshape([1, crop[1]])
                + blended.select(1, hi) * w_hi.reshape([1, crop[1]]);
            out.reshape([1, crop[0], crop[1]])
        })
        .collect();

    Tensor::cat(crops, 0)
}

fn axis_tensors<B: Backend>(
    samples: &[AxisSample],
    device:  &B::Device,
) -> (Tensor<B, 1, Int>, Tensor<B, 1, Int>, Tensor<B, 1>, Tensor<B, 1>) {
    let lo: Vec<i32>   = samples.iter().map(|s| s.lo as i32).collect();
    let hi: Vec<i32>   = samples.iter().map(|s| s.hi as i32).collect();
    let w_lo: Vec<f32> = samples.iter().map(|s| s.w_lo).collect();
    let w_hi: Vec<f32> = samples.iter().map(|s| s.w_hi).collect();
    (
        Tensor::<B, 1, Int>::from_ints(lo.as_slice(), device),
        Tensor::<B, 1, Int>::from_ints(hi.as_slice(), device),
        Tensor::<B, 1>::from_floats(w_lo.as_slice(), device),
        Tensor::<B, 1>::from_floats(w_hi.as_slice(), device),
    )
}
