//! À trous (starlet) wavelet denoising.
//!
//! The plane is split into detail layers by repeated B3 smoothing with a
//! dilation of `2^scale`; each layer is soft-thresholded and the layers are
//! summed back onto the residual.

use crate::consts::B3_KERNEL;
use crate::frame::Plane;

/// Decompose a plane into wavelet detail layers + residual.
///
/// The original can be reconstructed as `sum(detail_layers) + residual`.
pub fn decompose(data: &Plane, num_layers: usize) -> (Vec<Plane>, Plane) {
    let mut layers = Vec::with_capacity(num_layers);
    let mut current = data.clone();

    for scale in 0..num_layers {
        let smoothed = atrous_convolve(&current, scale);
        layers.push(&current - &smoothed);
        current = smoothed;
    }

    (layers, current)
}

/// Soft-threshold every detail layer and rebuild the plane.
///
/// `thresholds[i]` applies to layer `i`; missing entries leave the layer
/// untouched. With a `weight` plane, low-weight samples are thresholded more
/// strongly: the effective threshold is `t * (2 - w)` for `w` in [0, 1].
pub fn wavelet_denoise(
    data: &Plane,
    num_layers: usize,
    thresholds: &[f32],
    weight: Option<&Plane>,
) -> Plane {
    let (layers, residual) = decompose(data, num_layers);
    let mut result = residual;

    for (i, layer) in layers.iter().enumerate() {
        let threshold = thresholds.get(i).copied().unwrap_or(0.0);
        if threshold <= 0.0 {
            result += layer;
            continue;
        }
        let denoised = match weight {
            Some(w) => ndarray::Zip::from(layer)
                .and(w)
                .map_collect(|&v, &wt| soft_threshold(v, threshold * (2.0 - wt.clamp(0.0, 1.0)))),
            None => layer.mapv(|v| soft_threshold(v, threshold)),
        };
        result += &denoised;
    }

    result
}

/// `sign(v) * max(0, |v| - t)`
fn soft_threshold(v: f32, t: f32) -> f32 {
    let abs_v = v.abs();
    if abs_v <= t {
        0.0
    } else {
        v.signum() * (abs_v - t)
    }
}

/// B3 convolution at a given scale, reading input at intervals of 2^scale.
fn atrous_convolve(data: &Plane, scale: usize) -> Plane {
    let step = 1usize << scale;
    let row_convolved = convolve_dilated(data, step, true);
    convolve_dilated(&row_convolved, step, false)
}

fn convolve_dilated(data: &Plane, step: usize, along_rows: bool) -> Plane {
    let (h, w) = data.dim();
    let mut result = Plane::zeros((h, w));
    let half = (B3_KERNEL.len() / 2) as isize;

    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0f32;
            for (ki, &kv) in B3_KERNEL.iter().enumerate() {
                let offset = (ki as isize - half) * step as isize;
                sum += if along_rows {
                    data[[row, mirror_index(col as isize + offset, w)]]
                } else {
                    data[[mirror_index(row as isize + offset, h), col]]
                } * kv;
            }
            result[[row, col]] = sum;
        }
    }

    result
}

/// Mirror boundary handling: reflect index into [0, size).
pub fn mirror_index(idx: isize, size: usize) -> usize {
    if size <= 1 {
        return 0;
    }
    let period = 2 * size;
    let m = idx.unsigned_abs() % period;

    if m < size {
        m
    } else {
        2 * size - 1 - m
    }
}
