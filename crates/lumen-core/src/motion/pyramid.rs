use crate::consts::{MIN_PYRAMID_SIDE, PYRAMID_BLUR_SIGMA};
use crate::filters::gaussian_blur::gaussian_blur;
use crate::frame::{Plane, VectorField};

use super::warp::bilinear_sample;

/// Build a Gaussian pyramid with at most `levels` downsampled levels.
///
/// Index 0 is the original; the last entry is the coarsest. Downsampling
/// stops early once a level would drop below `MIN_PYRAMID_SIDE`.
pub fn build_pyramid(data: &Plane, levels: usize) -> Vec<Plane> {
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(data.clone());

    let mut current = data.clone();
    for _ in 0..levels {
        let (h, w) = current.dim();
        if h.min(w) / 2 < MIN_PYRAMID_SIDE {
            break;
        }
        let blurred = gaussian_blur(&current, PYRAMID_BLUR_SIGMA);
        current = downsample_2x(&blurred);
        pyramid.push(current.clone());
    }

    pyramid
}

/// Downsample by 2x by taking every other pixel.
pub fn downsample_2x(data: &Plane) -> Plane {
    let (h, w) = data.dim();
    let new_h = h.div_ceil(2);
    let new_w = w.div_ceil(2);
    Plane::from_shape_fn((new_h, new_w), |(r, c)| data[[r * 2, c * 2]])
}

/// Bring a coarse-level field up to `(h, w)`, doubling the displacements.
pub fn upsample_field(field: &VectorField, h: usize, w: usize) -> VectorField {
    let scale = |p: &Plane| {
        Plane::from_shape_fn((h, w), |(r, c)| {
            2.0 * bilinear_sample(p, r as f32 / 2.0, c as f32 / 2.0)
        })
    };
    VectorField::new(scale(field.u()), scale(field.v()))
        .unwrap_or_else(|_| VectorField::zeros(h, w))
}
