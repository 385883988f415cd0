//! Coarse-to-fine variational optical flow.
//!
//! Two data penalties share one solver: the quadratic Horn–Schunck term and
//! a Charbonnier (robust L1-like) term solved by iterative reweighting.
//! Each pyramid level warps the candidate by the current field, linearizes
//! the brightness constancy constraint around it and runs Jacobi sweeps on
//! the increment.

use serde::{Deserialize, Serialize};

use crate::consts::CHARBONNIER_EPSILON;
use crate::frame::{Plane, VectorField};

use super::pyramid::{build_pyramid, upsample_field};
use super::warp::warp_unchecked;

/// Jacobi sweeps per warping pass.
const JACOBI_SWEEPS: usize = 30;

/// Parameters shared by both variational solvers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariationalParams {
    /// Smoothness weight. Larger values produce smoother fields.
    pub alpha: f32,
    /// Warping passes per pyramid level.
    pub iterations: usize,
    /// Downsampled pyramid levels on top of the original resolution.
    pub levels: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataPenalty {
    Quadratic,
    Charbonnier,
}

/// Estimate a field with `reference(p) ≈ candidate(p + field(p))`.
pub fn variational_flow(
    reference: &Plane,
    candidate: &Plane,
    params: &VariationalParams,
    penalty: DataPenalty,
) -> VectorField {
    let ref_pyramid = build_pyramid(reference, params.levels);
    let cand_pyramid = build_pyramid(candidate, params.levels);
    let coarsest = ref_pyramid.len().min(cand_pyramid.len()) - 1;

    let (ch, cw) = ref_pyramid[coarsest].dim();
    let mut field = VectorField::zeros(ch, cw);

    for level in (0..=coarsest).rev() {
        let ref_level = &ref_pyramid[level];
        let cand_level = &cand_pyramid[level];
        let (h, w) = ref_level.dim();
        if field.dim() != (h, w) {
            field = upsample_field(&field, h, w);
        }
        for _ in 0..params.iterations.max(1) {
            field = refine(ref_level, cand_level, field, params.alpha, penalty);
        }
    }

    field
}

/// One warping pass: linearize around `field` and solve for the total flow.
fn refine(
    reference: &Plane,
    candidate: &Plane,
    field: VectorField,
    alpha: f32,
    penalty: DataPenalty,
) -> VectorField {
    let (h, w) = reference.dim();
    let warped = warp_unchecked(candidate, &field);
    let (gx_w, gy_w) = gradients(&warped);
    let (gx_r, gy_r) = gradients(reference);
    let ix = (&gx_w + &gx_r) * 0.5;
    let iy = (&gy_w + &gy_r) * 0.5;
    let it = &warped - reference;

    let (u0, v0) = field.into_parts();
    let mut u = u0.clone();
    let mut v = v0.clone();
    let alpha2 = alpha * alpha;

    for _ in 0..JACOBI_SWEEPS {
        let u_bar = neighbor_average(&u);
        let v_bar = neighbor_average(&v);
        for row in 0..h {
            for col in 0..w {
                let gx = ix[[row, col]];
                let gy = iy[[row, col]];
                let du0 = u0[[row, col]];
                let dv0 = v0[[row, col]];
                let weight = match penalty {
                    DataPenalty::Quadratic => 1.0,
                    DataPenalty::Charbonnier => {
                        let r = gx * (u[[row, col]] - du0) + gy * (v[[row, col]] - dv0)
                            + it[[row, col]];
                        // Scaled to at most 1 so alpha balances the same way
                        // as in the quadratic solver.
                        CHARBONNIER_EPSILON
                            / (r * r + CHARBONNIER_EPSILON * CHARBONNIER_EPSILON).sqrt()
                    }
                };
                let ub = u_bar[[row, col]];
                let vb = v_bar[[row, col]];
                let residual = gx * (ub - du0) + gy * (vb - dv0) + it[[row, col]];
                let t = weight * residual / (alpha2 + weight * (gx * gx + gy * gy));
                u[[row, col]] = ub - gx * t;
                v[[row, col]] = vb - gy * t;
            }
        }
    }

    VectorField::new(u, v).unwrap_or_else(|_| VectorField::zeros(h, w))
}

/// Central-difference gradients with one-sided differences at the border.
fn gradients(data: &Plane) -> (Plane, Plane) {
    let (h, w) = data.dim();
    let gx = Plane::from_shape_fn((h, w), |(r, c)| {
        let c0 = c.saturating_sub(1);
        let c1 = (c + 1).min(w - 1);
        if c1 == c0 {
            0.0
        } else {
            (data[[r, c1]] - data[[r, c0]]) / (c1 - c0) as f32
        }
    });
    let gy = Plane::from_shape_fn((h, w), |(r, c)| {
        let r0 = r.saturating_sub(1);
        let r1 = (r + 1).min(h - 1);
        if r1 == r0 {
            0.0
        } else {
            (data[[r1, c]] - data[[r0, c]]) / (r1 - r0) as f32
        }
    });
    (gx, gy)
}

/// Mean of the 4-connected neighbors (edges replicate).
fn neighbor_average(data: &Plane) -> Plane {
    let (h, w) = data.dim();
    Plane::from_shape_fn((h, w), |(r, c)| {
        let up = data[[r.saturating_sub(1), c]];
        let down = data[[(r + 1).min(h - 1), c]];
        let left = data[[r, c.saturating_sub(1)]];
        let right = data[[r, (c + 1).min(w - 1)]];
        0.25 * (up + down + left + right)
    })
}
