//! Deterministic PatchMatch.
//!
//! Each pixel keeps an integer displacement and the SSD of the patch it
//! points at. Iterations alternate scan direction; every pixel first tries
//! its already-visited neighbors' displacements (propagation), then an
//! exponentially shrinking ring of candidates around its current best.
//! No randomness is involved, so repeated runs give identical fields.

use serde::{Deserialize, Serialize};

use crate::frame::{Plane, VectorField};

/// Parameters for patch-match alignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchMatchParams {
    /// Maximum displacement searched, in pixels, per axis.
    pub match_radius: usize,
    /// Patch half-size used for the SSD cost.
    pub patch_radius: usize,
    /// Propagation/search sweeps over the image.
    pub iterations: usize,
}

const SEARCH_DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

struct Matcher<'a> {
    reference: &'a Plane,
    candidate: &'a Plane,
    patch_radius: i64,
    h: i64,
    w: i64,
}

impl Matcher<'_> {
    /// SSD between the reference patch at `(row, col)` and the candidate
    /// patch displaced by `(dy, dx)`; coordinates clamp to the image.
    fn cost(&self, row: usize, col: usize, (dy, dx): (i32, i32)) -> f32 {
        let pr = self.patch_radius;
        let mut sum = 0.0f32;
        for oy in -pr..=pr {
            let ry = (row as i64 + oy).clamp(0, self.h - 1);
            let cy = (ry + dy as i64).clamp(0, self.h - 1);
            for ox in -pr..=pr {
                let rx = (col as i64 + ox).clamp(0, self.w - 1);
                let cx = (rx + dx as i64).clamp(0, self.w - 1);
                let d = self.reference[[ry as usize, rx as usize]]
                    - self.candidate[[cy as usize, cx as usize]];
                sum += d * d;
            }
        }
        sum
    }
}

/// Estimate a field with `reference(p) ≈ candidate(p + field(p))`.
///
/// With `init`, displacements start from the (rounded) initial field and
/// the search is confined to `init ± match_radius`.
pub fn patch_match(
    reference: &Plane,
    candidate: &Plane,
    params: &PatchMatchParams,
    init: Option<&VectorField>,
) -> VectorField {
    let (h, w) = reference.dim();
    let n = h * w;
    if n == 0 {
        return VectorField::zeros(h, w);
    }

    let matcher = Matcher {
        reference,
        candidate,
        patch_radius: params.patch_radius as i64,
        h: h as i64,
        w: w as i64,
    };
    let bound = params.match_radius as i32;

    let base: Vec<(i32, i32)> = match init {
        Some(field) if field.dim() == (h, w) => field
            .v()
            .iter()
            .zip(field.u().iter())
            .map(|(&dy, &dx)| (dy.round() as i32, dx.round() as i32))
            .collect(),
        _ => vec![(0, 0); n],
    };
    let mut disp = base.clone();
    let mut cost: Vec<f32> = (0..n)
        .map(|idx| matcher.cost(idx / w, idx % w, disp[idx]))
        .collect();

    let within = |idx: usize, d: (i32, i32)| {
        (d.0 - base[idx].0).abs() <= bound && (d.1 - base[idx].1).abs() <= bound
    };

    for iter in 0..params.iterations {
        let forward = iter % 2 == 0;
        let step: i64 = if forward { -1 } else { 1 };

        for k in 0..n {
            let idx = if forward { k } else { n - 1 - k };
            let (row, col) = (idx / w, idx % w);
            let mut best = disp[idx];
            let mut best_cost = cost[idx];

            let consider = |d: (i32, i32), best: &mut (i32, i32), best_cost: &mut f32| {
                if d != *best && within(idx, d) {
                    let c = matcher.cost(row, col, d);
                    if c < *best_cost {
                        *best = d;
                        *best_cost = c;
                    }
                }
            };

            // Propagation from neighbors already visited in this sweep
            let nc = col as i64 + step;
            if nc >= 0 && nc < w as i64 {
                consider(disp[row * w + nc as usize], &mut best, &mut best_cost);
            }
            let nr = row as i64 + step;
            if nr >= 0 && nr < h as i64 {
                consider(disp[nr as usize * w + col], &mut best, &mut best_cost);
            }

            // Structured search around the current best
            let mut radius = bound;
            while radius >= 1 {
                let center = best;
                for (sy, sx) in SEARCH_DIRECTIONS {
                    let d = (center.0 + sy * radius, center.1 + sx * radius);
                    consider(d, &mut best, &mut best_cost);
                }
                radius /= 2;
            }

            disp[idx] = best;
            cost[idx] = best_cost;
        }
    }

    let u = Plane::from_shape_fn((h, w), |(r, c)| disp[r * w + c].1 as f32);
    let v = Plane::from_shape_fn((h, w), |(r, c)| disp[r * w + c].0 as f32);
    VectorField::new(u, v).unwrap_or_else(|_| VectorField::zeros(h, w))
}
