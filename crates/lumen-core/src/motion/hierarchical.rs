//! Coarse-to-fine patch-match over a Gaussian pyramid.
//!
//! The coarsest level is searched with the full match radius (optionally
//! seeded by the FFT global translation); every finer level only refines the
//! upsampled field within a small radius.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::frame::{Plane, VectorField};

use super::patch_match::{patch_match, PatchMatchParams};
use super::phase_correlation::global_translation;
use super::pyramid::{build_pyramid, upsample_field};

/// Refinement radius used on every level below the coarsest.
const REFINE_RADIUS: usize = 2;

/// Parameters for hierarchical patch-match alignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalParams {
    /// Downsampled pyramid levels on top of the original resolution.
    pub levels: usize,
    /// Search radius at the coarsest level, in coarse pixels.
    pub match_radius: usize,
    pub patch_radius: usize,
    pub iterations: usize,
    /// Seed the coarsest level with the FFT phase-correlation translation.
    pub global_prior: bool,
}

pub fn hierarchical_patch_match(
    reference: &Plane,
    candidate: &Plane,
    params: &HierarchicalParams,
) -> Result<VectorField> {
    let ref_pyramid = build_pyramid(reference, params.levels);
    let cand_pyramid = build_pyramid(candidate, params.levels);
    let coarsest = ref_pyramid.len().min(cand_pyramid.len()) - 1;

    let (ch, cw) = ref_pyramid[coarsest].dim();
    let mut field = if params.global_prior {
        let (dx, dy) = global_translation(reference, candidate)?;
        let scale = (1usize << coarsest) as f32;
        debug!(dx, dy, "Global translation prior");
        VectorField::constant(ch, cw, dx / scale, dy / scale)
    } else {
        VectorField::zeros(ch, cw)
    };

    for level in (0..=coarsest).rev() {
        let ref_level = &ref_pyramid[level];
        let (h, w) = ref_level.dim();
        if field.dim() != (h, w) {
            field = upsample_field(&field, h, w);
        }

        let level_params = PatchMatchParams {
            match_radius: if level == coarsest {
                params.match_radius
            } else {
                REFINE_RADIUS.min(params.match_radius.max(1))
            },
            patch_radius: params.patch_radius,
            iterations: params.iterations,
        };
        field = patch_match(ref_level, &cand_pyramid[level], &level_params, Some(&field));
    }

    Ok(field)
}
