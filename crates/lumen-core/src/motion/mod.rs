pub mod condition;
pub mod hierarchical;
pub mod patch_match;
pub mod phase_correlation;
pub mod pyramid;
pub mod variational;
pub mod warp;

pub use condition::{condition_field, ConditionParams, ConditionedField};
pub use warp::{bilinear_sample, warp_buffer, warp_plane};

use crate::error::{LumenError, Result};
use crate::frame::{Plane, VectorField};

use hierarchical::{hierarchical_patch_match, HierarchicalParams};
use patch_match::{patch_match, PatchMatchParams};
use variational::{variational_flow, DataPenalty, VariationalParams};

/// Motion estimation strategy, resolved from configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum TemporalStrategy {
    PatchMatch(PatchMatchParams),
    HierarchicalPatchMatch(HierarchicalParams),
    HornSchunck(VariationalParams),
    RobustFlow(VariationalParams),
}

impl std::fmt::Display for TemporalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatchMatch(p) => write!(f, "PatchMatch (radius {})", p.match_radius),
            Self::HierarchicalPatchMatch(p) => write!(
                f,
                "Hierarchical PatchMatch ({} levels, radius {})",
                p.levels, p.match_radius
            ),
            Self::HornSchunck(p) => write!(f, "Horn-Schunck (alpha {})", p.alpha),
            Self::RobustFlow(p) => write!(f, "Robust Flow (alpha {})", p.alpha),
        }
    }
}

/// Forward field (candidate → reference) and, when requested, the backward
/// field (reference → candidate).
#[derive(Clone, Debug)]
pub struct Alignment {
    pub forward: VectorField,
    pub backward: Option<VectorField>,
}

/// Dense motion estimation between two single-plane images.
pub trait TemporalAligner: Send + Sync {
    /// Field with `reference(p) ≈ candidate(p + field(p))`.
    fn estimate(&self, reference: &Plane, candidate: &Plane) -> Result<VectorField>;

    /// Forward pass, plus a reverse pass only when `with_backward` is set.
    fn align(
        &self,
        reference: &Plane,
        candidate: &Plane,
        with_backward: bool,
    ) -> Result<Alignment> {
        let forward = self.estimate(reference, candidate)?;
        let backward = if with_backward {
            Some(self.estimate(candidate, reference)?)
        } else {
            None
        };
        Ok(Alignment { forward, backward })
    }
}

impl TemporalAligner for TemporalStrategy {
    fn estimate(&self, reference: &Plane, candidate: &Plane) -> Result<VectorField> {
        let (h, w) = reference.dim();
        if candidate.dim() != (h, w) {
            return Err(LumenError::ShapeMismatch {
                expected_w: w,
                expected_h: h,
                got_w: candidate.ncols(),
                got_h: candidate.nrows(),
            });
        }
        if h == 0 || w == 0 {
            return Ok(VectorField::zeros(h, w));
        }

        match self {
            Self::PatchMatch(params) => Ok(patch_match(reference, candidate, params, None)),
            Self::HierarchicalPatchMatch(params) => {
                hierarchical_patch_match(reference, candidate, params)
            }
            Self::HornSchunck(params) => Ok(variational_flow(
                reference,
                candidate,
                params,
                DataPenalty::Quadratic,
            )),
            Self::RobustFlow(params) => Ok(variational_flow(
                reference,
                candidate,
                params,
                DataPenalty::Charbonnier,
            )),
        }
    }
}
