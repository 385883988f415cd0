//! Vector field conditioning: edge-aware smoothing and forward/backward
//! consistency gating.

use crate::consts::{REJECTION_PENALTY, VECTOR_FILTER_RADIUS};
use crate::error::Result;
use crate::filters::guided::guided_filter;
use crate::filters::morphology::{binarize, erode};
use crate::frame::{Plane, VectorField};

use super::warp::bilinear_sample;
use super::Alignment;

/// Conditioning parameters taken from the window spec.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionParams {
    /// Consistency scores below this are rejected. 0 disables gating.
    pub confidence_threshold: f32,
    /// Sharpness of the consistency score; higher rejects more.
    pub conservativeness: i32,
    /// Guided-filter epsilon for field smoothing. 0 disables smoothing.
    pub vector_filter_strength: f32,
}

/// A forward field ready for warping, plus the optional rejection penalty
/// plane (`REJECTION_PENALTY` where the motion is untrusted, 0 elsewhere).
#[derive(Clone, Debug)]
pub struct ConditionedField {
    pub field: VectorField,
    pub rejection: Option<Plane>,
}

/// Run the conditioning steps the parameters enable.
///
/// `guide` is the filtered-center luminance. The consistency check compares
/// the unsmoothed forward field against the backward field, so it measures
/// the estimator rather than the smoother.
pub fn condition_field(
    alignment: Alignment,
    guide: &Plane,
    params: &ConditionParams,
) -> Result<ConditionedField> {
    alignment.forward.ensure_usable(guide.dim())?;

    let rejection = match (&alignment.backward, params.confidence_threshold > 0.0) {
        (Some(backward), true) => {
            let score = consistency_score(&alignment.forward, backward, params.conservativeness)?;
            Some(rejection_mask(&score, params.confidence_threshold))
        }
        _ => None,
    };

    let field = if params.vector_filter_strength > 0.0 {
        smooth_field(&alignment.forward, guide, params.vector_filter_strength)?
    } else {
        alignment.forward
    };

    Ok(ConditionedField { field, rejection })
}

/// Guided-filter both displacement planes with the center luminance as guide.
pub fn smooth_field(field: &VectorField, guide: &Plane, strength: f32) -> Result<VectorField> {
    field.ensure_usable(guide.dim())?;
    let u = guided_filter(guide, field.u(), VECTOR_FILTER_RADIUS, strength, None);
    let v = guided_filter(guide, field.v(), VECTOR_FILTER_RADIUS, strength, None);
    VectorField::new(u, v)
}

/// Round-trip consistency in (0, 1]: `exp(-|F(p) + B(p + F(p))|² · 2^c)`.
///
/// A perfect forward/backward pair scores 1 everywhere.
pub fn consistency_score(
    forward: &VectorField,
    backward: &VectorField,
    conservativeness: i32,
) -> Result<Plane> {
    let dim = forward.dim();
    forward.ensure_usable(dim)?;
    backward.ensure_usable(dim)?;

    let sharpness = 2f32.powi(conservativeness);
    let (fu, fv) = (forward.u(), forward.v());
    let score = Plane::from_shape_fn(dim, |(row, col)| {
        let du = fu[[row, col]];
        let dv = fv[[row, col]];
        let y = row as f32 + dv;
        let x = col as f32 + du;
        let ru = du + bilinear_sample(backward.u(), y, x);
        let rv = dv + bilinear_sample(backward.v(), y, x);
        (-(ru * ru + rv * rv) * sharpness).exp()
    });
    Ok(score)
}

/// Binarize the score against `threshold`, erode the accepted region by one
/// pixel and return the penalty for everything outside it.
pub fn rejection_mask(score: &Plane, threshold: f32) -> Plane {
    let accepted = erode(&binarize(score, threshold));
    accepted.mapv(|a| (1.0 - a) * REJECTION_PENALTY)
}
