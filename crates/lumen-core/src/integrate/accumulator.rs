use crate::error::{LumenError, Result};
use crate::frame::{ImageBuffer, Plane};

/// Running per-channel sum, sample count and integration amount for one
/// output frame.
///
/// Starts empty; the first `accumulate` fixes the shape. Partial
/// accumulators from independent neighbor offsets can be `merge`d in any
/// order.
#[derive(Clone, Debug, Default)]
pub struct TemporalAccumulator {
    sum: ImageBuffer,
    count: f32,
    integration: Option<Plane>,
}

impl TemporalAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight * sample` to the running sum and `weight` to the count.
    pub fn accumulate(&mut self, sample: &ImageBuffer, weight: f32) -> Result<()> {
        if self.sum.is_empty() {
            self.sum = sample.map_planes(|p| p * weight);
        } else {
            self.check_shape(sample)?;
            for (i, plane) in sample.planes().iter().enumerate() {
                self.sum.plane_mut(i).scaled_add(weight, plane);
            }
        }
        self.count += weight;
        Ok(())
    }

    /// Add a per-pixel acceptance count into the integration amount.
    pub fn add_integration(&mut self, accepted: &Plane) -> Result<()> {
        match &mut self.integration {
            Some(total) => {
                if total.dim() != accepted.dim() {
                    return Err(shape_error(total, accepted));
                }
                *total += accepted;
            }
            None => self.integration = Some(accepted.clone()),
        }
        Ok(())
    }

    /// Combine two partial accumulations.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        if !other.sum.is_empty() {
            if self.sum.is_empty() {
                self.sum = other.sum;
            } else {
                self.check_shape(&other.sum)?;
                for (i, plane) in other.sum.planes().iter().enumerate() {
                    *self.sum.plane_mut(i) += plane;
                }
            }
        }
        self.count += other.count;
        if let Some(integration) = other.integration {
            self.add_integration(&integration)?;
        }
        Ok(self)
    }

    pub fn count(&self) -> f32 {
        self.count
    }

    pub fn integration(&self) -> Option<&Plane> {
        self.integration.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.sum.is_empty()
    }

    /// Mean of the accumulated samples (the single contribution unchanged
    /// when the count does not exceed 1), with the integration amount
    /// normalized by `(count - 1) * channels` appended as an extra plane.
    pub fn finalize(self) -> Result<ImageBuffer> {
        if self.sum.is_empty() {
            return Err(LumenError::EmptySequence);
        }
        let channels = self.sum.plane_count();
        let count = self.count;
        let mut output = if count > 1.0 {
            self.sum.map_planes(|p| p / count)
        } else {
            self.sum
        };

        if let Some(integration) = self.integration {
            let divisor = (count - 1.0) * channels as f32;
            let normalized = if divisor > 0.0 {
                integration / divisor
            } else {
                integration
            };
            output.push(normalized)?;
        }
        Ok(output)
    }

    fn check_shape(&self, sample: &ImageBuffer) -> Result<()> {
        if sample.plane_count() != self.sum.plane_count() {
            return Err(LumenError::Config(format!(
                "cannot accumulate {} planes into {}",
                sample.plane_count(),
                self.sum.plane_count()
            )));
        }
        if sample.dim() != self.sum.dim() {
            return Err(LumenError::ShapeMismatch {
                expected_w: self.sum.width(),
                expected_h: self.sum.height(),
                got_w: sample.width(),
                got_h: sample.height(),
            });
        }
        Ok(())
    }
}

fn shape_error(expected: &Plane, got: &Plane) -> LumenError {
    LumenError::ShapeMismatch {
        expected_w: expected.ncols(),
        expected_h: expected.nrows(),
        got_w: got.ncols(),
        got_h: got.nrows(),
    }
}
