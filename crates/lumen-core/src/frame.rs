use ndarray::Array2;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::error::{LumenError, Result};

/// A single-channel 2D sample array, row-major, shape = (height, width).
/// Samples are f32, nominally in [0.0, 1.0] for color data.
pub type Plane = Array2<f32>;

/// An ordered set of same-resolution planes (color channels, optionally
/// followed by an alpha/mask plane).
///
/// A buffer with no planes is "empty" and stands for a value that has not
/// been computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageBuffer {
    planes: Vec<Plane>,
}

impl ImageBuffer {
    pub fn empty() -> Self {
        Self { planes: Vec::new() }
    }

    /// Build a buffer from planes, checking that they all share one shape.
    pub fn new(planes: Vec<Plane>) -> Result<Self> {
        let mut buffer = Self::empty();
        for plane in planes {
            buffer.push(plane)?;
        }
        Ok(buffer)
    }

    /// Buffer of `channels` zero planes.
    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        Self {
            planes: (0..channels).map(|_| Plane::zeros((height, width))).collect(),
        }
    }

    /// Append a plane. The first plane fixes the buffer's dimensions.
    pub fn push(&mut self, plane: Plane) -> Result<()> {
        if let Some(first) = self.planes.first() {
            if first.dim() != plane.dim() {
                return Err(LumenError::ShapeMismatch {
                    expected_w: first.ncols(),
                    expected_h: first.nrows(),
                    got_w: plane.ncols(),
                    got_h: plane.nrows(),
                });
            }
        }
        self.planes.push(plane);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn width(&self) -> usize {
        self.planes.first().map_or(0, |p| p.ncols())
    }

    pub fn height(&self) -> usize {
        self.planes.first().map_or(0, |p| p.nrows())
    }

    /// (height, width), matching ndarray's `dim()` ordering.
    pub fn dim(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }

    /// Split into the leading `color_count` planes and the optional plane
    /// right after them (the mask).
    pub fn split_mask(&self, color_count: usize) -> (&[Plane], Option<&Plane>) {
        let color_count = color_count.min(self.planes.len());
        let (color, rest) = self.planes.split_at(color_count);
        (color, rest.first())
    }

    /// Apply `f` to every plane, producing a new buffer of the same shape.
    pub fn map_planes<F>(&self, f: F) -> Self
    where
        F: Fn(&Plane) -> Plane,
    {
        Self {
            planes: self.planes.iter().map(f).collect(),
        }
    }
}

/// Dense per-pixel displacement field.
///
/// A forward field `F` aligning a candidate `N` to a reference `C` satisfies
/// `C(x, y) ≈ N(x + u(x, y), y + v(x, y))`.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    u: Plane,
    v: Plane,
    valid: bool,
}

impl VectorField {
    pub fn new(u: Plane, v: Plane) -> Result<Self> {
        if u.dim() != v.dim() {
            return Err(LumenError::ShapeMismatch {
                expected_w: u.ncols(),
                expected_h: u.nrows(),
                got_w: v.ncols(),
                got_h: v.nrows(),
            });
        }
        Ok(Self { u, v, valid: true })
    }

    /// Identity field (no motion).
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            u: Plane::zeros((height, width)),
            v: Plane::zeros((height, width)),
            valid: true,
        }
    }

    /// Uniform translation.
    pub fn constant(height: usize, width: usize, dx: f32, dy: f32) -> Self {
        Self {
            u: Plane::from_elem((height, width), dx),
            v: Plane::from_elem((height, width), dy),
            valid: true,
        }
    }

    /// A field that carries no data.
    pub fn invalid() -> Self {
        Self {
            u: Plane::zeros((0, 0)),
            v: Plane::zeros((0, 0)),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn dim(&self) -> (usize, usize) {
        self.u.dim()
    }

    pub fn u(&self) -> &Plane {
        &self.u
    }

    pub fn v(&self) -> &Plane {
        &self.v
    }

    pub fn into_parts(self) -> (Plane, Plane) {
        (self.u, self.v)
    }

    /// Fail with `InvalidVectorField` unless the field is valid and matches
    /// the given frame dimensions.
    pub fn ensure_usable(&self, dim: (usize, usize)) -> Result<()> {
        if !self.valid {
            return Err(LumenError::InvalidVectorField);
        }
        if self.u.dim() != dim {
            return Err(LumenError::ShapeMismatch {
                expected_w: dim.1,
                expected_h: dim.0,
                got_w: self.u.ncols(),
                got_h: self.u.nrows(),
            });
        }
        Ok(())
    }

    /// Per-pixel displacement magnitude.
    pub fn magnitude(&self) -> Plane {
        let mut mag = self.u.clone();
        ndarray::Zip::from(&mut mag)
            .and(&self.v)
            .for_each(|m, &v| *m = (*m * *m + v * v).sqrt());
        mag
    }
}

/// Luminance of a set of color planes: BT.601 weights for three or more
/// planes, the plane itself for one, the plain mean otherwise.
pub fn luminance(color: &[Plane]) -> Plane {
    match color.len() {
        0 => Plane::zeros((0, 0)),
        1 => color[0].clone(),
        2 => (&color[0] + &color[1]) * 0.5,
        _ => {
            let mut lum = &color[0] * LUMINANCE_R;
            lum.scaled_add(LUMINANCE_G, &color[1]);
            lum.scaled_add(LUMINANCE_B, &color[2]);
            lum
        }
    }
}

/// Map a plane into the log domain with `ln(1 + x)`; negative samples are
/// clamped to zero first.
pub fn to_log_domain(plane: &Plane) -> Plane {
    plane.mapv(|v| v.max(0.0).ln_1p())
}

/// Inverse of [`to_log_domain`].
pub fn from_log_domain(plane: &Plane) -> Plane {
    plane.mapv(f32::exp_m1)
}
