use std::path::{Path, PathBuf};

use image::{ImageBuffer as RawImage, Luma, Rgb, RgbImage};
use tracing::warn;

use crate::frame::{Plane, VectorField};

/// Receives intermediate results of the trust decision for diagnostics.
///
/// All methods default to no-ops; with no observer installed the decision
/// has no side effects.
pub trait DecisionObserver: Send + Sync {
    /// The conditioned forward field used to warp neighbor `frame + offset`.
    fn on_vector_field(&self, _frame: i64, _offset: i64, _field: &VectorField) {}

    /// The smoothed, penalized error plane compared against the threshold.
    fn on_error_map(&self, _frame: i64, _offset: i64, _channel: usize, _error: &Plane) {}
}

pub struct NoOpObserver;
impl DecisionObserver for NoOpObserver {}

/// Writes colorized vector fields (and optionally error maps) as PNG files.
///
/// Write failures are logged and otherwise ignored so diagnostics never
/// abort a frame.
pub struct VectorDumpObserver {
    dir: PathBuf,
    error_maps: bool,
}

impl VectorDumpObserver {
    pub fn new(dir: impl Into<PathBuf>, error_maps: bool) -> Self {
        Self {
            dir: dir.into(),
            error_maps,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DecisionObserver for VectorDumpObserver {
    fn on_vector_field(&self, frame: i64, offset: i64, field: &VectorField) {
        let path = self.dir.join(format!("vectors.{frame:05}.{offset:+03}.png"));
        if let Err(e) = colorize_field(field).save(&path) {
            warn!(path = %path.display(), error = %e, "Failed to write vector dump");
        }
    }

    fn on_error_map(&self, frame: i64, offset: i64, channel: usize, error: &Plane) {
        if !self.error_maps {
            return;
        }
        let path = self
            .dir
            .join(format!("error.{frame:05}.{offset:+03}.c{channel}.png"));
        let (h, w) = error.dim();
        let max = error.iter().copied().fold(0.0f32, f32::max).max(f32::EPSILON);
        let img = RawImage::<Luma<u8>, Vec<u8>>::from_fn(w as u32, h as u32, |x, y| {
            Luma([(error[[y as usize, x as usize]] / max * 255.0).clamp(0.0, 255.0) as u8])
        });
        if let Err(e) = img.save(&path) {
            warn!(path = %path.display(), error = %e, "Failed to write error map");
        }
    }
}

/// Direction as hue, magnitude (relative to the field maximum) as saturation.
pub fn colorize_field(field: &VectorField) -> RgbImage {
    let (h, w) = field.dim();
    let magnitude = field.magnitude();
    let max = magnitude.iter().copied().fold(0.0f32, f32::max).max(f32::EPSILON);
    let (u, v) = (field.u(), field.v());

    RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (r, c) = (y as usize, x as usize);
        let hue = (v[[r, c]].atan2(u[[r, c]]).to_degrees() + 360.0) % 360.0;
        let saturation = magnitude[[r, c]] / max;
        Rgb(hsv_to_rgb(hue, saturation, 1.0))
    })
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let c = value * saturation;
    let sector = hue / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    [r, g, b].map(|ch| ((ch + m) * 255.0).round().clamp(0.0, 255.0) as u8)
}
