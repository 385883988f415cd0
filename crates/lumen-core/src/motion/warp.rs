use crate::error::Result;
use crate::filters::fill_rows;
use crate::frame::{ImageBuffer, Plane, VectorField};

/// Bilinear sample at fractional `(y, x)`, clamping coordinates to the plane.
pub fn bilinear_sample(data: &Plane, y: f32, x: f32) -> f32 {
    let (h, w) = data.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    data[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + data[[y0, x1]] * fx * (1.0 - fy)
        + data[[y1, x0]] * (1.0 - fx) * fy
        + data[[y1, x1]] * fx * fy
}

/// Warp `plane` into the field's reference coordinates:
/// `out(x, y) = plane(x + u(x, y), y + v(x, y))`.
pub fn warp_plane(plane: &Plane, field: &VectorField) -> Result<Plane> {
    field.ensure_usable(plane.dim())?;
    Ok(warp_unchecked(plane, field))
}

/// Warp every plane of a buffer with the same field.
pub fn warp_buffer(buffer: &ImageBuffer, field: &VectorField) -> Result<ImageBuffer> {
    field.ensure_usable(buffer.dim())?;
    ImageBuffer::new(
        buffer
            .planes()
            .iter()
            .map(|p| warp_unchecked(p, field))
            .collect(),
    )
}

pub(crate) fn warp_unchecked(plane: &Plane, field: &VectorField) -> Plane {
    let (h, w) = plane.dim();
    let (u, v) = (field.u(), field.v());
    let mut result = Plane::zeros((h, w));
    fill_rows(&mut result, |row, mut out| {
        for col in 0..w {
            out[col] = bilinear_sample(
                plane,
                row as f32 + v[[row, col]],
                col as f32 + u[[row, col]],
            );
        }
    });
    result
}
