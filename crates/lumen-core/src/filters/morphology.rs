use crate::frame::Plane;

/// Binarize: 1.0 where `value >= threshold`, 0.0 elsewhere.
pub fn binarize(data: &Plane, threshold: f32) -> Plane {
    data.mapv(|v| if v >= threshold { 1.0 } else { 0.0 })
}

/// Grey-level erosion with a 3x3 square kernel (minimum of the neighborhood).
///
/// Out-of-bounds neighbors are ignored, so a fully set mask stays fully set
/// at the image border.
pub fn erode(mask: &Plane) -> Plane {
    let (h, w) = mask.dim();
    Plane::from_shape_fn((h, w), |(row, col)| {
        let rows = row.saturating_sub(1)..=(row + 1).min(h - 1);
        rows.flat_map(|r| {
            (col.saturating_sub(1)..=(col + 1).min(w - 1)).map(move |c| mask[[r, c]])
        })
        .fold(f32::INFINITY, f32::min)
    })
}
