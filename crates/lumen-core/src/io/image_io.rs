use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::{LumenError, Result};
use crate::frame::Plane;

use super::sink::SampleFormat;

/// Channel names exposed for a decoded image: `R, G, B` for color images,
/// `Y` for grayscale, followed by `A` when the file has an alpha channel.
pub fn channel_layout(img: &DynamicImage) -> Vec<String> {
    let color = img.color();
    let mut names: Vec<String> = if color.has_color() {
        vec!["R".into(), "G".into(), "B".into()]
    } else {
        vec!["Y".into()]
    };
    if color.has_alpha() {
        names.push("A".into());
    }
    names
}

/// Load an image file as f32 planes in [0.0, 1.0], in [`channel_layout`] order.
pub fn load_planes(path: &Path) -> Result<(Vec<String>, Vec<Plane>)> {
    let img = image::open(path)?;
    let names = channel_layout(&img);
    let rgba = img.to_rgba32f();
    let (w, h) = rgba.dimensions();
    let (w, h) = (w as usize, h as usize);

    // Grayscale expands to R = G = B, so the first sample is the luma.
    let sources: Vec<usize> = names
        .iter()
        .map(|n| match n.as_str() {
            "G" => 1,
            "B" => 2,
            "A" => 3,
            _ => 0,
        })
        .collect();

    let mut planes: Vec<Plane> = sources.iter().map(|_| Plane::zeros((h, w))).collect();
    for (x, y, pixel) in rgba.enumerate_pixels() {
        for (plane, &src) in planes.iter_mut().zip(&sources) {
            plane[[y as usize, x as usize]] = pixel.0[src];
        }
    }
    Ok((names, planes))
}

/// Save 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA) planes, clamped to
/// [0.0, 1.0] and quantized to `sample_format`.
///
/// TIFF has no gray + alpha encoding, so two planes are written there as
/// RGBA with the gray replicated.
pub fn save_planes(
    planes: &[Plane],
    path: &Path,
    sample_format: SampleFormat,
    file_format: ImageFormat,
) -> Result<()> {
    let img = if file_format == ImageFormat::Tiff && planes.len() == 2 {
        let expanded = [
            planes[0].clone(),
            planes[0].clone(),
            planes[0].clone(),
            planes[1].clone(),
        ];
        to_dynamic_image(&expanded, sample_format)?
    } else {
        to_dynamic_image(planes, sample_format)?
    };
    img.save_with_format(path, file_format)?;
    Ok(())
}

pub fn to_dynamic_image(planes: &[Plane], sample_format: SampleFormat) -> Result<DynamicImage> {
    let first = planes.first().ok_or(LumenError::EmptySequence)?;
    let (h, w) = first.dim();
    let (w, h) = (w as u32, h as u32);
    if let Some(bad) = planes.iter().find(|p| p.dim() != first.dim()) {
        return Err(LumenError::ShapeMismatch {
            expected_w: first.ncols(),
            expected_h: first.nrows(),
            got_w: bad.ncols(),
            got_h: bad.nrows(),
        });
    }
    let size_error = || LumenError::InvalidDimensions {
        width: w,
        height: h,
    };

    let img = match sample_format {
        SampleFormat::U8 => {
            let data = interleave(planes, |v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
            match planes.len() {
                1 => DynamicImage::ImageLuma8(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                2 => DynamicImage::ImageLumaA8(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                3 => DynamicImage::ImageRgb8(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                4 => DynamicImage::ImageRgba8(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                n => return Err(unsupported_plane_count(n)),
            }
        }
        SampleFormat::U16 => {
            let data = interleave(planes, |v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16);
            match planes.len() {
                1 => DynamicImage::ImageLuma16(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                2 => DynamicImage::ImageLumaA16(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                3 => DynamicImage::ImageRgb16(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                4 => DynamicImage::ImageRgba16(
                    image::ImageBuffer::from_raw(w, h, data).ok_or_else(size_error)?,
                ),
                n => return Err(unsupported_plane_count(n)),
            }
        }
    };
    Ok(img)
}

fn unsupported_plane_count(n: usize) -> LumenError {
    LumenError::Config(format!("cannot encode {n} planes as an image"))
}

fn interleave<T, F>(planes: &[Plane], quantize: F) -> Vec<T>
where
    F: Fn(f32) -> T,
{
    let (h, w) = planes[0].dim();
    let mut data = Vec::with_capacity(h * w * planes.len());
    for row in 0..h {
        for col in 0..w {
            for plane in planes {
                data.push(quantize(plane[[row, col]]));
            }
        }
    }
    data
}
