#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use lumen_core::error::{LumenError, Result};
use lumen_core::frame::{ImageBuffer, Plane, VectorField};
use lumen_core::io::ser::SER_HEADER_SIZE;
use lumen_core::motion::TemporalAligner;
use lumen_core::track::{MemoryTrack, Sample, Track};

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Smooth deterministic texture, values in [0.2, 0.8]. `shift` moves the
/// pattern right by that many pixels.
pub fn textured_plane(h: usize, w: usize, shift: f32) -> Plane {
    Plane::from_shape_fn((h, w), |(r, c)| {
        let x = c as f32 - shift;
        let y = r as f32;
        0.5 + 0.15 * (x * 0.7).sin() * (y * 0.45).cos() + 0.15 * (x * 0.23 + y * 0.31).sin()
    })
}

/// Deterministic pseudo-noise in [-amplitude, amplitude].
pub fn noise_plane(h: usize, w: usize, seed: u32, amplitude: f32) -> Plane {
    Plane::from_shape_fn((h, w), |(r, c)| {
        let mut x = (r as u32)
            .wrapping_mul(73_856_093)
            ^ (c as u32).wrapping_mul(19_349_663)
            ^ seed.wrapping_mul(83_492_791);
        x ^= x >> 13;
        x = x.wrapping_mul(0x5bd1_e995);
        x ^= x >> 15;
        ((x % 10_000) as f32 / 10_000.0 * 2.0 - 1.0) * amplitude
    })
}

pub fn mono_track(frames: Vec<Plane>) -> MemoryTrack {
    let buffers = frames
        .into_iter()
        .map(|p| ImageBuffer::new(vec![p]).unwrap())
        .collect();
    MemoryTrack::new("mono", 0, 24.0, names(&["Y"]), buffers).unwrap()
}

/// Identical static frames.
pub fn static_track(h: usize, w: usize, count: usize) -> MemoryTrack {
    mono_track((0..count).map(|_| textured_plane(h, w, 0.0)).collect())
}

/// Static texture plus per-frame noise.
pub fn noisy_track(h: usize, w: usize, count: usize) -> MemoryTrack {
    mono_track(
        (0..count)
            .map(|i| textured_plane(h, w, 0.0) + &noise_plane(h, w, i as u32, 0.05))
            .collect(),
    )
}

pub fn rgb_buffer(r: Plane, g: Plane, b: Plane) -> ImageBuffer {
    ImageBuffer::new(vec![r, g, b]).unwrap()
}

/// Always returns the identity field, counting every estimate.
#[derive(Default)]
pub struct CountingAligner {
    pub calls: AtomicUsize,
}

impl CountingAligner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemporalAligner for CountingAligner {
    fn estimate(&self, reference: &Plane, _candidate: &Plane) -> Result<VectorField> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (h, w) = reference.dim();
        Ok(VectorField::zeros(h, w))
    }
}

/// A track whose fetch fails for the listed frames.
pub struct FailingTrack {
    pub inner: MemoryTrack,
    pub failing: HashSet<i64>,
}

impl Track for FailingTrack {
    fn name(&self) -> &str {
        "failing"
    }

    fn begin(&self) -> i64 {
        self.inner.begin()
    }

    fn end(&self) -> i64 {
        self.inner.end()
    }

    fn rate(&self) -> f64 {
        self.inner.rate()
    }

    fn channels(&self) -> &[String] {
        self.inner.channels()
    }

    fn fetch(&self, sample: Sample, channels: &[String]) -> Result<ImageBuffer> {
        if self.failing.contains(&sample.frame) {
            return Err(LumenError::Io(std::io::Error::other("decode failed")));
        }
        self.inner.fetch(sample, channels)
    }
}

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8=BAYER_RGGB, 100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (read as little-endian)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer (40 bytes)
    let mut observer = [0u8; 40];
    observer[..4].copy_from_slice(b"Test");
    buf.extend_from_slice(&observer);
    // Instrument (40 bytes)
    buf.extend_from_slice(&[0u8; 40]);
    // Telescope (40 bytes)
    buf.extend_from_slice(&[0u8; 40]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete SER file: header, frame data, and an optional timestamp trailer.
pub fn build_ser(
    width: u32,
    height: u32,
    bit_depth: u32,
    color_id: i32,
    frames: &[Vec<u8>],
    timestamps: Option<&[u64]>,
) -> Vec<u8> {
    let mut buf = build_ser_header_full(width, height, bit_depth, frames.len(), color_id);
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    if let Some(stamps) = timestamps {
        for t in stamps {
            buf.extend_from_slice(&t.to_le_bytes());
        }
    }
    buf
}

/// Write a SER buffer to a temporary file.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

pub fn max_abs_diff(a: &Plane, b: &Plane) -> f32 {
    assert_eq!(a.dim(), b.dim());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}
