use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::consts::{DEFAULT_FRAME_RATE, SER_TICKS_PER_SECOND};
use crate::error::{LumenError, Result};
use crate::frame::{ImageBuffer, Plane};
use crate::track::{Sample, Track};

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// Pixel layout declared by the SER `ColorID` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerLayout {
    Mono,
    /// Raw Bayer mosaic, read as a single plane.
    Bayer,
    Rgb,
    Bgr,
}

impl SerLayout {
    fn from_color_id(color_id: i32) -> Self {
        match color_id {
            8..=19 => Self::Bayer,
            100 => Self::Rgb,
            101 => Self::Bgr,
            _ => Self::Mono,
        }
    }

    fn channel_names(self) -> Vec<String> {
        match self {
            Self::Mono | Self::Bayer => vec!["Y".to_string()],
            Self::Rgb | Self::Bgr => ["R", "G", "B"].iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Position of the n-th exposed channel inside an interleaved pixel.
    fn storage_index(self, channel: usize) -> usize {
        match self {
            Self::Bgr => 2 - channel,
            _ => channel,
        }
    }
}

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Bytes per sample (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    pub fn layout(&self) -> SerLayout {
        SerLayout::from_color_id(self.color_id)
    }

    /// Interleaved samples per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn samples_per_pixel(&self) -> usize {
        match self.layout() {
            SerLayout::Rgb | SerLayout::Bgr => 3,
            _ => 1,
        }
    }

    pub fn frame_byte_size(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|p| p.checked_mul(self.bytes_per_sample() * self.samples_per_pixel()))
            .ok_or_else(|| LumenError::InvalidSer("frame size overflows".into()))
    }
}

/// Memory-mapped SER video exposed as a track starting at frame 0.
pub struct SerTrack {
    mmap: Mmap,
    name: String,
    header: SerHeader,
    channels: Vec<String>,
    frame_bytes: usize,
    rate: f64,
}

impl SerTrack {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the file is opened read-only and the mapping is never
        // exposed mutably.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(LumenError::InvalidSer("File too small for SER header".into()));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(LumenError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if header.frame_count == 0 {
            return Err(LumenError::EmptySequence);
        }
        let frame_bytes = header.frame_byte_size()?;
        let expected = frame_bytes
            .checked_mul(header.frame_count as usize)
            .and_then(|b| b.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| LumenError::InvalidSer("frame data size overflows".into()))?;
        if mmap.len() < expected {
            return Err(LumenError::InvalidSer(format!(
                "File truncated: expected at least {expected} bytes, got {}",
                mmap.len()
            )));
        }
        if header.layout() == SerLayout::Bayer {
            warn!(
                color_id = header.color_id,
                "Bayer SER data is not demosaiced; reading the mosaic as a single plane"
            );
        }

        let rate = trailer_rate(&mmap, expected, header.frame_count as usize)
            .unwrap_or(DEFAULT_FRAME_RATE);
        debug!(
            width = header.width,
            height = header.height,
            frames = header.frame_count,
            depth = header.pixel_depth,
            rate,
            "Opened SER file"
        );

        Ok(Self {
            mmap,
            name: path.display().to_string(),
            channels: header.layout().channel_names(),
            header,
            frame_bytes,
            rate,
        })
    }

    pub fn header(&self) -> &SerHeader {
        &self.header
    }

    fn frame_raw(&self, frame: i64) -> Result<&[u8]> {
        if !self.contains(frame) {
            return Err(LumenError::FrameOutOfRange {
                frame,
                begin: self.begin(),
                end: self.end(),
            });
        }
        let offset = SER_HEADER_SIZE + frame as usize * self.frame_bytes;
        Ok(&self.mmap[offset..offset + self.frame_bytes])
    }
}

impl Track for SerTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> i64 {
        0
    }

    fn end(&self) -> i64 {
        self.header.frame_count as i64 - 1
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn fetch(&self, sample: Sample, channels: &[String]) -> Result<ImageBuffer> {
        let raw = self.frame_raw(sample.frame)?;
        let layout = self.header.layout();
        let mut planes = Vec::with_capacity(channels.len());
        for name in channels {
            let channel = self
                .channels
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| LumenError::MissingChannel {
                    channel: name.clone(),
                    source_name: self.name.clone(),
                })?;
            planes.push(decode_interleaved(
                raw,
                &self.header,
                layout.storage_index(channel),
            ));
        }
        ImageBuffer::new(planes)
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]);

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(LumenError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(LumenError::InvalidSer(format!(
            "unsupported pixel depth {pixel_depth}"
        )));
    }

    // Writers disagree on the endianness flag; 0 is read as little-endian.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Frame rate from the optional per-frame timestamp trailer.
fn trailer_rate(mmap: &[u8], trailer_offset: usize, frame_count: usize) -> Option<f64> {
    if frame_count < 2 || mmap.len() < trailer_offset + frame_count * 8 {
        return None;
    }
    let stamp = |i: usize| {
        let at = trailer_offset + i * 8;
        (&mmap[at..at + 8]).read_u64::<LittleEndian>().ok()
    };
    let first = stamp(0)?;
    let last = stamp(frame_count - 1)?;
    if last <= first {
        return None;
    }
    let seconds = (last - first) as f64 / SER_TICKS_PER_SECOND;
    Some((frame_count - 1) as f64 / seconds)
}

fn decode_interleaved(raw: &[u8], header: &SerHeader, sample_index: usize) -> Plane {
    let h = header.height as usize;
    let w = header.width as usize;
    let bytes = header.bytes_per_sample();
    let stride = header.samples_per_pixel() * bytes;
    let max_val = ((1u32 << header.pixel_depth) - 1) as f32;
    let mut data = Plane::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let idx = (row * w + col) * stride + sample_index * bytes;
            let val = if bytes == 1 {
                raw[idx] as f32
            } else {
                let pair = [raw[idx], raw[idx + 1]];
                if header.little_endian {
                    u16::from_le_bytes(pair) as f32
                } else {
                    u16::from_be_bytes(pair) as f32
                }
            };
            data[[row, col]] = val / max_val;
        }
    }
    data
}
