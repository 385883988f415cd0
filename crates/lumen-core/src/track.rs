use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use tracing::debug;

use crate::error::{LumenError, Result};
use crate::frame::{ImageBuffer, Plane};

/// A frame request: frame number at the track's rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub frame: i64,
    pub rate: f64,
}

/// A sequence of same-sized frames over the closed range `[begin, end]`.
pub trait Track: Send + Sync {
    /// Identity used in logs and error messages (usually the source path).
    fn name(&self) -> &str;
    fn begin(&self) -> i64;
    fn end(&self) -> i64;
    /// Frames per second.
    fn rate(&self) -> f64;
    /// Channel names available from `fetch`, in storage order.
    fn channels(&self) -> &[String];
    /// Decode the requested channels of one frame, in the requested order.
    fn fetch(&self, sample: Sample, channels: &[String]) -> Result<ImageBuffer>;

    fn contains(&self, frame: i64) -> bool {
        frame >= self.begin() && frame <= self.end()
    }

    fn frame_count(&self) -> usize {
        (self.end() - self.begin() + 1).max(0) as usize
    }

    fn sample(&self, frame: i64) -> Sample {
        Sample {
            frame,
            rate: self.rate(),
        }
    }
}

/// Pick `requested` planes out of a decoded frame whose planes follow
/// `available` order.
pub fn select_channels(
    available: &[String],
    mut planes: Vec<Plane>,
    requested: &[String],
    source_name: &str,
) -> Result<ImageBuffer> {
    let mut picked = Vec::with_capacity(requested.len());
    for name in requested {
        let idx = available
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| LumenError::MissingChannel {
                channel: name.clone(),
                source_name: source_name.to_string(),
            })?;
        picked.push(std::mem::replace(&mut planes[idx], Plane::zeros((0, 0))));
    }
    ImageBuffer::new(picked)
}

/// Frames held in memory.
pub struct MemoryTrack {
    name: String,
    begin: i64,
    rate: f64,
    channels: Vec<String>,
    frames: Vec<ImageBuffer>,
}

impl MemoryTrack {
    pub fn new(
        name: impl Into<String>,
        begin: i64,
        rate: f64,
        channels: Vec<String>,
        frames: Vec<ImageBuffer>,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(LumenError::EmptySequence);
        }
        let dim = frames[0].dim();
        for frame in &frames {
            if frame.plane_count() != channels.len() {
                return Err(LumenError::Config(format!(
                    "frame has {} planes, expected {} channels",
                    frame.plane_count(),
                    channels.len()
                )));
            }
            if frame.dim() != dim {
                return Err(LumenError::ShapeMismatch {
                    expected_w: dim.1,
                    expected_h: dim.0,
                    got_w: frame.width(),
                    got_h: frame.height(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            begin,
            rate,
            channels,
            frames,
        })
    }
}

impl Track for MemoryTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> i64 {
        self.begin
    }

    fn end(&self) -> i64 {
        self.begin + self.frames.len() as i64 - 1
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn fetch(&self, sample: Sample, channels: &[String]) -> Result<ImageBuffer> {
        if !self.contains(sample.frame) {
            return Err(LumenError::FrameOutOfRange {
                frame: sample.frame,
                begin: self.begin(),
                end: self.end(),
            });
        }
        let frame = &self.frames[(sample.frame - self.begin) as usize];
        select_channels(
            &self.channels,
            frame.planes().to_vec(),
            channels,
            &self.name,
        )
    }
}

/// Decoded source frames shared across the sliding window.
///
/// Lookups never reach the track for frames outside `[begin, end]`. Fetch
/// failures are wrapped with the frame number and track name.
pub struct FrameCache<'a> {
    track: &'a dyn Track,
    channels: Vec<String>,
    frames: Mutex<HashMap<i64, Arc<ImageBuffer>>>,
    fetches: AtomicUsize,
}

impl<'a> FrameCache<'a> {
    pub fn new(track: &'a dyn Track, channels: Vec<String>) -> Self {
        Self {
            track,
            channels,
            frames: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, frame: i64) -> Result<Arc<ImageBuffer>> {
        if !self.track.contains(frame) {
            return Err(LumenError::FrameOutOfRange {
                frame,
                begin: self.track.begin(),
                end: self.track.end(),
            });
        }
        if let Some(hit) = self.lock().get(&frame) {
            return Ok(hit.clone());
        }

        // Decode outside the lock; a concurrent miss on the same frame may
        // decode twice, the first insert wins.
        let decoded = self
            .track
            .fetch(self.track.sample(frame), &self.channels)
            .map_err(|cause| LumenError::FrameFetch {
                frame,
                source_name: self.track.name().to_string(),
                cause: Box::new(cause),
            })?;
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let mut frames = self.lock();
        Ok(frames
            .entry(frame)
            .or_insert_with(|| Arc::new(decoded))
            .clone())
    }

    /// Decode, in parallel, every in-range frame of `[first, last]` that is
    /// not cached yet. Failures are left for `get` to report.
    pub fn prefetch(&self, first: i64, last: i64) {
        let first = first.max(self.track.begin());
        let last = last.min(self.track.end());
        let missing: Vec<i64> = {
            let frames = self.lock();
            (first..=last).filter(|f| !frames.contains_key(f)).collect()
        };
        let decoded: Vec<(i64, ImageBuffer)> = missing
            .par_iter()
            .filter_map(|&frame| {
                match self.track.fetch(self.track.sample(frame), &self.channels) {
                    Ok(buffer) => Some((frame, buffer)),
                    Err(e) => {
                        debug!(frame, error = %e, "Prefetch failed");
                        None
                    }
                }
            })
            .collect();
        self.fetches.fetch_add(decoded.len(), Ordering::Relaxed);

        let mut frames = self.lock();
        for (frame, buffer) in decoded {
            frames.entry(frame).or_insert_with(|| Arc::new(buffer));
        }
    }

    /// Drop every cached frame outside `[first, last]`.
    pub fn retain_range(&self, first: i64, last: i64) {
        let mut frames = self.lock();
        let before = frames.len();
        frames.retain(|&f, _| f >= first && f <= last);
        debug!(
            evicted = before - frames.len(),
            kept = frames.len(),
            first,
            last,
            "Frame cache window advanced"
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn track(&self) -> &'a dyn Track {
        self.track
    }

    /// Number of decodes performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Arc<ImageBuffer>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
