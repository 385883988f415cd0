use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::DEFAULT_FRAME_RATE;
use crate::error::{LumenError, Result};
use crate::frame::ImageBuffer;
use crate::track::{select_channels, Sample, Track};

use super::image_io::load_planes;

const IMAGE_EXTENSIONS: &[&str] = &["png", "tif", "tiff", "jpg", "jpeg", "bmp"];

/// A directory of numbered still images (`shot.0001.png`, `shot.0002.png`, ...).
///
/// Frame numbers come from the trailing digits of the file stems when they
/// form a contiguous run; otherwise files are numbered from 0 in name order.
/// The first file fixes the channel layout and dimensions.
pub struct ImageSequenceTrack {
    name: String,
    files: Vec<PathBuf>,
    begin: i64,
    rate: f64,
    channels: Vec<String>,
    dim: (usize, usize),
}

impl ImageSequenceTrack {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_rate(dir, DEFAULT_FRAME_RATE)
    }

    pub fn open_with_rate(dir: &Path, rate: f64) -> Result<Self> {
        let mut entries: Vec<(Option<i64>, PathBuf)> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image(p))
            .map(|p| (trailing_number(&p), p))
            .collect();
        if entries.is_empty() {
            return Err(LumenError::EmptySequence);
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let numbers: Option<Vec<i64>> = entries.iter().map(|(n, _)| *n).collect();
        let begin = match numbers {
            Some(ns) if ns.windows(2).all(|w| w[1] == w[0] + 1) => ns[0],
            _ => {
                warn!(
                    dir = %dir.display(),
                    "Image file numbers are missing or not contiguous; numbering from 0"
                );
                entries.sort_by(|a, b| a.1.cmp(&b.1));
                0
            }
        };
        let files: Vec<PathBuf> = entries.into_iter().map(|(_, p)| p).collect();

        let (channels, planes) = load_planes(&files[0])?;
        let dim = planes[0].dim();
        debug!(
            dir = %dir.display(),
            frames = files.len(),
            begin,
            width = dim.1,
            height = dim.0,
            channels = ?channels,
            "Opened image sequence"
        );

        Ok(Self {
            name: dir.display().to_string(),
            files,
            begin,
            rate,
            channels,
            dim,
        })
    }

    pub fn width(&self) -> usize {
        self.dim.1
    }

    pub fn height(&self) -> usize {
        self.dim.0
    }

    pub fn file(&self, frame: i64) -> Option<&Path> {
        if !self.contains(frame) {
            return None;
        }
        self.files
            .get((frame - self.begin) as usize)
            .map(PathBuf::as_path)
    }
}

impl Track for ImageSequenceTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> i64 {
        self.begin
    }

    fn end(&self) -> i64 {
        self.begin + self.files.len() as i64 - 1
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn fetch(&self, sample: Sample, channels: &[String]) -> Result<ImageBuffer> {
        let path = self.file(sample.frame).ok_or(LumenError::FrameOutOfRange {
            frame: sample.frame,
            begin: self.begin(),
            end: self.end(),
        })?;
        let (names, planes) = load_planes(path)?;
        if names != self.channels {
            return Err(LumenError::Config(format!(
                "{} has channels {names:?}, sequence has {:?}",
                path.display(),
                self.channels
            )));
        }
        if planes[0].dim() != self.dim {
            return Err(LumenError::ShapeMismatch {
                expected_w: self.dim.1,
                expected_h: self.dim.0,
                got_w: planes[0].ncols(),
                got_h: planes[0].nrows(),
            });
        }
        select_channels(&self.channels, planes, channels, &self.name)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn trailing_number(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
