use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LumenError, Result};
use crate::frame::ImageBuffer;

use super::image_io::save_planes;

/// Quantization of stored samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleFormat {
    U8,
    #[default]
    U16,
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
        }
    }
}

impl FromStr for SampleFormat {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "8" => Ok(Self::U8),
            "u16" | "16" => Ok(Self::U16),
            other => Err(LumenError::Config(format!("unknown sample format '{other}'"))),
        }
    }
}

/// Container format written by [`ImageSequenceSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    #[default]
    Tiff,
    Png,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tiff => "tiff",
            Self::Png => "png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Tiff => ImageFormat::Tiff,
            Self::Png => ImageFormat::Png,
        }
    }
}

impl FromStr for FileFormat {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tif" | "tiff" => Ok(Self::Tiff),
            "png" => Ok(Self::Png),
            other => Err(LumenError::Config(format!("unknown file format '{other}'"))),
        }
    }
}

/// Destination for finished frames.
pub trait FrameSink: Send + Sync {
    /// Store one output frame. `channels` names the planes of `frame`.
    fn store(&self, frame: i64, buffer: &ImageBuffer, channels: &[String]) -> Result<()>;
}

/// Writes `<prefix>.<frame:05>.<ext>` files into a directory.
pub struct ImageSequenceSink {
    dir: PathBuf,
    prefix: String,
    file_format: FileFormat,
    sample_format: SampleFormat,
}

impl ImageSequenceSink {
    pub fn new(
        dir: &Path,
        prefix: impl Into<String>,
        file_format: FileFormat,
        sample_format: SampleFormat,
    ) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.into(),
            file_format,
            sample_format,
        })
    }

    pub fn frame_path(&self, frame: i64) -> PathBuf {
        self.dir.join(format!(
            "{}.{frame:05}.{}",
            self.prefix,
            self.file_format.extension()
        ))
    }
}

impl FrameSink for ImageSequenceSink {
    fn store(&self, frame: i64, buffer: &ImageBuffer, channels: &[String]) -> Result<()> {
        let path = self.frame_path(frame);
        // Encode next to the target and rename, so a failed write never
        // leaves a truncated frame behind.
        let partial = path.with_extension(format!("{}.partial", self.file_format.extension()));
        if let Err(e) = save_planes(
            buffer.planes(),
            &partial,
            self.sample_format,
            self.file_format.image_format(),
        ) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &path)?;
        debug!(frame, path = %path.display(), channels = ?channels, "Stored frame");
        Ok(())
    }
}

/// Keeps stored frames in memory, keyed by frame number.
#[derive(Default)]
pub struct MemorySink {
    frames: Mutex<BTreeMap<i64, ImageBuffer>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: i64) -> Option<ImageBuffer> {
        self.lock().get(&frame).cloned()
    }

    pub fn frame_numbers(&self) -> Vec<i64> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_frames(self) -> BTreeMap<i64, ImageBuffer> {
        self.frames.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, ImageBuffer>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for MemorySink {
    fn store(&self, frame: i64, buffer: &ImageBuffer, _channels: &[String]) -> Result<()> {
        self.lock().insert(frame, buffer.clone());
        Ok(())
    }
}
