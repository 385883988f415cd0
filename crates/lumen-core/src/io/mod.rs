pub mod image_io;
pub mod sequence;
pub mod ser;
pub mod sink;

use std::path::Path;

use crate::error::Result;
use crate::track::Track;

pub use sequence::ImageSequenceTrack;
pub use ser::SerTrack;
pub use sink::{FileFormat, FrameSink, ImageSequenceSink, MemorySink, SampleFormat};

/// Open a frame source: a `.ser` file or a directory of numbered images.
pub fn open_track(path: &Path) -> Result<Box<dyn Track>> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceTrack::open(path)?));
    }
    Ok(Box::new(SerTrack::open(path)?))
}
