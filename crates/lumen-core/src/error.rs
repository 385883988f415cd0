use thiserror::Error;

#[derive(Error, Debug)]
pub enum LumenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Plane shape mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    ShapeMismatch {
        expected_w: usize,
        expected_h: usize,
        got_w: usize,
        got_h: usize,
    },

    #[error("Frame {frame} out of range [{begin}, {end}]")]
    FrameOutOfRange { frame: i64, begin: i64, end: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown {category} strategy '{name}'")]
    UnknownStrategy { category: &'static str, name: String },

    #[error("Integration method '{0}' is not implemented")]
    UnimplementedIntegration(String),

    #[error("Channel '{channel}' not available in {source_name}")]
    MissingChannel { channel: String, source_name: String },

    #[error("Failed to fetch frame {frame} from {source_name}: {cause}")]
    FrameFetch {
        frame: i64,
        source_name: String,
        cause: Box<LumenError>,
    },

    #[error("{} frame(s) failed {frames:?}, first error: {first}", .frames.len())]
    FramesFailed {
        frames: Vec<i64>,
        first: Box<LumenError>,
    },

    #[error("Vector field is invalid and cannot be used")]
    InvalidVectorField,

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, LumenError>;
