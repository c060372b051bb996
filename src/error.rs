use std::path::PathBuf;

pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Errors an assembly can fail with. The first four variants are detected
/// before ffmpeg is ever invoked, so they never leave a partial output file.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    #[error("no decodable images found in '{0}'")]
    NoImagesFound(PathBuf),

    #[error("'{dir}' contains {count} images, more than the cap of {cap}")]
    TooManyImages {
        dir: PathBuf,
        count: usize,
        cap: usize,
    },

    #[error("audio file '{path}' could not be probed: {reason}")]
    InvalidAudio { path: PathBuf, reason: String },

    #[error("invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("progress channel setup failed: {0}")]
    ChannelSetupFailed(#[source] std::io::Error),

    #[error("assembly cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    pub fn invalid_audio(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidAudio {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_output_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidOutputPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn encoding_failed(msg: impl Into<String>) -> Self {
        Self::EncodingFailed(msg.into())
    }
}
