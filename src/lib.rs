#![forbid(unsafe_code)]

//! Slideshow assembly: turn a directory of still images and one audio track
//! into an MP4, with live 0-100% progress callbacks while the system ffmpeg
//! binary does the encoding.

pub mod assemble;
pub mod encode_ffmpeg;
pub mod error;
pub mod images;
pub mod probe;
pub mod progress;
pub mod render_spec;

pub use assemble::{AssemblyRequest, CancelToken, assemble};
pub use encode_ffmpeg::is_ffmpeg_on_path;
pub use error::{SlidecastError, SlidecastResult};
pub use images::{ImageSet, MAX_IMAGES};
pub use probe::{is_ffprobe_on_path, probe_duration_sec};
pub use progress::{ChannelOutcome, ProgressChannel, ProgressFn, TelemetryParser};
pub use render_spec::{CANVAS_HEIGHT, CANVAS_WIDTH, OUTPUT_FPS, RenderSpec, Timing};
