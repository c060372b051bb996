//! Timing derivation and construction of the ffmpeg invocation for one
//! assembly.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::images::ImageSet;

/// Fixed output canvas. Every image is scaled to fit inside it, preserving
/// aspect ratio, then padded to exactly this size with black fill.
pub const CANVAS_WIDTH: u32 = 1920;
pub const CANVAS_HEIGHT: u32 = 1080;

/// Container-level frame rate of the muxed result. The true motion is
/// encoded via per-source sampling, so 1 fps keeps the output small.
pub const OUTPUT_FPS: u32 = 1;

/// How many samples the per-image hold is smoothed into, relative to the
/// display rate. Avoids visible stutter when the display rate is fractional.
const SAMPLING_FACTOR: f64 = 10.0;

/// Per-request timing: how fast slides advance so that showing every image
/// sequentially exactly spans the audio track.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub audio_duration_sec: f64,
    pub image_count: usize,
}

impl Timing {
    pub fn new(audio_duration_sec: f64, image_count: usize) -> Self {
        Self {
            audio_duration_sec,
            image_count,
        }
    }

    /// Images shown per second of audio.
    pub fn display_rate(&self) -> f64 {
        self.image_count as f64 / self.audio_duration_sec
    }

    /// Internal sampling rate used for the `fps` filter on each sub-stream.
    pub fn sampling_rate(&self) -> f64 {
        self.display_rate() * SAMPLING_FACTOR
    }
}

/// Declarative description of one encode: sources, per-source transforms,
/// concatenation order, and output options. Constructed fresh per request
/// and consumed exactly once by the encoder invocation.
#[derive(Clone, Debug)]
pub struct RenderSpec {
    pub images: ImageSet,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub timing: Timing,
}

impl RenderSpec {
    pub fn new(images: ImageSet, audio_path: &Path, output_path: &Path, timing: Timing) -> Self {
        Self {
            images,
            audio_path: audio_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            timing,
        }
    }

    /// The normalization chain applied to every image sub-stream.
    fn filter_chain(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1,fps={fps}",
            w = CANVAS_WIDTH,
            h = CANVAS_HEIGHT,
            fps = self.timing.sampling_rate(),
        )
    }

    /// The full `-filter_complex` graph: normalize each image input, concat
    /// the sub-streams in set order, then concat that video with the audio
    /// input (one video + one audio track out).
    pub fn filter_graph(&self) -> String {
        let n = self.images.len();
        let chain = self.filter_chain();
        let mut graph = String::new();
        for i in 0..n {
            graph.push_str(&format!("[{i}:v]{chain}[v{i}];"));
        }
        for i in 0..n {
            graph.push_str(&format!("[v{i}]"));
        }
        graph.push_str(&format!("concat=n={n}:v=1:a=0[slides];"));
        graph.push_str(&format!(
            "[slides][{n}:a]concat=n=1:v=1:a=1[outv][outa]"
        ));
        graph
    }

    /// Complete argument vector for the ffmpeg child process. The progress
    /// URL is where ffmpeg streams its `key=value` telemetry.
    pub fn to_ffmpeg_args(&self, progress_url: &str) -> Vec<OsString> {
        let rate = self.timing.display_rate().to_string();

        let mut args: Vec<OsString> = Vec::new();
        for s in ["-hide_banner", "-nostdin", "-loglevel", "error"] {
            args.push(s.into());
        }
        args.push("-progress".into());
        args.push(progress_url.into());

        // Each image becomes its own input held for 1/display_rate seconds.
        for image in self.images.paths() {
            args.push("-r".into());
            args.push(rate.as_str().into());
            args.push("-i".into());
            args.push(image.as_os_str().to_os_string());
        }
        args.push("-i".into());
        args.push(self.audio_path.as_os_str().to_os_string());

        args.push("-filter_complex".into());
        args.push(self.filter_graph().into());
        for s in ["-map", "[outv]", "-map", "[outa]"] {
            args.push(s.into());
        }

        for s in [
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-color_range",
            "pc",
            "-c:a",
            "aac",
            "-r",
        ] {
            args.push(s.into());
        }
        args.push(OUTPUT_FPS.to_string().into());

        args.push("-y".into());
        args.push(self.output_path.as_os_str().to_os_string());
        args
    }
}
