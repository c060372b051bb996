//! The pipeline builder: validate inputs, derive timing, build the render
//! spec, drive the encode, and emit the final authoritative progress update.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::encode_ffmpeg;
use crate::error::{SlidecastError, SlidecastResult};
use crate::images::ImageSet;
use crate::probe;
use crate::progress::{ChannelOutcome, ProgressChannel, ProgressFn, percent_of};
use crate::render_spec::{RenderSpec, Timing};

/// Cooperative cancellation, checked at the channel-setup and
/// encoder-invocation boundaries and polled while the encoder runs.
/// Cancelling kills the ffmpeg child and tears the channel down early.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One assembly: three paths plus the caller's progress sink. Immutable for
/// the lifetime of the call.
#[derive(Clone)]
pub struct AssemblyRequest {
    pub image_dir: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub on_progress: ProgressFn,
    pub cancel: CancelToken,
}

impl AssemblyRequest {
    pub fn new(
        image_dir: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            on_progress: Arc::new(|_, _| {}),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Assemble the slideshow described by `request`. Blocks until the encoder
/// exits; progress callbacks arrive from the channel's receiver thread while
/// this call is blocked. On failure after the encoder started, anything
/// written at the output path is removed.
pub fn assemble(request: &AssemblyRequest) -> SlidecastResult<()> {
    let images = ImageSet::discover(&request.image_dir)?;
    let audio_duration = probe::probe_duration_sec(&request.audio_path)?;
    let timing = Timing::new(audio_duration, images.len());

    tracing::info!(
        audio_duration,
        image_count = images.len(),
        display_rate = timing.display_rate(),
        "assembling slideshow"
    );

    encode_ffmpeg::ensure_parent_dir(&request.output_path)?;
    let spec = RenderSpec::new(
        images,
        &request.audio_path,
        &request.output_path,
        timing,
    );

    if request.cancel.is_cancelled() {
        return Err(SlidecastError::Cancelled);
    }

    let channel = ProgressChannel::open(audio_duration, request.on_progress.clone())?;
    let encode_result = encode_ffmpeg::run_encode(&spec, &channel.progress_url(), &request.cancel);

    match channel.close() {
        ChannelOutcome::Completed => {}
        ChannelOutcome::TimedOut => {
            tracing::warn!("encoder never connected to the progress channel");
        }
        ChannelOutcome::Faulted(reason) => {
            tracing::warn!(%reason, "progress channel faulted; live updates were incomplete");
        }
    }

    if let Err(e) = encode_result {
        discard_partial_output(&request.output_path);
        return Err(e);
    }

    // The live telemetry is advisory; the probed output duration is the
    // authoritative final word, so the sequence always ends near 100%.
    // An encoder that exits 0 but leaves an unprobeable file still counts
    // as a failed encode, and the corrupt artifact is removed like any
    // other partial output.
    let produced = match probe::probe_duration_sec(&request.output_path) {
        Ok(produced) => produced,
        Err(e) => {
            discard_partial_output(&request.output_path);
            return Err(SlidecastError::encoding_failed(format!(
                "output written but not probeable: {e}"
            )));
        }
    };
    tracing::info!(produced, "slideshow assembled");
    (request.on_progress)(percent_of(produced, audio_duration), None);

    Ok(())
}

fn discard_partial_output(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::info!(path = %path.display(), "removed partial output"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
            }
        }
    }
}
