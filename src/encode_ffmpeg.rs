//! Invocation and supervision of the system `ffmpeg` binary.
//!
//! We use the binary rather than native FFmpeg bindings to avoid dev
//! header/lib requirements; the core depends only on the command/argument
//! contract and the `-progress` telemetry side channel.

use std::io::Read as _;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::assemble::CancelToken;
use crate::error::{SlidecastError, SlidecastResult};
use crate::render_spec::RenderSpec;

const WAIT_POLL: Duration = Duration::from_millis(100);

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the output's parent directory if it is missing. Failure here means
/// the output path is unusable, detected before the encoder runs.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            SlidecastError::invalid_output_path(
                path,
                format!("cannot create '{}': {e}", parent.display()),
            )
        })?;
    }
    Ok(())
}

/// Run the encode described by `spec` to completion, streaming telemetry to
/// `progress_url`. Polls the child so a cancellation can terminate it
/// mid-encode instead of waiting for the full run.
pub fn run_encode(
    spec: &RenderSpec,
    progress_url: &str,
    cancel: &CancelToken,
) -> SlidecastResult<()> {
    if !is_ffmpeg_on_path() {
        return Err(SlidecastError::encoding_failed(
            "ffmpeg is required but was not found on PATH",
        ));
    }
    run_encode_with(Path::new("ffmpeg"), spec, progress_url, cancel)
}

fn run_encode_with(
    ffmpeg: &Path,
    spec: &RenderSpec,
    progress_url: &str,
    cancel: &CancelToken,
) -> SlidecastResult<()> {
    let mut child = Command::new(ffmpeg)
        .args(spec.to_ffmpeg_args(progress_url))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SlidecastError::encoding_failed(format!("failed to spawn ffmpeg: {e}")))?;

    // Drain stderr concurrently: a chatty child (per-frame decode errors)
    // can fill the pipe buffer and block, and the poll loop below would
    // then spin forever on a child that never exits.
    let stderr_pipe = child.stderr.take();
    let stderr_drain = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let status = loop {
        if cancel.is_cancelled() {
            tracing::info!("cancellation requested, terminating ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
            let _ = stderr_drain.join();
            return Err(SlidecastError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(WAIT_POLL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                return Err(SlidecastError::encoding_failed(format!(
                    "failed to wait for ffmpeg: {e}"
                )));
            }
        }
    };

    let stderr = stderr_drain.join().unwrap_or_default();

    if !status.success() {
        return Err(SlidecastError::encoding_failed(format!(
            "ffmpeg exited with status {}: {}",
            status,
            stderr.trim()
        )));
    }
    if !stderr.trim().is_empty() {
        tracing::debug!(stderr = %stderr.trim(), "ffmpeg finished with warnings");
    }
    Ok(())
}
