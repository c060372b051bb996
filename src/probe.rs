//! Media metadata inspection via the system `ffprobe` binary.

use std::path::Path;
use std::process::Command;

use crate::error::{SlidecastError, SlidecastResult};

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

fn run_ffprobe(path: &Path) -> Result<ProbeOut, String> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run ffprobe: {e}"))?;
    if !out.status.success() {
        return Err(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    serde_json::from_slice(&out.stdout).map_err(|e| format!("ffprobe json parse failed: {e}"))
}

/// Duration of an arbitrary media file in seconds, from the container format
/// section of ffprobe output.
pub fn probe_duration_sec(path: &Path) -> SlidecastResult<f64> {
    let parsed = run_ffprobe(path).map_err(|reason| SlidecastError::invalid_audio(path, reason))?;
    parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| SlidecastError::invalid_audio(path, "no duration in container metadata"))
}

/// True when ffprobe can open the file and its first stream is a visual
/// stream. Used as the fallback still-image predicate for files whose
/// extension gives no verdict.
pub fn first_stream_is_visual(path: &Path) -> bool {
    match run_ffprobe(path) {
        Ok(parsed) => parsed
            .streams
            .first()
            .and_then(|s| s.codec_type.as_deref())
            == Some("video"),
        Err(reason) => {
            tracing::debug!(path = %path.display(), %reason, "probe fallback rejected file");
            false
        }
    }
}

pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_json_shape_parses() {
        let raw = r#"{
            "streams": [{"codec_type": "video", "width": 640}],
            "format": {"duration": "20.043000"}
        }"#;
        let parsed: ProbeOut = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.streams.len(), 1);
        assert_eq!(parsed.streams[0].codec_type.as_deref(), Some("video"));
        let dur: f64 = parsed.format.unwrap().duration.unwrap().parse().unwrap();
        assert!((dur - 20.043).abs() < 1e-9);
    }

    #[test]
    fn probe_json_without_streams_parses() {
        let parsed: ProbeOut = serde_json::from_str(r#"{"format": {}}"#).unwrap();
        assert!(parsed.streams.is_empty());
        assert!(parsed.format.unwrap().duration.is_none());
    }

    #[test]
    fn probing_a_missing_file_is_invalid_audio() {
        if !is_ffprobe_on_path() {
            eprintln!("skipping: ffprobe not on PATH");
            return;
        }
        let err = probe_duration_sec(Path::new("definitely/not/here.mp3")).unwrap_err();
        assert!(matches!(
            err,
            SlidecastError::InvalidAudio { .. }
        ));
    }
}
