use std::path::PathBuf;
use std::process::Command;

fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

fn bin() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_slidecast")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "slidecast.exe"
            } else {
                "slidecast"
            });
            p
        })
}

#[test]
fn cli_probe_prints_a_duration() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg("sine=frequency=220:sample_rate=48000")
        .args(["-t", "2", "-c:a", "pcm_s16le"])
        .arg(&wav)
        .status()
        .unwrap();
    assert!(status.success());

    let out = Command::new(bin()).arg("probe").arg(&wav).output().unwrap();
    assert!(out.status.success());
    let printed: f64 = String::from_utf8_lossy(&out.stdout).trim().parse().unwrap();
    assert!((printed - 2.0).abs() < 0.2, "printed {printed}");
}

// An encoder that exits 0 but produces a file the probe rejects must fail
// the assembly AND remove the corrupt artifact. Driven through stand-in
// ffmpeg/ffprobe binaries so the behavior is reachable deterministically.
#[cfg(unix)]
#[test]
fn cli_assemble_discards_output_the_probe_rejects() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = tempfile::tempdir().unwrap();
    let tools = dir.path().join("tools");
    std::fs::create_dir(&tools).unwrap();

    let write_tool = |name: &str, body: &str| {
        let path = tools.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    };

    // "Encodes" by dumping garbage at the output path, then exits cleanly.
    write_tool(
        "ffmpeg",
        "#!/bin/sh\n\
         if [ \"$1\" = \"-version\" ]; then exit 0; fi\n\
         for a; do last=$a; done\n\
         printf 'garbage' > \"$last\"\n\
         exit 0\n",
    );
    // Probes the audio fine but rejects the produced mp4.
    write_tool(
        "ffprobe",
        "#!/bin/sh\n\
         for a; do last=$a; done\n\
         if [ \"$last\" = \"-version\" ]; then exit 0; fi\n\
         case \"$last\" in\n\
           *.mp4) echo 'cannot probe' >&2; exit 1 ;;\n\
           *) printf '{\"streams\":[{\"codec_type\":\"audio\"}],\"format\":{\"duration\":\"2.0\"}}' ;;\n\
         esac\n\
         exit 0\n",
    );

    let images = dir.path().join("slides");
    std::fs::create_dir(&images).unwrap();
    std::fs::File::create(images.join("slide.png")).unwrap();
    std::fs::File::create(dir.path().join("tone.wav")).unwrap();

    let out = dir.path().join("out.mp4");
    let run = Command::new(bin())
        .env("PATH", &tools)
        .arg("assemble")
        .arg("--images")
        .arg(&images)
        .arg("--audio")
        .arg(dir.path().join("tone.wav"))
        .arg("--out")
        .arg(&out)
        .arg("--quiet")
        .output()
        .unwrap();

    assert!(!run.status.success());
    let stderr = String::from_utf8_lossy(&run.stderr);
    assert!(stderr.contains("not probeable"), "stderr: {stderr}");
    assert!(!out.exists(), "corrupt artifact left at {}", out.display());
}

#[test]
fn cli_assemble_reports_missing_images_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("slides");
    std::fs::create_dir(&empty).unwrap();

    let out = Command::new(bin())
        .arg("assemble")
        .arg("--images")
        .arg(&empty)
        .arg("--audio")
        .arg(dir.path().join("missing.mp3"))
        .arg("--out")
        .arg(dir.path().join("show.mp4"))
        .arg("--quiet")
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no decodable images"), "stderr: {stderr}");
}
