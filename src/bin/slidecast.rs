use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use slidecast::AssemblyRequest;

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a slideshow MP4 (requires `ffmpeg`/`ffprobe` on PATH).
    Assemble(AssembleArgs),
    /// Print the probed duration of a media file in seconds.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Directory of still images (1-50 recognized images).
    #[arg(long)]
    images: PathBuf,

    /// Audio track; the slideshow exactly spans its duration.
    #[arg(long)]
    audio: PathBuf,

    /// Output MP4 path, overwritten if it exists.
    #[arg(long)]
    out: PathBuf,

    /// Suppress the progress bar.
    #[arg(long)]
    quiet: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Assemble(args) => cmd_assemble(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn cmd_assemble(args: AssembleArgs) -> anyhow::Result<()> {
    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>3}% {msg}",
            )
            .expect("valid progress template"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    let cb_bar = bar.clone();
    let request = AssemblyRequest::new(&args.images, &args.audio, &args.out).with_progress(
        Arc::new(move |percent, label| {
            if let Some(label) = label {
                cb_bar.set_message(label.to_string());
            }
            cb_bar.set_position(u64::from(percent));
        }),
    );

    match slidecast::assemble(&request) {
        Ok(()) => {
            bar.finish_and_clear();
            println!("wrote {}", args.out.display());
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let duration = slidecast::probe_duration_sec(&args.path)?;
    println!("{duration}");
    Ok(())
}
