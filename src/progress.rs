//! Live encode progress: a single-use local TCP listener that receives
//! ffmpeg's `-progress` telemetry and turns it into percentage callbacks.
//!
//! The channel is armed before the encoder starts and joined after it exits.
//! Everything that can go wrong past setup (nobody connects, a read fails,
//! a line does not parse) only degrades progress fidelity; the assembly
//! itself never fails because of it.

use std::io::Read as _;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{SlidecastError, SlidecastResult};

/// How long the receiver waits for the encoder to connect. The encoder may
/// finish before ever connecting; that is not an error.
pub const ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const READ_CHUNK: usize = 64;

/// Progress callback shared between the channel's receiver thread and the
/// builder's final authoritative update.
pub type ProgressFn = Arc<dyn Fn(u32, Option<&str>) + Send + Sync>;

/// `clamp(ceil(done / total * 100), 0, 100)`
pub fn percent_of(done_sec: f64, total_sec: f64) -> u32 {
    let raw = (done_sec / total_sec * 100.0).ceil();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u32
}

/// How the receiver thread ended. Surfaced through [`ProgressChannel::close`]
/// so the owning scope always learns the worker's fate instead of the
/// original fire-and-forget join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The client connected and the stream was drained to EOF.
    Completed,
    /// No client connected within the accept timeout.
    TimedOut,
    /// An I/O fault ended the receive loop early.
    Faulted(String),
}

/// Incremental parser for the `key=value\n` telemetry stream. Bytes arrive
/// split at arbitrary boundaries; complete lines are consumed as they
/// appear and the trailing partial line is retained across feeds.
pub struct TelemetryParser {
    buf: Vec<u8>,
    total_sec: f64,
}

impl TelemetryParser {
    pub fn new(total_sec: f64) -> Self {
        Self {
            buf: Vec::new(),
            total_sec,
        }
    }

    /// Feed a chunk of wire bytes, emitting one percentage per complete
    /// `out_time_ms` line. All other keys are ignored (ffmpeg emits many).
    pub fn feed(&mut self, chunk: &[u8], emit: &mut dyn FnMut(u32)) {
        self.buf.extend_from_slice(chunk);
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let Ok(line) = std::str::from_utf8(&line[..line.len() - 1]) else {
                continue;
            };
            if let Some(done_sec) = parse_out_time(line) {
                emit(percent_of(done_sec, self.total_sec));
            }
        }
    }
}

/// `out_time_ms` carries microseconds despite the name. A non-numeric value
/// (ffmpeg reports `N/A` early on) counts as zero elapsed.
fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.split_once('=')?;
    if key != "out_time_ms" {
        return None;
    }
    let micros = value.parse::<u64>().unwrap_or(0);
    Some(micros as f64 / 1_000_000.0)
}

/// Single-use, single-client progress listener. Bound on an ephemeral
/// localhost port at `open`; the receiver thread is always joined, either
/// through `close` or on drop.
pub struct ProgressChannel {
    local_addr: std::net::SocketAddr,
    worker: Option<JoinHandle<ChannelOutcome>>,
}

impl ProgressChannel {
    /// Bind, arm the background receiver, and return immediately. A bind
    /// failure is fatal to the assembly; it happens before the encoder runs.
    pub fn open(total_sec: f64, on_update: ProgressFn) -> SlidecastResult<Self> {
        Self::open_with_timeout(total_sec, on_update, ACCEPT_TIMEOUT)
    }

    pub fn open_with_timeout(
        total_sec: f64,
        on_update: ProgressFn,
        accept_timeout: Duration,
    ) -> SlidecastResult<Self> {
        let listener =
            TcpListener::bind("127.0.0.1:0").map_err(SlidecastError::ChannelSetupFailed)?;
        listener
            .set_nonblocking(true)
            .map_err(SlidecastError::ChannelSetupFailed)?;
        let local_addr = listener
            .local_addr()
            .map_err(SlidecastError::ChannelSetupFailed)?;

        let worker = std::thread::spawn(move || {
            receive_loop(listener, accept_timeout, total_sec, on_update)
        });

        tracing::debug!(%local_addr, "progress channel armed");
        Ok(Self {
            local_addr,
            worker: Some(worker),
        })
    }

    /// Address string for ffmpeg's `-progress` flag.
    pub fn progress_url(&self) -> String {
        format!("tcp://{}", self.local_addr)
    }

    /// Join the receiver and report how it ended.
    pub fn close(mut self) -> ChannelOutcome {
        self.join_worker()
    }

    fn join_worker(&mut self) -> ChannelOutcome {
        match self.worker.take() {
            Some(handle) => match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => ChannelOutcome::Faulted("receiver panicked".to_string()),
            },
            None => ChannelOutcome::Completed,
        }
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let outcome = self.join_worker();
            tracing::debug!(?outcome, "progress channel dropped");
        }
    }
}

fn receive_loop(
    listener: TcpListener,
    accept_timeout: Duration,
    total_sec: f64,
    on_update: ProgressFn,
) -> ChannelOutcome {
    let deadline = Instant::now() + accept_timeout;
    let stream = loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "encoder connected to progress channel");
                break stream;
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    tracing::warn!("timed out waiting for the encoder to connect");
                    return ChannelOutcome::TimedOut;
                }
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                tracing::warn!(error = %e, "progress channel accept failed");
                return ChannelOutcome::Faulted(e.to_string());
            }
        }
    };

    drain_stream(stream, total_sec, &on_update)
}

fn drain_stream(mut stream: TcpStream, total_sec: f64, on_update: &ProgressFn) -> ChannelOutcome {
    // The listener was nonblocking; the accepted stream must not be.
    if let Err(e) = stream.set_nonblocking(false) {
        return ChannelOutcome::Faulted(e.to_string());
    }

    let mut parser = TelemetryParser::new(total_sec);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return ChannelOutcome::Completed,
            Ok(n) => parser.feed(&chunk[..n], &mut |percent| on_update(percent, None)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "progress stream read failed");
                return ChannelOutcome::Faulted(e.to_string());
            }
        }
    }
}
