use std::io::{self, Read};
use std::process::Stdio;
use std::thread;
use bytes::BytesMut;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use anyhow::{bail, Context, Result};
use shared::protocol::{CAPTURE_FLAGS, MAX_LINE_LENGTH};
use crate::config::Config;

/// Line stream over any async reader
pub type Lines<R> = FramedRead<R, CaptureLines>;

/// Line stream fed by a reader thread
pub type ThreadLines = flume::r#async::RecvStream<'static, Result<String, LinesCodecError>>;

/// Newline-delimited decoder that drops lines it cannot use.
///
/// Lines that are not UTF-8 or exceed the length limit are skipped whole.
/// `FramedRead` ends the stream after the first decode error, so these must
/// never surface; only genuine read errors do.
#[derive(Debug)]
pub struct CaptureLines {
    inner: LinesCodec,
}

impl CaptureLines {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Default for CaptureLines {
    fn default() -> Self {
        Self::new()
    }
}

/// True for errors that only affect the current line
fn is_bad_line(err: &LinesCodecError) -> bool {
    match err {
        LinesCodecError::MaxLineLengthExceeded => true,
        LinesCodecError::Io(e) => e.kind() == io::ErrorKind::InvalidData,
    }
}

impl Decoder for CaptureLines {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        loop {
            match self.inner.decode(buf) {
                Err(e) if is_bad_line(&e) => continue,
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        loop {
            match self.inner.decode_eof(buf) {
                Err(e) if is_bad_line(&e) => continue,
                other => return other,
            }
        }
    }
}

/// A running capture subprocess whose stdout feeds the engine.
pub struct Capture {
    child: Child,
    program: String,
    interface: String,
}

/// Program and arguments for the capture command:
/// `[sudo] <command> -l -n -t -i <interface> <filter>`.
pub fn capture_command(config: &Config) -> (String, Vec<String>) {
    let capture = &config.capture;
    let mut args: Vec<String> = Vec::new();

    let program = if capture.sudo {
        args.push(capture.command.clone());
        "sudo".to_string()
    } else {
        capture.command.clone()
    };

    args.extend(CAPTURE_FLAGS.iter().map(|flag| flag.to_string()));
    args.push("-i".to_string());
    args.push(capture.interface.clone());
    args.extend(config.capture_filter().split_whitespace().map(str::to_string));

    (program, args)
}

impl Capture {
    /// Start the capture command with stdout piped back to us
    pub fn spawn(config: &Config) -> Result<(Self, Lines<ChildStdout>)> {
        let (program, args) = capture_command(config);
        tracing::info!("Starting capture: {} {}", program, args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start capture command '{}' (is it installed and on PATH?)", program))?;

        let stdout = child
            .stdout
            .take()
            .context("Capture command has no stdout pipe")?;

        let capture = Self {
            child,
            program,
            interface: config.capture.interface.clone(),
        };
        Ok((capture, FramedRead::new(stdout, CaptureLines::new())))
    }

    /// Reap the capture process once the engine is done with its output.
    ///
    /// After an interruption the process is killed and its status ignored.
    /// Otherwise a non-zero exit is reported as a setup problem.
    pub async fn finish(mut self, interrupted: bool) -> Result<()> {
        if interrupted {
            if let Err(e) = self.child.start_kill() {
                tracing::debug!("Capture process already gone: {}", e);
            }
            let _ = self.child.wait().await;
            return Ok(());
        }

        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for capture command '{}'", self.program))?;

        if !status.success() {
            bail!(
                "Capture command '{}' exited with {}; it usually needs root or CAP_NET_RAW, and interface '{}' must exist",
                self.program,
                status,
                self.interface
            );
        }

        tracing::info!("Capture command exited cleanly");
        Ok(())
    }
}

/// Lines from our own stdin, for piping in a recorded capture
pub fn stdin_lines() -> ThreadLines {
    spawn_reader(io::stdin())
}

/// Decode lines from a blocking reader on its own thread.
///
/// A blocked read cannot be cancelled, so it must not live on the runtime:
/// dropping the returned stream leaves the thread parked in `read` without
/// holding up shutdown.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> ThreadLines {
    let (tx, rx) = flume::bounded(1024);

    thread::spawn(move || {
        let mut codec = CaptureLines::new();
        let mut buf = BytesMut::with_capacity(8 * 1024);
        let mut chunk = [0u8; 8 * 1024];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Err(LinesCodecError::from(e)));
                    return;
                }
            };
            buf.extend_from_slice(&chunk[..n]);

            loop {
                match codec.decode(&mut buf) {
                    Ok(Some(line)) => {
                        if tx.send(Ok(line)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                }
            }
        }

        loop {
            match codec.decode_eof(&mut buf) {
                Ok(Some(line)) => {
                    if tx.send(Ok(line)).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
        tracing::debug!("Line reader reached end of input");
    });

    rx.into_stream()
}
