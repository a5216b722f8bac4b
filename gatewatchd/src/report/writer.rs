use std::io::Write;
use std::thread;
use tokio::sync::oneshot;
use anyhow::{anyhow, Context, Result};

/// Commands sent to the writer thread
pub enum WriterCommand {
    Emit(String),
    Shutdown(oneshot::Sender<Result<()>>),
}

/// Handle to the thread that owns the report output.
///
/// Reports are rendered on the control loop and handed over fully formed, so
/// a slow or blocked stdout never stalls ingestion.
#[derive(Clone)]
pub struct ReportHandle {
    tx: flume::Sender<WriterCommand>,
}

impl ReportHandle {
    /// Spawn the writer thread around `out`
    pub fn spawn<W: Write + Send + 'static>(mut out: W) -> Self {
        let (tx, rx) = flume::unbounded::<WriterCommand>();

        thread::spawn(move || {
            while let Ok(cmd) = rx.recv() {
                match cmd {
                    WriterCommand::Emit(report) => {
                        if let Err(e) = write_report(&mut out, &report) {
                            tracing::error!("Failed to write report: {:#}", e);
                        }
                    }
                    WriterCommand::Shutdown(reply) => {
                        let result = out.flush().context("Failed to flush report output");
                        tracing::debug!("Report writer shutting down");
                        let _ = reply.send(result);
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue a rendered report. Never blocks.
    pub fn emit(&self, report: String) -> Result<()> {
        self.tx
            .send(WriterCommand::Emit(report))
            .map_err(|_| anyhow!("report writer has stopped"))
    }

    /// Write out everything queued so far, then stop the thread.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send_async(WriterCommand::Shutdown(reply))
            .await
            .map_err(|_| anyhow!("report writer has stopped"))?;
        rx.await?
    }
}

/// Each report is followed by a blank line to separate consecutive windows.
fn write_report<W: Write>(out: &mut W, report: &str) -> Result<()> {
    out.write_all(report.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
pub use testing::SharedBuffer;

#[cfg(test)]
mod testing {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory output shared between a test and the writer thread.
    #[derive(Debug, Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_written_in_order_before_shutdown_returns() {
        let out = SharedBuffer::default();
        let handle = ReportHandle::spawn(out.clone());

        handle.emit("first".to_string()).unwrap();
        handle.emit("second".to_string()).unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(out.contents(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_rendered_reports_separated_by_blank_line() {
        let out = SharedBuffer::default();
        let handle = ReportHandle::spawn(out.clone());

        handle.emit("=== one\nbody\n".to_string()).unwrap();
        handle.emit("=== two\nbody\n".to_string()).unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(out.contents(), "=== one\nbody\n\n=== two\nbody\n\n");
    }

    #[tokio::test]
    async fn test_clones_share_one_writer() {
        let out = SharedBuffer::default();
        let handle = ReportHandle::spawn(out.clone());
        let other = handle.clone();

        other.emit("from clone".to_string()).unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(out.contents(), "from clone\n");
    }
}
