use std::time::{Duration, Instant};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use shared::types::AggregationMode;
use crate::clock::Clock;
use crate::record::parse;
use crate::report::{ReportHandle, Reporter, WindowInfo};
use crate::window::{Aggregator, WindowScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Terminated,
}

/// Why the engine left `Running` and produced its terminal report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Interrupted,
}

/// Single control loop: read a line, parse, merge, check the window, repeat.
pub struct Engine<C: Clock> {
    mode: AggregationMode,
    aggregator: Aggregator,
    scheduler: WindowScheduler,
    reporter: Reporter,
    output: ReportHandle,
    clock: C,
    records: u64,
    state: LifecycleState,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        mode: AggregationMode,
        interval: Duration,
        reporter: Reporter,
        output: ReportHandle,
        clock: C,
    ) -> Self {
        let scheduler = WindowScheduler::new(interval, clock.now());
        Self {
            mode,
            aggregator: Aggregator::new(mode),
            scheduler,
            reporter,
            output,
            clock,
            records: 0,
            state: LifecycleState::Running,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Drive the loop until the source ends or `cancel` fires, then emit the
    /// terminal report.
    ///
    /// Cancellation is only observed while waiting for the next line, so a line
    /// is never abandoned half merged. A source error ends the loop without a
    /// terminal report.
    pub async fn run<S, E>(&mut self, lines: S, cancel: &CancellationToken) -> Result<StopReason>
    where
        S: Stream<Item = std::result::Result<String, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        tracing::info!(mode = %self.mode, interval_secs = self.scheduler.interval().as_secs(), "Engine running");
        futures::pin_mut!(lines);

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Interrupted, draining");
                    break StopReason::Interrupted;
                }

                next = lines.next() => match next {
                    Some(Ok(line)) => {
                        if let Err(e) = self.process_line(&line) {
                            self.state = LifecycleState::Terminated;
                            return Err(e);
                        }
                    }
                    Some(Err(e)) => {
                        self.state = LifecycleState::Terminated;
                        return Err(e).context(
                            "Failed to read capture output (is the capture running with enough privileges?)",
                        );
                    }
                    None => {
                        tracing::info!("Line source closed, draining");
                        break StopReason::EndOfStream;
                    }
                },
            }
        };

        self.state = LifecycleState::Draining;
        let now = self.clock.now();
        self.flush(now)?;
        self.state = LifecycleState::Terminated;

        tracing::info!(?reason, "Engine terminated");
        Ok(reason)
    }

    /// Process one line and flush if its arrival closed the window.
    pub fn process_line(&mut self, line: &str) -> Result<()> {
        if let Some(record) = parse(line, self.mode) {
            if self.aggregator.merge(&record) {
                self.records += 1;
            }
        }

        let now = self.clock.now();
        if self.scheduler.should_flush(now) {
            self.flush(now)?;
        }
        Ok(())
    }

    fn flush(&mut self, now: Instant) -> Result<()> {
        let sources = self.aggregator.source_count();
        let window = WindowInfo {
            generated_at: self.clock.wall(),
            interval: self.scheduler.interval(),
            elapsed: self.scheduler.elapsed(now),
            records: self.records,
        };
        let report = self.reporter.flush(&mut self.aggregator, window);

        tracing::debug!(
            sources,
            records = self.records,
            elapsed_ms = self.scheduler.elapsed(now).as_millis() as u64,
            "Window flushed"
        );

        self.records = 0;
        self.scheduler.mark_flushed(now);
        self.output.emit(report)
    }
}
