use std::cmp::Reverse;
use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Local};
use shared::protocol::NO_ACTIVITY;
use crate::window::aggregator::{Aggregator, FlowTotals, PairTotals, SuffixCounts, UniqueNames};

const INDENT: &str = "    ";

/// Facts about the window being reported, gathered at flush time.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub generated_at: DateTime<Local>,
    /// Configured window length
    pub interval: Duration,
    /// Actual time since the previous flush
    pub elapsed: Duration,
    /// Records merged during the window
    pub records: u64,
}

/// Renders aggregation snapshots as operator-facing text.
#[derive(Debug, Clone)]
pub struct Reporter {
    host: String,
    top_n: usize,
}

impl Reporter {
    pub fn new(host: impl Into<String>, top_n: usize) -> Self {
        Self {
            host: host.into(),
            top_n,
        }
    }

    /// Render the aggregator, then reset it.
    ///
    /// Both happen under the one `&mut` borrow, so no merge can land between
    /// the render and the reset. The text is owned and can be written elsewhere.
    pub fn flush(&self, aggregator: &mut Aggregator, window: WindowInfo) -> String {
        let report = self.render(aggregator, &window);
        aggregator.reset();
        report
    }

    pub fn render(&self, snapshot: &Aggregator, window: &WindowInfo) -> String {
        Report {
            host: &self.host,
            top_n: self.top_n,
            snapshot,
            window,
        }
        .to_string()
    }
}

struct Report<'a> {
    host: &'a str,
    top_n: usize,
    snapshot: &'a Aggregator,
    window: &'a WindowInfo,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== gatewatch report | {} | host {} | mode {} | window {}s (elapsed {:.1}s) | {} records ===",
            self.window.generated_at.format("%Y-%m-%d %H:%M:%S %z"),
            self.host,
            self.snapshot.mode(),
            self.window.interval.as_secs(),
            self.window.elapsed.as_secs_f64(),
            self.window.records,
        )?;

        if self.snapshot.is_empty() {
            return writeln!(f, "{}", NO_ACTIVITY);
        }

        match self.snapshot {
            Aggregator::UniqueSet(state) => write_unique(f, state),
            Aggregator::Count(state) => write_counts(f, state),
            Aggregator::PairSum(state) => write_pairs(f, state, self.top_n),
        }
    }
}

fn write_unique(f: &mut fmt::Formatter<'_>, state: &UniqueNames) -> fmt::Result {
    for (source, names) in &state.by_source {
        writeln!(f, "{} ({} unique names)", source, names.len())?;
        for name in names {
            writeln!(f, "{}{}", INDENT, name)?;
        }
    }
    Ok(())
}

fn write_counts(f: &mut fmt::Formatter<'_>, state: &SuffixCounts) -> fmt::Result {
    for (source, counts) in &state.by_source {
        let total: u64 = counts.values().sum();
        writeln!(f, "{} ({} queries)", source, total)?;

        // Labels arrive in ascending order; the stable sort keeps that as the tiebreak.
        let mut ranked: Vec<(&String, &u64)> = counts.iter().collect();
        ranked.sort_by_key(|&(_, count)| Reverse(*count));

        let width = ranked.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, count) in ranked {
            writeln!(f, "{}{:<width$}  {}", INDENT, label, count, width = width)?;
        }
    }
    Ok(())
}

fn write_pairs(f: &mut fmt::Formatter<'_>, state: &PairTotals, top_n: usize) -> fmt::Result {
    for (source, destinations) in &state.by_source {
        writeln!(f, "{} ({} destinations)", source, destinations.len())?;

        let mut ranked: Vec<(&String, &FlowTotals)> = destinations.iter().collect();
        ranked.sort_by_key(|&(_, totals)| (Reverse(totals.packet_count), Reverse(totals.byte_total)));

        let shown = &ranked[..ranked.len().min(top_n)];
        let width = shown.iter().map(|(dst, _)| dst.len()).max().unwrap_or(0);
        for (destination, totals) in shown {
            writeln!(
                f,
                "{}{:<width$}  packets {:>8}  bytes {:>12}",
                INDENT,
                destination,
                totals.packet_count,
                totals.byte_total,
                width = width,
            )?;
        }

        let omitted = ranked.len() - shown.len();
        if omitted > 0 {
            writeln!(f, "{}... {} more destinations omitted", INDENT, omitted)?;
        }
    }
    Ok(())
}
