use std::collections::{BTreeMap, BTreeSet};
use shared::types::{AggregationMode, FlowRecord, QueryRecord, Record};
use crate::record::keys::suffix_label;

/// Unique queried names per source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueNames {
    pub by_source: BTreeMap<String, BTreeSet<String>>,
}

impl UniqueNames {
    pub fn merge(&mut self, source: &str, name: &str) {
        self.by_source
            .entry(source.to_string())
            .or_default()
            .insert(name.to_string());
    }
}

/// Occurrence count per source per suffix label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixCounts {
    pub by_source: BTreeMap<String, BTreeMap<String, u64>>,
}

impl SuffixCounts {
    pub fn merge(&mut self, source: &str, label: &str) {
        let count = self
            .by_source
            .entry(source.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default();
        *count = count.saturating_add(1);
    }
}

/// Running packet and byte totals for one source/destination pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowTotals {
    pub packet_count: u64,
    pub byte_total: u64,
}

/// Flow totals per source per destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairTotals {
    pub by_source: BTreeMap<String, BTreeMap<String, FlowTotals>>,
}

impl PairTotals {
    pub fn merge(&mut self, source: &str, destination: &str, length: u64) {
        let totals = self
            .by_source
            .entry(source.to_string())
            .or_default()
            .entry(destination.to_string())
            .or_default();
        totals.packet_count = totals.packet_count.saturating_add(1);
        totals.byte_total = totals.byte_total.saturating_add(length);
    }
}

/// Per-window state for the installed aggregation mode.
///
/// Keys are created on first touch and only removed by `reset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregator {
    UniqueSet(UniqueNames),
    Count(SuffixCounts),
    PairSum(PairTotals),
}

impl Aggregator {
    pub fn new(mode: AggregationMode) -> Self {
        match mode {
            AggregationMode::UniqueSet => Aggregator::UniqueSet(UniqueNames::default()),
            AggregationMode::Count => Aggregator::Count(SuffixCounts::default()),
            AggregationMode::PairSum => Aggregator::PairSum(PairTotals::default()),
        }
    }

    pub fn mode(&self) -> AggregationMode {
        match self {
            Aggregator::UniqueSet(_) => AggregationMode::UniqueSet,
            Aggregator::Count(_) => AggregationMode::Count,
            Aggregator::PairSum(_) => AggregationMode::PairSum,
        }
    }

    /// Merge one record. Returns false when the record shape does not
    /// belong to the installed mode; such records leave the state untouched.
    pub fn merge(&mut self, record: &Record) -> bool {
        match (self, record) {
            (Aggregator::UniqueSet(state), Record::Query(QueryRecord { source_address, queried_name })) => {
                state.merge(source_address, queried_name);
            }
            (Aggregator::Count(state), Record::Tld(QueryRecord { source_address, queried_name })) => {
                state.merge(source_address, &suffix_label(queried_name));
            }
            (
                Aggregator::PairSum(state),
                Record::Flow(FlowRecord { source_address, destination_address, byte_length }),
            ) => {
                state.merge(source_address, destination_address, *byte_length);
            }
            _ => return false,
        }
        true
    }

    /// Number of source keys touched since the last reset.
    pub fn source_count(&self) -> usize {
        match self {
            Aggregator::UniqueSet(state) => state.by_source.len(),
            Aggregator::Count(state) => state.by_source.len(),
            Aggregator::PairSum(state) => state.by_source.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_count() == 0
    }

    /// Replace the whole state with an empty one of the same mode.
    pub fn reset(&mut self) {
        *self = Aggregator::new(self.mode());
    }
}
