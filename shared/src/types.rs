use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::protocol::{DNS_CAPTURE_FILTER, FLOW_CAPTURE_FILTER};

/// A DNS query observed on the wire.
/// Used for both unique-set and suffix-count modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    /// Querying host, port suffix removed
    pub source_address: String,

    /// Queried name without its trailing dot, case preserved
    pub queried_name: String,
}

/// A single IP packet between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub source_address: String,
    pub destination_address: String,

    /// Payload length reported by the capture tool, 0 when absent
    pub byte_length: u64,
}

/// Typed output of the line parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Query(QueryRecord),
    /// Same shape as `Query`; the name is reduced to its suffix label on merge
    Tld(QueryRecord),
    Flow(FlowRecord),
}

/// Which line shape the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Dns,
    Flow,
}

/// Aggregation semantics installed in the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationMode {
    /// Unique queried names per source
    #[default]
    UniqueSet,
    /// Suffix label popularity per source
    Count,
    /// Packet and byte totals per source/destination pair
    PairSum,
}

impl AggregationMode {
    pub fn grammar(self) -> Grammar {
        match self {
            AggregationMode::UniqueSet | AggregationMode::Count => Grammar::Dns,
            AggregationMode::PairSum => Grammar::Flow,
        }
    }

    /// Default capture filter matching the grammar of this mode
    pub fn capture_filter(self) -> &'static str {
        match self.grammar() {
            Grammar::Dns => DNS_CAPTURE_FILTER,
            Grammar::Flow => FLOW_CAPTURE_FILTER,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationMode::UniqueSet => "unique-set",
            AggregationMode::Count => "count",
            AggregationMode::PairSum => "pair-sum",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique-set" => Ok(AggregationMode::UniqueSet),
            "count" => Ok(AggregationMode::Count),
            "pair-sum" => Ok(AggregationMode::PairSum),
            other => Err(format!(
                "unknown aggregation mode '{}' (expected unique-set, count or pair-sum)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_grammar() {
        assert_eq!(AggregationMode::UniqueSet.grammar(), Grammar::Dns);
        assert_eq!(AggregationMode::Count.grammar(), Grammar::Dns);
        assert_eq!(AggregationMode::PairSum.grammar(), Grammar::Flow);
    }

    #[test]
    fn test_mode_from_str_matches_display() {
        for mode in [AggregationMode::UniqueSet, AggregationMode::Count, AggregationMode::PairSum] {
            assert_eq!(mode.to_string().parse::<AggregationMode>(), Ok(mode));
        }
        assert!("sum".parse::<AggregationMode>().is_err());
    }
}
