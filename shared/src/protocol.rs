/// Suffix label used when a queried name has no dot-delimited segments
pub const UNKNOWN_SUFFIX: &str = "(unknown)";

/// Capture filter for the DNS grammar modes (unique-set, count)
pub const DNS_CAPTURE_FILTER: &str = "udp port 53";

/// Capture filter for the flow grammar mode (pair-sum)
pub const FLOW_CAPTURE_FILTER: &str = "ip";

/// Flags passed to the capture tool: line-buffered, numeric, no timestamps
pub const CAPTURE_FLAGS: [&str; 3] = ["-l", "-n", "-t"];

/// Summary line emitted in place of groups when a window saw no records
pub const NO_ACTIVITY: &str = "no activity this window";

/// Longest capture line kept; longer lines are skipped
pub const MAX_LINE_LENGTH: usize = 64 * 1024;
