use shared::protocol::UNKNOWN_SUFFIX;

/// Strip a trailing port from a tcpdump address such as `10.0.0.5.53012`.
///
/// Only dotted-quad IPv4 is understood: anything with more than four
/// dot-separated parts is cut back to the first four. IPv6 literals and
/// hostnames with extra dots are mis-split; they are passed through this
/// rule unchanged rather than guessed at.
pub fn strip_port(address: &str) -> String {
    let parts: Vec<&str> = address.split('.').collect();
    if parts.len() > 4 {
        parts[..4].join(".")
    } else {
        address.to_string()
    }
}

/// Lower-cased final segment of a dotted name, e.g. `x.co.JP` -> `jp`.
pub fn suffix_label(name: &str) -> String {
    name.split('.')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_lowercase())
        .unwrap_or_else(|| UNKNOWN_SUFFIX.to_string())
}
