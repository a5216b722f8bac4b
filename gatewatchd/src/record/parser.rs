use std::sync::OnceLock;
use regex::Regex;
use shared::types::{AggregationMode, FlowRecord, Grammar, QueryRecord, Record};
use super::keys::strip_port;

/// Optional `HH:MM:SS.ffffff ` stamp, present when capture runs without `-t`.
const TIME_PREFIX: &str = r"(?:\d{2}:\d{2}:\d{2}(?:\.\d+)? )?";

static DNS_LINE: OnceLock<Regex> = OnceLock::new();
static FLOW_LINE: OnceLock<Regex> = OnceLock::new();

/// `IP <src>.<port> > <dst>.<port>: <id>[+%] [[1au]] <qtype>? <name>. (<len>)`
fn dns_line() -> &'static Regex {
    DNS_LINE.get_or_init(|| {
        Regex::new(&format!(
            r"^{}IP (\S+) > \S+: \d+[+%]* (?:\[\w+\] )?\w+\? (\S+)\. \(\d+\)",
            TIME_PREFIX
        ))
        .expect("dns line pattern is valid")
    })
}

/// `IP <src>.<port> > <dst>.<port>: ... [length <n>] ...`
fn flow_line() -> &'static Regex {
    FLOW_LINE.get_or_init(|| {
        Regex::new(&format!(
            r"^{}IP (\S+) > (\S+):(?:\s|$)(?:.*?\blength (\d+))?",
            TIME_PREFIX
        ))
        .expect("flow line pattern is valid")
    })
}

/// Parse one capture line into a record for the given mode.
///
/// Lines that don't match the mode's grammar yield `None`; they are not errors.
pub fn parse(line: &str, mode: AggregationMode) -> Option<Record> {
    match mode.grammar() {
        Grammar::Dns => {
            let query = parse_query(line)?;
            Some(match mode {
                AggregationMode::Count => Record::Tld(query),
                _ => Record::Query(query),
            })
        }
        Grammar::Flow => parse_flow(line).map(Record::Flow),
    }
}

fn parse_query(line: &str) -> Option<QueryRecord> {
    let caps = dns_line().captures(line)?;
    Some(QueryRecord {
        source_address: strip_port(&caps[1]),
        queried_name: caps[2].to_string(),
    })
}

fn parse_flow(line: &str) -> Option<FlowRecord> {
    let caps = flow_line().captures(line)?;
    let byte_length = match caps.get(3) {
        Some(len) => len.as_str().parse().ok()?,
        None => 0,
    };
    Some(FlowRecord {
        source_address: strip_port(&caps[1]),
        destination_address: strip_port(&caps[2]),
        byte_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "IP 10.0.0.5.53012 > 10.0.0.1.53: 4321+ A? Example.COM. (29)";
    const AAAA_EDNS: &str =
        "IP 10.0.0.7.41000 > 10.0.0.1.53: 52113+ [1au] AAAA? mail.example.org. (46)";
    const TCP_FLOW: &str = "IP 10.0.0.5.443 > 93.184.216.34.51514: Flags [P.], seq 1:518, ack 1, win 501, options [nop,nop,TS val 1 ecr 2], length 517";

    #[test]
    fn test_parse_dns_query() {
        let record = parse(QUERY, AggregationMode::UniqueSet).unwrap();
        assert_eq!(
            record,
            Record::Query(QueryRecord {
                source_address: "10.0.0.5".to_string(),
                queried_name: "Example.COM".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_dns_query_in_count_mode_is_tld() {
        match parse(QUERY, AggregationMode::Count) {
            Some(Record::Tld(q)) => assert_eq!(q.queried_name, "Example.COM"),
            other => panic!("expected tld record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_dns_query_with_edns_marker() {
        match parse(AAAA_EDNS, AggregationMode::UniqueSet) {
            Some(Record::Query(q)) => {
                assert_eq!(q.source_address, "10.0.0.7");
                assert_eq!(q.queried_name, "mail.example.org");
            }
            other => panic!("expected query record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_dns_mixed_case_qtype() {
        let line = "IP 10.0.0.5.41000 > 10.0.0.1.53: 7+ Type65? cdn.example.net. (33)";
        match parse(line, AggregationMode::UniqueSet) {
            Some(Record::Query(q)) => assert_eq!(q.queried_name, "cdn.example.net"),
            other => panic!("expected query record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_dns_with_time_prefix() {
        let line = format!("12:01:02.123456 {}", QUERY);
        assert!(parse(&line, AggregationMode::UniqueSet).is_some());
    }

    #[test]
    fn test_parse_dns_ignores_responses_and_noise() {
        let response = "IP 10.0.0.1.53 > 10.0.0.5.53012: 4321 1/0/0 A 93.184.216.34 (45)";
        assert_eq!(parse(response, AggregationMode::UniqueSet), None);
        assert_eq!(parse("listening on eth0, link-type EN10MB", AggregationMode::UniqueSet), None);
        assert_eq!(parse("", AggregationMode::Count), None);
    }

    #[test]
    fn test_parse_is_anchored() {
        let line = format!("garbage {}", QUERY);
        assert_eq!(parse(&line, AggregationMode::UniqueSet), None);
    }

    #[test]
    fn test_parse_flow_with_length() {
        let record = parse(TCP_FLOW, AggregationMode::PairSum).unwrap();
        assert_eq!(
            record,
            Record::Flow(FlowRecord {
                source_address: "10.0.0.5".to_string(),
                destination_address: "93.184.216.34".to_string(),
                byte_length: 517,
            })
        );
    }

    #[test]
    fn test_parse_flow_without_length() {
        let line = "IP 10.0.0.1.53 > 10.0.0.5.53012: 4321 1/0/0 A 93.184.216.34 (45)";
        match parse(line, AggregationMode::PairSum) {
            Some(Record::Flow(flow)) => {
                assert_eq!(flow.source_address, "10.0.0.1");
                assert_eq!(flow.destination_address, "10.0.0.5");
                assert_eq!(flow.byte_length, 0);
            }
            other => panic!("expected flow record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flow_icmp_without_ports() {
        let line = "IP 10.0.0.5 > 8.8.8.8: ICMP echo request, id 7, seq 1, length 64";
        match parse(line, AggregationMode::PairSum) {
            Some(Record::Flow(flow)) => {
                assert_eq!(flow.source_address, "10.0.0.5");
                assert_eq!(flow.destination_address, "8.8.8.8");
                assert_eq!(flow.byte_length, 64);
            }
            other => panic!("expected flow record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flow_rejects_ipv6_and_arp() {
        let v6 = "IP6 fe80::1.546 > ff02::1:2.547: dhcp6 solicit";
        let arp = "ARP, Request who-has 10.0.0.1 tell 10.0.0.5, length 28";
        assert_eq!(parse(v6, AggregationMode::PairSum), None);
        assert_eq!(parse(arp, AggregationMode::PairSum), None);
    }

    #[test]
    fn test_parse_is_pure() {
        for mode in [AggregationMode::UniqueSet, AggregationMode::Count, AggregationMode::PairSum] {
            for line in [QUERY, AAAA_EDNS, TCP_FLOW, "noise"] {
                assert_eq!(parse(line, mode), parse(line, mode));
            }
        }
    }
}
