//! Best-Effort Connection-Log Parser
//!
//! Router and firewall devices emit connection logs whose exact shape
//! depends on device model, firmware, and operator configuration - the
//! format is not contractually stable. Parsing is therefore deliberately
//! best-effort: three independent regex extractions run over the same
//! input, each optional, none blocking the others. A message that matches
//! nothing still produces a valid record carrying only the raw text.
//!
//! Typical input:
//!
//! ```text
//! start_time input: in:<pppoe-alice> out:(unknown 0), src-mac 00:00:00:00:00:00,
//! proto TCP (SYN), 192.168.88.10:5432->1.1.1.1:80, len 60
//! ```
//!
//! Extractions:
//! 1. traffic tuple `IP:PORT->IP:PORT` (first match wins)
//! 2. protocol token after a case-insensitive `proto ` marker
//! 3. username from a `in:<pppoe-NAME>` tunneling-session marker
//!
//! `parse` is total: it never fails and never panics, whatever the input.

use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on the stored raw message, in bytes.
///
/// Inbound datagrams are unauthenticated and unbounded; everything past
/// this limit is dropped at a char boundary before storage.
pub const MAX_MESSAGE_BYTES: usize = 2048;

/// Fields extracted from one raw message. Everything except `message` is
/// best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    pub source_ip: Option<String>,
    pub source_port: Option<u16>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<u16>,
    pub protocol: Option<String>,
    pub user: Option<String>,
    pub message: String,
}

fn traffic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d.]+):(\d+)->([\d.]+):(\d+)").expect("traffic regex"))
}

fn proto_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)proto ([A-Z0-9]+)").expect("proto regex"))
}

fn pppoe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"in:<pppoe-([^>]+)>").expect("pppoe regex"))
}

/// Parse one raw message into structured fields.
///
/// Total function: unmatched input yields a [`ParsedLog`] with only
/// `message` populated.
pub fn parse(raw: &str) -> ParsedLog {
    let mut out = ParsedLog {
        message: truncate_message(raw).to_string(),
        ..ParsedLog::default()
    };

    if let Some(caps) = traffic_re().captures(raw) {
        out.source_ip = Some(caps[1].to_string());
        out.dest_ip = Some(caps[3].to_string());
        // The digits are structurally valid but may still overflow a u16;
        // the port degrades to absent rather than failing the record.
        out.source_port = caps[2].parse().ok();
        out.dest_port = caps[4].parse().ok();
    }

    if let Some(caps) = proto_re().captures(raw) {
        out.protocol = Some(caps[1].to_string());
    }

    if let Some(caps) = pppoe_re().captures(raw) {
        out.user = Some(caps[1].to_string());
    }

    out
}

/// Truncate to [`MAX_MESSAGE_BYTES`] without splitting a UTF-8 character.
fn truncate_message(raw: &str) -> &str {
    if raw.len() <= MAX_MESSAGE_BYTES {
        return raw;
    }
    let mut end = MAX_MESSAGE_BYTES;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_traffic_log() {
        let parsed = parse(
            "start_time input: in:<pppoe-alice> out:(unknown 0), src-mac 00:00:00:00:00:00, \
             proto TCP (SYN), 192.168.88.10:5432->1.1.1.1:80, len 60",
        );
        assert_eq!(parsed.source_ip.as_deref(), Some("192.168.88.10"));
        assert_eq!(parsed.source_port, Some(5432));
        assert_eq!(parsed.dest_ip.as_deref(), Some("1.1.1.1"));
        assert_eq!(parsed.dest_port, Some(80));
        assert_eq!(parsed.protocol.as_deref(), Some("TCP"));
        assert_eq!(parsed.user.as_deref(), Some("alice"));
    }

    #[test]
    fn unmatched_input_yields_message_only() {
        let parsed = parse("system,info router rebooted by admin");
        assert_eq!(parsed.message, "system,info router rebooted by admin");
        assert!(parsed.source_ip.is_none());
        assert!(parsed.source_port.is_none());
        assert!(parsed.dest_ip.is_none());
        assert!(parsed.dest_port.is_none());
        assert!(parsed.protocol.is_none());
        assert!(parsed.user.is_none());
    }

    #[test]
    fn empty_input_does_not_panic() {
        let parsed = parse("");
        assert_eq!(parsed.message, "");
        assert!(parsed.protocol.is_none());
    }

    #[test]
    fn protocol_marker_is_case_insensitive() {
        assert_eq!(parse("x PROTO udp y").protocol.as_deref(), Some("udp"));
        assert_eq!(parse("x proto ICMP y").protocol.as_deref(), Some("ICMP"));
    }

    #[test]
    fn first_traffic_tuple_wins() {
        let parsed = parse("10.0.0.1:1111->10.0.0.2:2222 then 10.9.9.9:3333->10.8.8.8:4444");
        assert_eq!(parsed.source_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(parsed.dest_port, Some(2222));
    }

    #[test]
    fn overflowing_port_degrades_to_absent() {
        let parsed = parse("proto TCP, 10.0.0.1:99999->10.0.0.2:80");
        assert_eq!(parsed.source_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(parsed.source_port, None);
        assert_eq!(parsed.dest_port, Some(80));
        assert_eq!(parsed.protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn pppoe_user_extracted_without_prefix() {
        let parsed = parse("forward: in:<pppoe-bob.smith> out:ether1");
        assert_eq!(parsed.user.as_deref(), Some("bob.smith"));
    }

    #[test]
    fn oversized_message_truncated_at_char_boundary() {
        let raw = "ü".repeat(MAX_MESSAGE_BYTES); // 2 bytes per char
        let parsed = parse(&raw);
        assert!(parsed.message.len() <= MAX_MESSAGE_BYTES);
        assert!(parsed.message.chars().all(|c| c == 'ü'));

        let ascii = "a".repeat(MAX_MESSAGE_BYTES + 100);
        assert_eq!(parse(&ascii).message.len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn short_message_kept_verbatim() {
        let parsed = parse("short");
        assert_eq!(parsed.message, "short");
    }
}
