//! Parsers for the text nfdump prints with `-q -o pipe` and `-I`.
//!
//! Pipe output is positional. A flow line carries 24 unsigned columns:
//!
//! ```text
//! 0 af | 1 first | 2 msec_first | 3 last | 4 msec_last | 5 proto |
//! 6..=9 src address words | 10 srcport | 11..=14 dst address words | 15 dstport |
//! 16 srcas | 17 dstas | 18 input | 19 output | 20 flags | 21 tos | 22 packets | 23 bytes
//! ```
//!
//! Statistics lines share the first six columns, followed by the object and
//! six counters (flows, packets, bytes, pps, bps, bpp).

use crate::command::StatKind;
use crate::error::{NfdumpError, Result};
use crate::protocols::Protocols;
use crate::record::{FlowRecord, FlowSummary, StatRecord, StatValue, AF_INET6};
use chrono::{DateTime, TimeZone, Utc};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

const FLOW_MIN_COLUMNS: usize = 21;
const STAT_MIN_COLUMNS: usize = 11;

/// Marker of a zero-filled address object in a statistics line.
const ZERO_OBJECT: &str = "0|0|0|0";
const STAT_OBJECT_PADDED: usize = 9;
const STAT_OBJECT_PLAIN: usize = 6;

fn parse_err(line: &str, reason: impl Into<String>) -> NfdumpError {
    NfdumpError::Parse {
        line: line.to_string(),
        reason: reason.into(),
    }
}

/// Column accessor that reports the offending line on failure.
struct Columns<'a> {
    line: &'a str,
    parts: Vec<&'a str>,
}

impl<'a> Columns<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            parts: line.split('|').map(str::trim).collect(),
        }
    }

    fn len(&self) -> usize {
        self.parts.len()
    }

    fn raw(&self, idx: usize) -> Result<&'a str> {
        self.parts
            .get(idx)
            .copied()
            .ok_or_else(|| parse_err(self.line, format!("missing column {idx}")))
    }

    fn int<T: TryFrom<u64>>(&self, idx: usize) -> Result<T> {
        let raw = self.raw(idx)?;
        let value: u64 = raw
            .parse()
            .map_err(|_| parse_err(self.line, format!("column {idx} is not an integer: `{raw}`")))?;
        T::try_from(value)
            .map_err(|_| parse_err(self.line, format!("column {idx} out of range: {value}")))
    }

    fn timestamp(&self, secs_idx: usize, msec_idx: usize) -> Result<DateTime<Utc>> {
        let secs: i64 = self.int(secs_idx)?;
        let msec: u32 = self.int(msec_idx)?;
        if msec >= 1000 {
            return Err(parse_err(self.line, format!("column {msec_idx} is not milliseconds: {msec}")));
        }
        Utc.timestamp_opt(secs, msec * 1_000_000)
            .single()
            .ok_or_else(|| parse_err(self.line, format!("column {secs_idx} is not a timestamp")))
    }

    /// Address spread over four 32-bit words starting at `idx`.
    fn address(&self, af: u32, idx: usize) -> Result<IpAddr> {
        if af == AF_INET6 {
            let mut value: u128 = 0;
            for word in idx..idx + 4 {
                value = (value << 32) | u128::from(self.int::<u32>(word)?);
            }
            return Ok(IpAddr::V6(Ipv6Addr::from(value)));
        }
        let v4: u32 = self.int(idx + 3)?;
        Ok(IpAddr::V4(Ipv4Addr::from(v4)))
    }
}

/// Integer-encoded address, IPv4 when it fits in 32 bits.
pub fn ip_from_int(value: u128) -> IpAddr {
    match u32::try_from(value) {
        Ok(v4) => IpAddr::V4(Ipv4Addr::from(v4)),
        Err(_) => IpAddr::V6(Ipv6Addr::from(value)),
    }
}

/// Parses one flow line. Returns `Ok(None)` for lines too short to be flows.
pub fn parse_flow_line(line: &str, protocols: &Protocols) -> Result<Option<FlowRecord>> {
    let cols = Columns::new(line);
    if cols.len() < FLOW_MIN_COLUMNS {
        return Ok(None);
    }

    let af: u32 = cols.int(0)?;
    let proto: u8 = cols.int(5)?;
    Ok(Some(FlowRecord {
        af,
        first: cols.timestamp(1, 2)?,
        last: cols.timestamp(3, 4)?,
        proto,
        prot: protocols.name(proto).map(str::to_string),
        src_ip: cols.address(af, 6)?,
        src_port: cols.int(10)?,
        dst_ip: cols.address(af, 11)?,
        dst_port: cols.int(15)?,
        src_as: cols.int(16)?,
        dst_as: cols.int(17)?,
        input: cols.int(18)?,
        output: cols.int(19)?,
        flags: cols.int(20)?,
        tos: cols.int(21)?,
        packets: cols.int(22)?,
        bytes: cols.int(23)?,
    }))
}

pub fn parse_flows<'a>(
    output: &'a str,
    protocols: &'a Protocols,
) -> impl Iterator<Item = Result<FlowRecord>> + 'a {
    output.lines().filter_map(move |line| {
        let line = line.trim();
        match parse_flow_line(line, protocols) {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                if !line.is_empty() {
                    debug!(line, "skipping non-flow line");
                }
                None
            }
            Err(err) => Some(Err(err)),
        }
    })
}

/// Index of the statistics object column.
///
/// nfdump zero-fills the leading words of the object when it is narrower
/// than four words; a raw `0|0|0|0` anywhere in the line moves the object
/// to column 9, otherwise it sits at column 6.
pub fn stat_object_index(line: &str) -> usize {
    if line.contains(ZERO_OBJECT) {
        STAT_OBJECT_PADDED
    } else {
        STAT_OBJECT_PLAIN
    }
}

fn stat_object(raw: &str, kind: StatKind) -> StatValue {
    if kind.is_address() {
        if let Ok(ip) = raw.parse::<IpAddr>() {
            return StatValue::Addr(ip);
        }
        if let Ok(value) = raw.parse::<u128>() {
            return StatValue::Addr(ip_from_int(value));
        }
    }
    match raw.parse::<u64>() {
        Ok(n) => StatValue::Number(n),
        Err(_) => StatValue::Text(raw.to_string()),
    }
}

/// Parses one statistics line. Returns `Ok(None)` for lines too short to be stats.
pub fn parse_stat_line(
    line: &str,
    kind: StatKind,
    protocols: &Protocols,
) -> Result<Option<StatRecord>> {
    let cols = Columns::new(line);
    if cols.len() < STAT_MIN_COLUMNS {
        return Ok(None);
    }

    let idx = stat_object_index(line);
    let proto: u8 = cols.int(5)?;
    Ok(Some(StatRecord {
        af: cols.int(0)?,
        first: cols.timestamp(1, 2)?,
        last: cols.timestamp(3, 4)?,
        proto,
        prot: protocols.name(proto).map(str::to_string),
        kind,
        object: stat_object(cols.raw(idx)?, kind),
        flows: cols.int(idx + 1)?,
        packets: cols.int(idx + 2)?,
        bytes: cols.int(idx + 3)?,
        pps: cols.int(idx + 4)?,
        bps: cols.int(idx + 5)?,
        bpp: cols.int(idx + 6)?,
    }))
}

pub fn parse_stats<'a>(
    output: &'a str,
    kind: StatKind,
    protocols: &'a Protocols,
) -> impl Iterator<Item = Result<StatRecord>> + 'a {
    output.lines().filter_map(move |line| {
        let line = line.trim();
        match parse_stat_line(line, kind, protocols) {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                if !line.is_empty() {
                    debug!(line, "skipping non-statistics line");
                }
                None
            }
            Err(err) => Some(Err(err)),
        }
    })
}

/// Parses the `Key: value` block printed by `nfdump -I`.
pub fn parse_summary(output: &str) -> Result<FlowSummary> {
    let mut summary = FlowSummary::default();
    let mut first_secs = None;
    let mut last_secs = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase().replace(' ', "_");
        let value = value.trim();
        let num = || {
            value
                .parse::<u64>()
                .map_err(|_| parse_err(line.trim(), format!("`{key}` is not an integer")))
        };

        match key.as_str() {
            "ident" => summary.ident = Some(value.to_string()),
            "flows" => summary.flows = num()?,
            "flows_tcp" => summary.flows_tcp = num()?,
            "flows_udp" => summary.flows_udp = num()?,
            "flows_icmp" => summary.flows_icmp = num()?,
            "flows_other" => summary.flows_other = num()?,
            "packets" => summary.packets = num()?,
            "packets_tcp" => summary.packets_tcp = num()?,
            "packets_udp" => summary.packets_udp = num()?,
            "packets_icmp" => summary.packets_icmp = num()?,
            "packets_other" => summary.packets_other = num()?,
            "bytes" => summary.bytes = num()?,
            "bytes_tcp" => summary.bytes_tcp = num()?,
            "bytes_udp" => summary.bytes_udp = num()?,
            "bytes_icmp" => summary.bytes_icmp = num()?,
            "bytes_other" => summary.bytes_other = num()?,
            "first" => first_secs = Some(num()?),
            "last" => last_secs = Some(num()?),
            "msec_first" => summary.msec_first = num()?,
            "msec_last" => summary.msec_last = num()?,
            "sequence_failures" => summary.sequence_failures = num()?,
            _ => {
                summary.extra.insert(key.clone(), value.to_string());
            }
        }
    }

    summary.first = first_secs.and_then(|s| epoch_millis(s, summary.msec_first));
    summary.last = last_secs.and_then(|s| epoch_millis(s, summary.msec_last));
    Ok(summary)
}

fn epoch_millis(secs: u64, msec: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(secs).ok()?.checked_mul(1000)?.checked_add(i64::try_from(msec).ok()?)?;
    Utc.timestamp_millis_opt(millis).single()
}
