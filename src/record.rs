use crate::command::StatKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

pub const AF_INET: u32 = 2;
pub const AF_INET6: u32 = 10;

/// One flow as printed by `nfdump -o pipe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    pub af: u32,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub proto: u8,
    /// Protocol name, when the number is known.
    pub prot: Option<String>,
    pub src_ip: IpAddr,
    pub src_port: u16,
    pub dst_ip: IpAddr,
    pub dst_port: u16,
    pub src_as: u32,
    pub dst_as: u32,
    pub input: u32,
    pub output: u32,
    pub flags: u8,
    pub tos: u8,
    pub packets: u64,
    pub bytes: u64,
}

impl FlowRecord {
    pub fn protocol_label(&self) -> String {
        self.prot
            .clone()
            .unwrap_or_else(|| self.proto.to_string())
    }
}

fn endpoint(ip: &IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{v4}:{port}"),
        IpAddr::V6(v6) => format!("[{v6}]:{port}"),
    }
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{} -> {}\t{}\t{}",
            self.first.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.last.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.protocol_label(),
            endpoint(&self.src_ip, self.src_port),
            endpoint(&self.dst_ip, self.dst_port),
            self.packets,
            self.bytes,
        )
    }
}

/// Value of the statistics object column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Addr(IpAddr),
    Number(u64),
    Text(String),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Addr(ip) => write!(f, "{ip}"),
            StatValue::Number(n) => write!(f, "{n}"),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

/// One top-N line as printed by `nfdump -o pipe -s <kind>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRecord {
    pub af: u32,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub proto: u8,
    pub prot: Option<String>,
    pub kind: StatKind,
    pub object: StatValue,
    pub flows: u64,
    pub packets: u64,
    pub bytes: u64,
    pub pps: u64,
    pub bps: u64,
    pub bpp: u64,
}

impl fmt::Display for StatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}\tflows={}\tpackets={}\tbytes={}\tpps={}\tbps={}\tbpp={}",
            self.kind,
            self.object,
            self.flows,
            self.packets,
            self.bytes,
            self.pps,
            self.bps,
            self.bpp,
        )
    }
}

/// Output of `nfdump -I`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowSummary {
    pub ident: Option<String>,
    pub flows: u64,
    pub flows_tcp: u64,
    pub flows_udp: u64,
    pub flows_icmp: u64,
    pub flows_other: u64,
    pub packets: u64,
    pub packets_tcp: u64,
    pub packets_udp: u64,
    pub packets_icmp: u64,
    pub packets_other: u64,
    pub bytes: u64,
    pub bytes_tcp: u64,
    pub bytes_udp: u64,
    pub bytes_icmp: u64,
    pub bytes_other: u64,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub msec_first: u64,
    pub msec_last: u64,
    pub sequence_failures: u64,
    /// Keys this version does not know about, verbatim.
    pub extra: BTreeMap<String, String>,
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ident) = &self.ident {
            writeln!(f, "ident: {ident}")?;
        }
        writeln!(
            f,
            "flows: {} (tcp {}, udp {}, icmp {}, other {})",
            self.flows, self.flows_tcp, self.flows_udp, self.flows_icmp, self.flows_other
        )?;
        writeln!(
            f,
            "packets: {} (tcp {}, udp {}, icmp {}, other {})",
            self.packets, self.packets_tcp, self.packets_udp, self.packets_icmp, self.packets_other
        )?;
        write!(
            f,
            "bytes: {} (tcp {}, udp {}, icmp {}, other {})",
            self.bytes, self.bytes_tcp, self.bytes_udp, self.bytes_icmp, self.bytes_other
        )?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            write!(f, "\nspan: {first} - {last}")?;
        }
        Ok(())
    }
}

/// Either shape a search can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    Flows(Vec<FlowRecord>),
    Stats(Vec<StatRecord>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            SearchResults::Flows(rows) => rows.len(),
            SearchResults::Stats(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
