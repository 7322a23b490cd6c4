use crate::error::{NfdumpError, Result};
use crate::query::{split_fields, Window};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const NFDUMP: &str = "nfdump";

/// Object nfdump computes top-N statistics for (`-s`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    SrcIp,
    DstIp,
    Ip,
    SrcPort,
    DstPort,
    Port,
    SrcAs,
    DstAs,
    As,
    InIf,
    OutIf,
    Proto,
}

impl StatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatKind::SrcIp => "srcip",
            StatKind::DstIp => "dstip",
            StatKind::Ip => "ip",
            StatKind::SrcPort => "srcport",
            StatKind::DstPort => "dstport",
            StatKind::Port => "port",
            StatKind::SrcAs => "srcas",
            StatKind::DstAs => "dstas",
            StatKind::As => "as",
            StatKind::InIf => "inif",
            StatKind::OutIf => "outif",
            StatKind::Proto => "proto",
        }
    }

    /// Whether the object column holds an address.
    pub fn is_address(self) -> bool {
        self.as_str().contains("ip")
    }
}

impl FromStr for StatKind {
    type Err = NfdumpError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "srcip" => StatKind::SrcIp,
            "dstip" => StatKind::DstIp,
            "ip" => StatKind::Ip,
            "srcport" => StatKind::SrcPort,
            "dstport" => StatKind::DstPort,
            "port" => StatKind::Port,
            "srcas" => StatKind::SrcAs,
            "dstas" => StatKind::DstAs,
            "as" => StatKind::As,
            "inif" => StatKind::InIf,
            "outif" => StatKind::OutIf,
            "proto" => StatKind::Proto,
            other => {
                return Err(NfdumpError::InvalidArgument(format!(
                    "unknown statistic `{other}`"
                )))
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering applied to statistics output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatOrder {
    Packets,
    Bytes,
    Flows,
    Bps,
    Pps,
    Bpp,
}

impl StatOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            StatOrder::Packets => "packets",
            StatOrder::Bytes => "bytes",
            StatOrder::Flows => "flows",
            StatOrder::Bps => "bps",
            StatOrder::Pps => "pps",
            StatOrder::Bpp => "bpp",
        }
    }
}

impl FromStr for StatOrder {
    type Err = NfdumpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "packets" => Ok(StatOrder::Packets),
            "bytes" => Ok(StatOrder::Bytes),
            "flows" => Ok(StatOrder::Flows),
            "bps" => Ok(StatOrder::Bps),
            "pps" => Ok(StatOrder::Pps),
            "bpp" => Ok(StatOrder::Bpp),
            other => Err(NfdumpError::InvalidArgument(format!(
                "unknown statistics order `{other}`"
            ))),
        }
    }
}

impl fmt::Display for StatOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// nfdump's default five-tuple aggregation (`-a`).
    Default,
    /// Aggregate on the named fields (`-a -A f1,f2`).
    Fields(Vec<String>),
}

impl Aggregation {
    pub fn fields(input: &str) -> Self {
        Aggregation::Fields(split_fields(input))
    }
}

impl From<Vec<String>> for Aggregation {
    fn from(fields: Vec<String>) -> Self {
        Aggregation::Fields(
            fields
                .iter()
                .flat_map(|f| split_fields(f))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub filter: String,
    pub aggregate: Option<Aggregation>,
    pub statistics: Option<StatKind>,
    pub order: Option<StatOrder>,
    pub limit: Option<u64>,
}

impl SearchOptions {
    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }
}

/// Source selection shared by every nfdump invocation.
/// `source_dir` is the `-M` argument, present only when sources are configured.
fn push_source_args(args: &mut Vec<String>, window: &Window, source_dir: Option<&str>) {
    if let Some(target) = window.read_target() {
        args.push("-r".to_string());
        args.push(target.to_string());
        return;
    }

    if let Some(dir) = source_dir {
        args.push("-M".to_string());
        args.push(dir.to_string());
    }
    args.push("-R".to_string());
    args.push(window.range_arg());
}

pub fn build_search_args(
    window: &Window,
    source_dir: Option<&str>,
    opts: &SearchOptions,
) -> Result<Vec<String>> {
    // 两种输出模式互斥，在执行前就拒绝。
    if opts.aggregate.is_some() && opts.statistics.is_some() {
        return Err(NfdumpError::ConflictingModes);
    }

    let mut args: Vec<String> = vec![
        NFDUMP.to_string(),
        "-q".to_string(),
        "-o".to_string(),
        "pipe".to_string(),
    ];
    if !opts.filter.trim().is_empty() {
        args.push(opts.filter.clone());
    }

    push_source_args(&mut args, window, source_dir);

    if let Some(kind) = opts.statistics {
        let s_arg = match opts.order {
            Some(order) => format!("{kind}/{order}"),
            None => kind.to_string(),
        };
        args.push("-s".to_string());
        args.push(s_arg);
    }

    match &opts.aggregate {
        Some(Aggregation::Default) => args.push("-a".to_string()),
        Some(Aggregation::Fields(fields)) if fields.is_empty() => args.push("-a".to_string()),
        Some(Aggregation::Fields(fields)) => {
            args.push("-a".to_string());
            args.push("-A".to_string());
            args.push(fields.join(","));
        }
        None => {}
    }

    // 0 表示不限制。
    if let Some(limit) = opts.limit.filter(|n| *n > 0) {
        // 统计模式用 -n 限制条目数，其余用 -c 限制记录数。
        let flag = if opts.statistics.is_some() { "-n" } else { "-c" };
        args.push(flag.to_string());
        args.push(limit.to_string());
    }

    Ok(args)
}

pub fn build_summary_args(window: &Window, source_dir: Option<&str>) -> Vec<String> {
    let mut args = vec![NFDUMP.to_string(), "-I".to_string()];
    push_source_args(&mut args, window, source_dir);
    args
}
