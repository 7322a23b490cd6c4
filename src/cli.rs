use crate::command::{StatKind, StatOrder};
use crate::output::OutputFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "nfquery", version, about = "Query NetFlow data through nfdump")]
pub struct Args {
    // nfsen 的 profiles-data 目录。
    #[arg(long, global = true, default_value = "/")]
    pub datadir: String,

    #[arg(long, global = true, default_value = "live")]
    pub profile: String,

    // 逗号分隔的数据源，决定 -M 参数。
    #[arg(long, global = true, value_delimiter = ',')]
    pub sources: Vec<String>,

    // 设置后通过 SSH 在远端执行 nfdump。
    #[arg(long, global = true)]
    pub remote_host: Option<String>,

    #[arg(long, global = true)]
    pub ssh_user: Option<String>,

    #[arg(long, global = true)]
    pub ssh_port: Option<u16>,

    #[arg(long, global = true)]
    pub jump_host: Option<String>,

    #[arg(long, global = true, default_value = "-")]
    pub output: String,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dump flows, aggregated flows or top-N statistics.
    Search(SearchArgs),
    /// Print totals for the selected window (`nfdump -I`).
    Summary(WindowArgs),
    /// List nfsen profiles below the data directory.
    Profiles,
    /// Show the profile.dat contents of a profile.
    Profile {
        /// Defaults to --profile.
        name: Option<String>,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct WindowArgs {
    #[arg(long)]
    pub start: Option<String>,

    // 只有给出 start 时 end 才生效。
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Read a single capture file.
    #[arg(long, conflicts_with_all = ["start", "dir", "stdin"])]
    pub file: Option<String>,

    /// Read every file below this directory (relative to the sources).
    #[arg(long, conflicts_with_all = ["start", "stdin"])]
    pub dir: Option<String>,

    #[arg(long)]
    pub stdin: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Aggregate flows; fields are given as `--aggregate=srcip,dstport`.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "",
        conflicts_with = "stats"
    )]
    pub aggregate: Option<String>,

    #[arg(long)]
    pub stats: Option<StatKind>,

    #[arg(long, requires = "stats")]
    pub order: Option<StatOrder>,

    #[arg(long)]
    pub limit: Option<u64>,

    /// nfdump filter expression; words are joined with spaces.
    pub filter: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search() {
        let args = Args::try_parse_from([
            "nfquery",
            "--sources",
            "upstream,peer",
            "search",
            "--start",
            "2009-02-24 18:00",
            "--stats",
            "srcip",
            "--order",
            "bytes",
            "--limit",
            "10",
            "proto",
            "tcp",
        ])
        .unwrap();
        assert_eq!(args.sources, vec!["upstream", "peer"]);
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.stats, Some(StatKind::SrcIp));
        assert_eq!(search.order, Some(StatOrder::Bytes));
        assert_eq!(search.filter, vec!["proto", "tcp"]);
        assert_eq!(search.window.start.as_deref(), Some("2009-02-24 18:00"));
    }

    #[test]
    fn bare_aggregate_flag() {
        let args = Args::try_parse_from(["nfquery", "search", "--aggregate"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.aggregate.as_deref(), Some(""));
    }

    #[test]
    fn bare_aggregate_keeps_filter_words() {
        let args =
            Args::try_parse_from(["nfquery", "search", "--aggregate", "proto", "tcp"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.aggregate.as_deref(), Some(""));
        assert_eq!(search.filter, vec!["proto", "tcp"]);
    }

    #[test]
    fn aggregate_fields_need_equals() {
        let args = Args::try_parse_from([
            "nfquery",
            "search",
            "--aggregate=srcip,dstport",
            "port",
            "53",
        ])
        .unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.aggregate.as_deref(), Some("srcip,dstport"));
        assert_eq!(search.filter, vec!["port", "53"]);
    }

    #[test]
    fn aggregate_conflicts_with_stats() {
        let res = Args::try_parse_from([
            "nfquery",
            "search",
            "--aggregate=srcip",
            "--stats",
            "ip",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn unknown_stat_rejected() {
        assert!(Args::try_parse_from(["nfquery", "search", "--stats", "foo"]).is_err());
    }
}
