pub mod cli;
pub mod command;
pub mod dumper;
pub mod error;
pub mod output;
pub mod parse;
pub mod profile;
pub mod protocols;
pub mod query;
pub mod record;
pub mod runner;
pub mod ssh;

pub use command::{Aggregation, SearchOptions, StatKind, StatOrder};
pub use dumper::{search_file, Dumper, DumperConfig};
pub use error::NfdumpError;
pub use query::Window;
pub use record::{FlowRecord, FlowSummary, SearchResults, StatRecord, StatValue};
pub use ssh::RemoteHost;

use anyhow::{Context, Result};
use cli::{Args, Command, SearchArgs, WindowArgs};
use output::write_output;
use runner::Runner;
use tracing::info;

pub fn run(args: Args) -> Result<()> {
    // 一次查询执行的主编排流程。
    let mut dumper = Dumper::new(config_from_args(&args));
    execute(&mut dumper, &args)
}

fn execute<R: Runner>(dumper: &mut Dumper<R>, args: &Args) -> Result<()> {
    match &args.command {
        Command::Search(search) => {
            dumper.set_window(window_from_args(&search.window)?);
            let opts = search_options(search);
            let results = dumper.search(&opts).context("search failed")?;
            info!(rows = results.len(), "search finished");
            match results {
                SearchResults::Flows(rows) => write_output(&rows, args.format, &args.output),
                SearchResults::Stats(rows) => write_output(&rows, args.format, &args.output),
            }
        }
        Command::Summary(window) => {
            dumper.set_window(window_from_args(window)?);
            let summary = dumper.summary().context("summary failed")?;
            write_output(&[summary], args.format, &args.output)
        }
        Command::Profiles => {
            let names = dumper.list_profiles().context("failed to list profiles")?;
            write_output(&names, args.format, &args.output)
        }
        Command::Profile { name } => {
            let data = dumper
                .profile_data(name.as_deref())
                .context("failed to read profile data")?;
            let json = serde_json::to_string_pretty(&data)?;
            // profile.dat 只有 JSON 一种展示形式。
            write_output(&[json], output::OutputFormat::Text, &args.output)
        }
    }
}

fn config_from_args(args: &Args) -> DumperConfig {
    let remote = args.remote_host.as_ref().map(|host| RemoteHost {
        host: host.clone(),
        user: args.ssh_user.clone(),
        port: args.ssh_port,
        jump_host: args.jump_host.clone(),
    });

    DumperConfig {
        datadir: args.datadir.clone(),
        profile: args.profile.clone(),
        sources: args.sources.clone(),
        remote,
    }
}

fn window_from_args(args: &WindowArgs) -> Result<Window> {
    // 优先级：单文件、stdin、目录，最后是时间范围。
    if let Some(file) = &args.file {
        return Ok(Window::File(file.clone()));
    }
    if args.stdin {
        return Ok(Window::Stdin);
    }
    if let Some(dir) = &args.dir {
        return Ok(Window::Directory(dir.clone()));
    }
    Window::from_dates(args.start.as_deref(), args.end.as_deref())
        .context("invalid time window")
}

fn search_options(args: &SearchArgs) -> SearchOptions {
    let aggregate = args.aggregate.as_deref().map(|fields| {
        if fields.trim().is_empty() {
            Aggregation::Default
        } else {
            Aggregation::fields(fields)
        }
    });

    SearchOptions {
        filter: args.filter.join(" "),
        aggregate,
        statistics: args.stats,
        order: args.order,
        limit: args.limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::Protocols;
    use crate::runner::FakeRunner;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_carries_remote() {
        let args = parse(&[
            "nfquery",
            "--remote-host",
            "collector",
            "--ssh-user",
            "flow",
            "--ssh-port",
            "2222",
            "profiles",
        ]);
        let cfg = config_from_args(&args);
        let remote = cfg.remote.unwrap();
        assert_eq!(remote.host, "collector");
        assert_eq!(remote.user.as_deref(), Some("flow"));
        assert_eq!(remote.port, Some(2222));
        assert_eq!(cfg.profile, "live");
    }

    #[test]
    fn window_precedence() {
        let w = WindowArgs {
            file: Some("a.nf".to_string()),
            stdin: true,
            ..WindowArgs::default()
        };
        assert_eq!(window_from_args(&w).unwrap(), Window::File("a.nf".to_string()));

        let w = WindowArgs {
            start: Some("2009-02-24 18:00".to_string()),
            end: Some("2009-02-24 19:00".to_string()),
            ..WindowArgs::default()
        };
        assert_eq!(
            window_from_args(&w).unwrap().range_arg(),
            "nfcapd.200902241800:nfcapd.200902241900"
        );

        let w = WindowArgs {
            start: Some("soon".to_string()),
            ..WindowArgs::default()
        };
        assert!(window_from_args(&w).is_err());
    }

    #[test]
    fn aggregate_flag_mapping() {
        let args = parse(&["nfquery", "search", "--aggregate", "--limit", "5"]);
        let Command::Search(search) = &args.command else {
            panic!("expected search");
        };
        let opts = search_options(search);
        assert_eq!(opts.aggregate, Some(Aggregation::Default));
        assert_eq!(opts.limit, Some(5));

        let args = parse(&["nfquery", "search", "--aggregate=srcip,dstport", "port", "53"]);
        let Command::Search(search) = &args.command else {
            panic!("expected search");
        };
        let opts = search_options(search);
        assert_eq!(opts.aggregate, Some(Aggregation::fields("srcip,dstport")));
        assert_eq!(opts.filter, "port 53");

        let args = parse(&["nfquery", "search", "--aggregate", "proto", "tcp"]);
        let Command::Search(search) = &args.command else {
            panic!("expected search");
        };
        let opts = search_options(search);
        assert_eq!(opts.aggregate, Some(Aggregation::Default));
        assert_eq!(opts.filter, "proto tcp");
    }

    #[test]
    fn execute_search_writes_output() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_string_lossy().to_string();
        let args = parse(&[
            "nfquery",
            "--output",
            &path,
            "--format",
            "json",
            "search",
            "--file",
            "nfcapd.200902241805",
        ]);
        let runner = FakeRunner::new(
            "2|1235500152|664|1235500152|676|6|0|0|0|1234567890|1672|0|0|0|1122112211|80|0|0|5|7|17|0|2|80\n",
        );
        let mut dumper =
            Dumper::with_runner(config_from_args(&args), runner, Protocols::builtin());
        execute(&mut dumper, &args).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["src_ip"], "73.150.2.210");
        assert_eq!(value["prot"], "tcp");
    }

    #[test]
    fn execute_reports_tool_errors() {
        let args = parse(&["nfquery", "search", "--file", "this file isn't here"]);
        let runner = FakeRunner::failing("Error open file: No such file or directory");
        let mut dumper =
            Dumper::with_runner(config_from_args(&args), runner, Protocols::builtin());
        let err = execute(&mut dumper, &args).unwrap_err();
        assert!(format!("{err:#}").contains("No such file"));
    }
}
