use crate::command::{build_search_args, build_summary_args, SearchOptions, NFDUMP};
use crate::error::Result;
use crate::parse::{parse_flows, parse_stats, parse_summary};
use crate::profile::{list_profiles, read_profile_data, ProfileData};
use crate::protocols::Protocols;
use crate::query::Window;
use crate::record::{FlowSummary, SearchResults};
use crate::runner::{Runner, SystemRunner};
use crate::ssh::{build_ssh_args, RemoteHost};
use tracing::{debug, info};

pub const DEFAULT_DATADIR: &str = "/";
pub const DEFAULT_PROFILE: &str = "live";

/// Where flow data lives and which host reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumperConfig {
    pub datadir: String,
    pub profile: String,
    pub sources: Vec<String>,
    pub remote: Option<RemoteHost>,
}

impl Default for DumperConfig {
    fn default() -> Self {
        Self {
            datadir: DEFAULT_DATADIR.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            sources: Vec::new(),
            remote: None,
        }
    }
}

/// Runs nfdump queries against an nfsen style data directory.
pub struct Dumper<R: Runner = SystemRunner> {
    config: DumperConfig,
    window: Window,
    protocols: Protocols,
    runner: R,
}

impl Dumper<SystemRunner> {
    pub fn new(config: DumperConfig) -> Self {
        Self::with_runner(config, SystemRunner, Protocols::load())
    }
}

impl<R: Runner> Dumper<R> {
    pub fn with_runner(mut config: DumperConfig, runner: R, protocols: Protocols) -> Self {
        if !config.datadir.ends_with('/') {
            config.datadir.push('/');
        }
        Self {
            config,
            window: Window::All,
            protocols,
            runner,
        }
    }

    /// Searches a single capture file with the given runner.
    pub fn search_file(
        runner: R,
        protocols: Protocols,
        path: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResults> {
        let mut dumper = Self::with_runner(DumperConfig::default(), runner, protocols);
        dumper.set_window(Window::File(path.to_string()));
        dumper.search(opts)
    }

    pub fn config(&self) -> &DumperConfig {
        &self.config
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    /// `-M` argument: `<datadir><profile>/<src1:src2..>`, when sources are set.
    pub fn source_dir(&self) -> Option<String> {
        let cfg = &self.config;
        if cfg.datadir.is_empty() || cfg.profile.is_empty() || cfg.sources.is_empty() {
            return None;
        }
        Some(format!(
            "{}{}/{}",
            cfg.datadir,
            cfg.profile,
            cfg.sources.join(":")
        ))
    }

    /// Runs nfdump locally or through ssh and returns its stdout.
    fn execute(&self, argv: Vec<String>) -> Result<String> {
        let output = match &self.config.remote {
            Some(remote) => {
                let args = build_ssh_args(remote, &argv);
                info!(host = %remote.host, command = %argv.join(" "), "running nfdump remotely");
                self.runner.run("ssh", &args)?
            }
            None => {
                info!(command = %argv.join(" "), "running nfdump");
                self.runner.run(NFDUMP, &argv[1..])?
            }
        };
        output.into_stdout()
    }

    pub fn search(&self, opts: &SearchOptions) -> Result<SearchResults> {
        let argv = build_search_args(&self.window, self.source_dir().as_deref(), opts)?;
        let out = self.execute(argv)?;

        let results = match opts.statistics {
            Some(kind) => SearchResults::Stats(
                parse_stats(&out, kind, &self.protocols).collect::<Result<_>>()?,
            ),
            None => SearchResults::Flows(parse_flows(&out, &self.protocols).collect::<Result<_>>()?),
        };
        debug!(rows = results.len(), "parsed nfdump output");
        Ok(results)
    }

    /// Totals for the current window (`nfdump -I`).
    pub fn summary(&self) -> Result<FlowSummary> {
        let argv = build_summary_args(&self.window, self.source_dir().as_deref());
        let out = self.execute(argv)?;
        parse_summary(&out)
    }

    pub fn list_profiles(&self) -> Result<Vec<String>> {
        list_profiles(
            &self.runner,
            &self.config.datadir,
            self.config.remote.as_ref(),
        )
    }

    /// Reads `profile.dat` of `profile`, or of the configured profile.
    pub fn profile_data(&self, profile: Option<&str>) -> Result<ProfileData> {
        let name = profile.unwrap_or(&self.config.profile);
        read_profile_data(
            &self.runner,
            &self.config.datadir,
            name,
            self.config.remote.as_ref(),
        )
    }
}

/// Searches a single capture file on the local host.
pub fn search_file(path: &str, opts: &SearchOptions) -> Result<SearchResults> {
    Dumper::search_file(SystemRunner, Protocols::load(), path, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Aggregation, StatKind};
    use crate::error::NfdumpError;
    use crate::runner::FakeRunner;
    use crate::record::StatValue;

    const FLOW_LINE: &str =
        "2|1235500152|664|1235500152|676|6|0|0|0|1234567890|1672|0|0|0|1122112211|80|0|0|5|7|17|0|2|80\n";

    fn dumper(runner: FakeRunner, config: DumperConfig) -> Dumper<FakeRunner> {
        Dumper::with_runner(config, runner, Protocols::builtin())
    }

    fn sourced_config() -> DumperConfig {
        DumperConfig {
            datadir: "/data/nfsen/profiles-data".to_string(),
            profile: "live".to_string(),
            sources: vec!["upstream".to_string(), "peer".to_string()],
            remote: None,
        }
    }

    #[test]
    fn datadir_gets_trailing_slash() {
        let d = dumper(FakeRunner::new(""), sourced_config());
        assert_eq!(d.config().datadir, "/data/nfsen/profiles-data/");
        assert_eq!(
            d.source_dir().as_deref(),
            Some("/data/nfsen/profiles-data/live/upstream:peer")
        );
        assert_eq!(d.window(), &Window::All);
    }

    #[test]
    fn no_sources_no_source_dir() {
        let d = dumper(FakeRunner::new(""), DumperConfig::default());
        assert_eq!(d.source_dir(), None);
    }

    #[test]
    fn local_search_runs_nfdump() {
        let mut d = dumper(FakeRunner::new(FLOW_LINE), sourced_config());
        d.set_window(Window::from_dates(Some("2009-02-24 18:00"), None).unwrap());
        let results = d.search(&SearchOptions::filter("proto tcp")).unwrap();

        let SearchResults::Flows(rows) = results else {
            panic!("expected flows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].src_ip.to_string(), "73.150.2.210");

        let rec = d.runner.last();
        assert_eq!(rec.program, "nfdump");
        assert_eq!(rec.args[..4], ["-q", "-o", "pipe", "proto tcp"]);
        assert!(rec.args.iter().any(|a| a == "/data/nfsen/profiles-data/live/upstream:peer"));
        assert_eq!(rec.args.last().unwrap(), "nfcapd.200902241800");
    }

    #[test]
    fn remote_search_goes_through_ssh() {
        let mut config = sourced_config();
        config.remote = Some(RemoteHost::new("collector"));
        let d = dumper(FakeRunner::new(FLOW_LINE), config);
        let opts = SearchOptions {
            filter: "src host 10.0.0.1".to_string(),
            aggregate: Some(Aggregation::fields("srcip,dstip")),
            ..SearchOptions::default()
        };
        d.search(&opts).unwrap();

        let rec = d.runner.last();
        assert_eq!(rec.program, "ssh");
        let remote_cmd = rec.args.last().unwrap();
        assert!(remote_cmd.starts_with("nfdump -q -o pipe 'src host 10.0.0.1'"));
        assert!(remote_cmd.ends_with("-a -A srcip,dstip"));
    }

    #[test]
    fn statistics_search() {
        let out = "2|1235500152|0|1235500200|0|0|0|0|0|1234567890|12|340|56000|3|1200|164\n";
        let d = dumper(FakeRunner::new(out), DumperConfig::default());
        let opts = SearchOptions {
            statistics: Some(StatKind::DstIp),
            limit: Some(10),
            ..SearchOptions::default()
        };
        let SearchResults::Stats(rows) = d.search(&opts).unwrap() else {
            panic!("expected stats");
        };
        assert_eq!(rows[0].kind, StatKind::DstIp);
        assert_eq!(rows[0].object, StatValue::Addr("73.150.2.210".parse().unwrap()));
        assert!(d.runner.last().args.ends_with(&["-n".to_string(), "10".to_string()]));
    }

    #[test]
    fn stderr_becomes_error() {
        let mut d = dumper(
            FakeRunner::failing("Error open file: No such file or directory"),
            DumperConfig::default(),
        );
        d.set_window(Window::File("this file isn't here".to_string()));
        let err = d.search(&SearchOptions::default()).unwrap_err();
        assert!(matches!(err, NfdumpError::Tool(_)));
    }

    #[test]
    fn search_file_reads_one_file() {
        let results = Dumper::search_file(
            FakeRunner::new(FLOW_LINE),
            Protocols::builtin(),
            "/var/cache/nfdump/nfcapd.200902241805",
            &SearchOptions::filter("proto tcp"),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn search_file_passes_path_and_reports_missing_file() {
        let runner = FakeRunner::failing("Error open file: No such file or directory");
        let err = Dumper::search_file(
            &runner,
            Protocols::builtin(),
            "this file isn't here",
            &SearchOptions::default(),
        )
        .unwrap_err();
        match err {
            NfdumpError::Tool(msg) => assert!(msg.contains("No such file")),
            other => panic!("unexpected {other:?}"),
        }

        let rec = runner.last();
        assert_eq!(rec.program, "nfdump");
        assert!(rec
            .args
            .ends_with(&["-r".to_string(), "this file isn't here".to_string()]));
    }

    #[test]
    fn search_file_rejects_conflicting_modes() {
        let opts = SearchOptions {
            aggregate: Some(Aggregation::fields("bar")),
            statistics: Some(StatKind::SrcIp),
            ..SearchOptions::default()
        };
        let err = Dumper::search_file(FakeRunner::new(""), Protocols::builtin(), "", &opts)
            .unwrap_err();
        assert!(matches!(err, NfdumpError::ConflictingModes));
    }

    #[test]
    fn conflicting_modes_never_run() {
        let d = dumper(FakeRunner::new(""), DumperConfig::default());
        let opts = SearchOptions {
            aggregate: Some(Aggregation::fields("bar")),
            statistics: Some(StatKind::Ip),
            ..SearchOptions::default()
        };
        assert!(matches!(d.search(&opts), Err(NfdumpError::ConflictingModes)));
        assert!(d.runner.last().program.is_empty());
    }

    #[test]
    fn summary_runs_info_mode() {
        let mut d = dumper(FakeRunner::new("Ident: podium\nFlows: 7\n"), DumperConfig::default());
        d.set_window(Window::Stdin);
        let s = d.summary().unwrap();
        assert_eq!(s.flows, 7);
        assert_eq!(d.runner.last().args, vec!["-I", "-r", "-"]);
    }
}
