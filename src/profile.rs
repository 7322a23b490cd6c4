use crate::error::{NfdumpError, Result};
use crate::runner::Runner;
use crate::ssh::{build_ssh_args, RemoteHost};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const PROFILE_FILE: &str = "profile.dat";

/// A single `key = value` entry of an nfsen profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Int(i64),
    Text(String),
}

impl ProfileValue {
    fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => ProfileValue::Int(n),
            Err(_) => ProfileValue::Text(raw.to_string()),
        }
    }
}

/// Parsed contents of `profile.dat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileData {
    pub values: BTreeMap<String, ProfileValue>,
    /// Channel names, in file order.
    pub sourcelist: Vec<String>,
}

impl ProfileData {
    pub fn get(&self, key: &str) -> Option<&ProfileValue> {
        self.values.get(key)
    }
}

pub fn parse_profile_data(content: &str) -> ProfileData {
    let mut data = ProfileData::default();
    for line in content.lines() {
        if line.is_empty() || line.starts_with([' ', '#']) {
            continue;
        }
        let Some((key, val)) = line.split_once(" = ") else {
            warn!(line, "ignoring malformed profile line");
            continue;
        };
        if key == "channel" {
            let chan = val.split(':').next().unwrap_or(val);
            data.sourcelist.push(chan.to_string());
            continue;
        }
        data.values.insert(key.to_string(), ProfileValue::from_raw(val));
    }
    data
}

/// Runs a helper command on the remote host and returns its stdout.
fn remote_stdout(runner: &impl Runner, remote: &RemoteHost, argv: &[&str]) -> Result<String> {
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    let args = build_ssh_args(remote, &argv);
    runner.run("ssh", &args)?.into_stdout()
}

/// Lists the profile directories below `datadir`.
pub fn list_profiles(
    runner: &impl Runner,
    datadir: &str,
    remote: Option<&RemoteHost>,
) -> Result<Vec<String>> {
    let mut names: Vec<String> = match remote {
        Some(remote) => remote_stdout(runner, remote, &["/bin/ls", datadir])?
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        None => fs::read_dir(datadir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
    };
    names.sort();
    Ok(names)
}

/// Profile names are single directory entries below the data directory.
fn check_profile_name(profile: &str) -> Result<()> {
    if profile.is_empty() || profile == "." || profile == ".." || profile.contains('/') {
        return Err(NfdumpError::InvalidArgument(format!(
            "invalid profile name `{profile}`"
        )));
    }
    Ok(())
}

pub fn read_profile_data(
    runner: &impl Runner,
    datadir: &str,
    profile: &str,
    remote: Option<&RemoteHost>,
) -> Result<ProfileData> {
    check_profile_name(profile)?;
    let path = Path::new(datadir).join(profile).join(PROFILE_FILE);
    let path = path.to_string_lossy();
    let content = match remote {
        Some(remote) => remote_stdout(runner, remote, &["/bin/cat", &*path])?,
        None => fs::read_to_string(&*path)?,
    };
    Ok(parse_profile_data(&content))
}
