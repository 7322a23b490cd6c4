use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const PROTOCOLS_PATH: &str = "/etc/protocols";

const BUILTIN: &[(u8, &str)] = &[
    (1, "icmp"),
    (2, "igmp"),
    (4, "ipencap"),
    (6, "tcp"),
    (17, "udp"),
    (41, "ipv6"),
    (47, "gre"),
    (50, "esp"),
    (51, "ah"),
    (58, "ipv6-icmp"),
    (89, "ospf"),
    (103, "pim"),
    (112, "vrrp"),
    (132, "sctp"),
];

/// Maps IP protocol numbers to their names.
#[derive(Debug, Clone)]
pub struct Protocols {
    names: HashMap<u8, String>,
}

impl Protocols {
    /// Loads the system protocol table, falling back to a built-in subset.
    pub fn load() -> Self {
        Self::load_from(PROTOCOLS_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                let protocols = Self::parse(&content);
                debug!(path = %path.display(), entries = protocols.names.len(), "loaded protocol table");
                protocols
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot read protocol table, using built-in names");
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        let mut names: HashMap<u8, String> = BUILTIN
            .iter()
            .map(|(num, name)| (*num, name.to_string()))
            .collect();
        names.insert(0, "ip".to_string());
        Self { names }
    }

    /// Parses `/etc/protocols` style content: `name number [aliases] [# comment]`.
    pub fn parse(content: &str) -> Self {
        let mut names = HashMap::new();
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("");
            let mut cols = line.split_whitespace();
            let (Some(name), Some(num)) = (cols.next(), cols.next()) else {
                continue;
            };
            if let Ok(num) = num.parse::<u8>() {
                names.entry(num).or_insert_with(|| name.to_string());
            }
        }
        // nfdump reports 0 for flows aggregated across protocols.
        names.insert(0, "ip".to_string());
        Self { names }
    }

    pub fn name(&self, number: u8) -> Option<&str> {
        self.names.get(&number).map(String::as_str)
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self::builtin()
    }
}
