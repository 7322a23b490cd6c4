use crate::error::{NfdumpError, Result};
use chrono::{NaiveDate, NaiveDateTime};

const FILE_FMT: &str = "%Y%m%d%H%M";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    FILE_FMT,
];

/// Which flow data nfdump should read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Window {
    /// Every file in the source directories.
    #[default]
    All,
    Range {
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    },
    Directory(String),
    File(String),
    Stdin,
}

impl Window {
    /// Builds a window from optional start/end strings.
    pub fn from_dates(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let Some(start) = start else {
            return Ok(Window::All);
        };
        let start = parse_datetime(start)?;
        let end = end.map(parse_datetime).transpose()?;
        Ok(Window::Range { start, end })
    }

    /// Value passed to `-r`, if the window names a single input.
    pub fn read_target(&self) -> Option<&str> {
        match self {
            Window::File(path) => Some(path),
            Window::Stdin => Some("-"),
            _ => None,
        }
    }

    /// Value passed to `-R` when reading from the source directories.
    pub fn range_arg(&self) -> String {
        match self {
            Window::Range { start, end } => {
                let mut arg = file_name_for(start);
                if let Some(end) = end {
                    arg.push(':');
                    arg.push_str(&file_name_for(end));
                }
                arg
            }
            Window::Directory(dir) => dir.clone(),
            Window::All | Window::File(_) | Window::Stdin => ".".to_string(),
        }
    }
}

pub fn file_name_for(date: &NaiveDateTime) -> String {
    format!("nfcapd.{}", date.format(FILE_FMT))
}

pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| NfdumpError::InvalidDate(input.to_string()))
}

/// Splits a comma separated list of field names, dropping blanks and spaces.
pub fn split_fields(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|f| f.replace(' ', ""))
        .filter(|f| !f.is_empty())
        .collect()
}
