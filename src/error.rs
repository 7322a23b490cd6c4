use thiserror::Error;

/// Errors raised while building, running or parsing an nfdump query.
#[derive(Debug, Error)]
pub enum NfdumpError {
    #[error("specify only one of aggregate and statistics")]
    ConflictingModes,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unrecognised date: {0}")]
    InvalidDate(String),

    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool wrote to stderr or exited unsuccessfully.
    #[error("nfdump failed: {0}")]
    Tool(String),

    #[error("cannot parse line `{line}`: {reason}")]
    Parse { line: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = NfdumpError> = std::result::Result<T, E>;
