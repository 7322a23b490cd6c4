use crate::error::{NfdumpError, Result};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// Captured result of one external command.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
}

impl Output {
    /// Converts tool diagnostics into an error.
    /// Any stderr output counts as failure, even with a zero exit status.
    /// Returns: Result<String> with stdout on success.
    pub fn into_stdout(self) -> Result<String> {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return Err(NfdumpError::Tool(stderr.to_string()));
        }
        if !self.success {
            let reason = match self.status {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(NfdumpError::Tool(reason));
        }
        Ok(self.stdout)
    }
}

/// Executes external commands for nfdump queries.
pub trait Runner {
    /// Runs a command and returns its captured output.
    /// Parameters: `program` (&str) executable name.
    /// Parameters: `args` (&[String]) argument list.
    /// Returns: Result<Output> or a spawn error.
    // Abstract external command execution for testability.
    fn run(&self, program: &str, args: &[String]) -> Result<Output>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        (**self).run(program, args)
    }
}

/// Runner implementation that invokes system binaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| NfdumpError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(Output {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            status: output.status.code(),
        })
    }
}

#[derive(Debug, Default)]
/// Test runner that returns canned output and records calls.
pub struct FakeRunner {
    pub output: Output,
    pub last_command: Mutex<CommandRecord>,
}

#[derive(Debug, Default, Clone)]
/// Records the last command executed by a runner.
pub struct CommandRecord {
    pub program: String,
    pub args: Vec<String>,
}

impl FakeRunner {
    /// Creates a FakeRunner that succeeds with the provided stdout.
    pub fn new(stdout: &str) -> Self {
        Self {
            output: Output {
                stdout: stdout.to_string(),
                stderr: String::new(),
                success: true,
                status: Some(0),
            },
            last_command: Mutex::new(CommandRecord::default()),
        }
    }

    /// Creates a FakeRunner that fails with the provided stderr.
    pub fn failing(stderr: &str) -> Self {
        Self {
            output: Output {
                stdout: String::new(),
                stderr: stderr.to_string(),
                success: false,
                status: Some(255),
            },
            last_command: Mutex::new(CommandRecord::default()),
        }
    }

    pub fn last(&self) -> CommandRecord {
        self.last_command
            .lock()
            .map(|rec| rec.clone())
            .unwrap_or_default()
    }
}

impl Runner for FakeRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        // Record calls so tests don't need nfdump installed.
        if let Ok(mut rec) = self.last_command.lock() {
            rec.program = program.to_string();
            rec.args = args.to_vec();
        }
        Ok(self.output.clone())
    }
}
