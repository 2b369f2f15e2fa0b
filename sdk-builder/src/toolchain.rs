//! Toolchain process execution

use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// Which toolchain step an invocation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Generate build files into the build directory
    Configure,
    /// Compile the configured build directory
    Build,
}

/// A fully resolved toolchain command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Step this command performs
    pub step: Step,
    /// Toolchain executable
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<OsString>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status of a finished toolchain process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    code: Option<i32>,
}

impl RunStatus {
    /// Status with an explicit exit code
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Status of a process killed by a signal
    #[must_use]
    pub fn terminated() -> Self {
        Self { code: None }
    }

    /// Whether the process exited with code 0
    #[must_use]
    pub fn success(self) -> bool {
        self.code == Some(0)
    }

    /// Exit code, `None` when terminated by a signal
    #[must_use]
    pub fn code(self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Executes toolchain invocations
///
/// `Err` means the process could not be started at all and aborts the run;
/// a started process that fails is reported through [`RunStatus`].
pub trait CommandRunner {
    /// Run `invocation` to completion
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the process could not be started.
    fn run(&mut self, invocation: &Invocation) -> io::Result<RunStatus>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RunStatus> {
        (**self).run(invocation)
    }
}

/// Runs invocations as child processes with inherited stdio, blocking until
/// they exit
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RunStatus> {
        Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map(RunStatus::from)
    }
}
