//! Error types for each stage of a run.
//!
//! Every layer returns its own enum so callers can tell an install failure from a
//! script that crashed. At the public boundary all of them collapse into the
//! `{status, output}` record via [`RunError::output`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("executable not found: {0}")]
    NotFound(String),
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {secs} seconds")]
    TimedOut { program: String, secs: u64 },
    #[error("I/O error while talking to subprocess: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Failed to install library '{library}':\n{add_stderr} | {pip_stderr}")]
    Failed {
        library: String,
        add_stderr: String,
        pip_stderr: String,
    },
    #[error("Failed to probe library '{library}': {source}")]
    Probe {
        library: String,
        #[source]
        source: ProcessError,
    },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to create script file at {}", .0.display())]
    ScriptMissing(PathBuf),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error("Execution error:\n{stderr}")]
    Execution { stderr: String },
    #[error("Execution timed out after {secs} seconds")]
    TimedOut { secs: u64 },
    #[error("Error during code execution:\n{0}")]
    Unexpected(String),
}

impl RunError {
    /// Text placed in `ExecutionResult.output` for this failure.
    ///
    /// A failed script reports its stderr untouched; everything else reports the
    /// rendered message.
    pub fn output(&self) -> String {
        match self {
            RunError::Execution { stderr } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ProcessError> for RunError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::TimedOut { secs, .. } => RunError::TimedOut { secs },
            other => RunError::Unexpected(format_chain(&other)),
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Unexpected(format_chain(&err))
    }
}

/// Render an error with its full `source()` chain, one cause per line.
pub fn format_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        text.push_str(&format!("\nCaused by: {}", c));
        cause = c.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_output_is_raw_stderr() {
        let err = RunError::Execution {
            stderr: "Traceback...\nZeroDivisionError".into(),
        };
        assert_eq!(err.output(), "Traceback...\nZeroDivisionError");
    }

    #[test]
    fn test_install_output_carries_both_stderrs() {
        let err = RunError::from(InstallError::Failed {
            library: "nope".into(),
            add_stderr: "add said no".into(),
            pip_stderr: "pip said no".into(),
        });
        let out = err.output();
        assert!(out.contains("nope"));
        assert!(out.contains("add said no | pip said no"));
    }

    #[test]
    fn test_process_timeout_maps_to_run_timeout() {
        let err: RunError = ProcessError::TimedOut {
            program: "uv".into(),
            secs: 3,
        }
        .into();
        assert_eq!(err.output(), "Execution timed out after 3 seconds");
    }

    #[test]
    fn test_format_chain_includes_sources() {
        let err = ProcessError::Launch {
            program: "uv".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let text = format_chain(&err);
        assert!(text.starts_with("failed to launch 'uv'"));
        assert!(text.contains("Caused by: denied"));
    }
}
