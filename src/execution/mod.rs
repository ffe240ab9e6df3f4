//! Execution engine: result record and the script runner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{errors::RunError, process::ProcessOutput};

pub mod format;
pub mod python;

/// Two-valued status, serialised as the legacy integers `0`/`1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    Failure = 0,
    Success = 1,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl From<Status> for u8 {
    fn from(s: Status) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Status::Failure),
            1 => Ok(Status::Success),
            other => Err(format!("invalid status code {}, expected 0 or 1", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: Status,
    pub output: String,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            output: output.into(),
        }
    }
}

impl From<Result<String, RunError>> for ExecutionResult {
    fn from(res: Result<String, RunError>) -> Self {
        match res {
            Ok(stdout) => ExecutionResult::success(stdout),
            Err(e) => ExecutionResult::failure(e.output()),
        }
    }
}

/// Exit 0 yields stdout; anything else (signals included) is an execution error
/// carrying stderr.
pub fn classify(out: ProcessOutput) -> Result<String, RunError> {
    if out.success() {
        Ok(out.stdout)
    } else {
        Err(RunError::Execution { stderr: out.stderr })
    }
}
