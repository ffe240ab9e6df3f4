//! Run a Python snippet in a subprocess after making sure the libraries it
//! declares are installed, and report `{status, output}`.

pub mod config;
pub mod deps;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod journal;
pub mod process;
pub mod project;

pub use engine::{run_code, run_code_with, EngineSettings, ExecutionRequest};
pub use execution::{ExecutionResult, Status};
