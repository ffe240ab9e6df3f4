//! Subprocess plumbing: one buffered run per call, stdout/stderr captured as text.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

use crate::errors::ProcessError;

pub mod python;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, cwd: &Path) -> Self {
        self.cwd = Some(cwd.to_path_buf());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// `program arg1 arg2`, for logs.
    pub fn display(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the pipeline and real processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        let program = spec.program.display().to_string();
        log::debug!("spawning: {}", spec.display());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        // Own process group, so a timeout can take down grandchildren too
        // (`uv run` forks the interpreter).
        #[cfg(unix)]
        {
            if spec.timeout.is_some() {
                cmd.process_group(0);
            }
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound(program.clone()),
            _ => ProcessError::Launch {
                program: program.clone(),
                source: e,
            },
        })?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits without reading stdin closes the pipe; its exit
                // status still tells the story.
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    log::debug!("stdin write to {} failed: {}", program, e);
                }
            }
        }

        let out = match spec.timeout {
            Some(limit) => {
                let pid = child.id();
                let wait = child.wait_with_output();
                tokio::pin!(wait);
                match timeout(limit, &mut wait).await {
                    Ok(res) => res?,
                    Err(_) => {
                        kill_group(pid);
                        return Err(ProcessError::TimedOut {
                            program,
                            secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        Ok(ProcessOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// SIGKILL the process group led by `pid`. The leader itself is also killed on
/// drop of its `Child`.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    // SAFETY: killpg takes plain integers and only sends a signal.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        log::debug!(
            "killpg({}) failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted runner that records every command it is asked to run.

    use std::sync::Mutex;

    use super::*;

    pub enum Reply {
        Exit { code: i32, stdout: String, stderr: String },
        NotFound,
    }

    impl Reply {
        pub fn ok(stdout: &str) -> Self {
            Reply::Exit { code: 0, stdout: stdout.into(), stderr: String::new() }
        }

        pub fn fail(code: i32, stderr: &str) -> Self {
            Reply::Exit { code, stdout: String::new(), stderr: stderr.into() }
        }
    }

    /// Replies are matched against `program + args` by substring, first rule wins.
    /// Unmatched commands exit 0 with empty output.
    #[derive(Default)]
    pub struct FakeRunner {
        rules: Vec<(String, Reply)>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(mut self, needle: &str, reply: Reply) -> Self {
            self.rules.push((needle.to_string(), reply));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|c| c.display()).collect()
        }

        pub fn specs(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
            self.calls.lock().unwrap().push(spec.clone());
            let line = spec.display();
            for (needle, reply) in &self.rules {
                if line.contains(needle.as_str()) {
                    return match reply {
                        Reply::Exit { code, stdout, stderr } => Ok(ProcessOutput {
                            code: Some(*code),
                            stdout: stdout.clone(),
                            stderr: stderr.clone(),
                        }),
                        Reply::NotFound => {
                            Err(ProcessError::NotFound(spec.program.display().to_string()))
                        }
                    };
                }
            }
            Ok(ProcessOutput { code: Some(0), ..Default::default() })
        }
    }
}
