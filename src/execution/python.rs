//! Script runner: persist the code, run it through the first available tool.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use super::format::format_for_log;
use crate::{
    errors::{ProcessError, RunError},
    journal::Journal,
    process::{CommandSpec, ProcessOutput, ProcessRunner},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStrategy {
    /// `<pm> run python <script>` inside the managed environment.
    PackageManager,
    /// `<interpreter> <script>` directly.
    Interpreter,
}

impl RunStrategy {
    pub const DEFAULT_ORDER: [RunStrategy; 2] = [RunStrategy::PackageManager, RunStrategy::Interpreter];

    pub fn command(&self, package_manager: &str, interpreter: &Path, script: &Path) -> CommandSpec {
        let script = script.display().to_string();
        match self {
            RunStrategy::PackageManager => {
                CommandSpec::new(package_manager).args(["run", "python", script.as_str()])
            }
            RunStrategy::Interpreter => CommandSpec::new(interpreter).arg(script),
        }
    }
}

pub struct Runner<'a> {
    runner: &'a dyn ProcessRunner,
    package_manager: String,
    interpreter: PathBuf,
    project_root: PathBuf,
    formatter: Option<String>,
    script_name: String,
    timeout: Option<Duration>,
    strategies: Vec<RunStrategy>,
}

impl<'a> Runner<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        package_manager: impl Into<String>,
        interpreter: &Path,
        project_root: &Path,
    ) -> Self {
        Self {
            runner,
            package_manager: package_manager.into(),
            interpreter: interpreter.to_path_buf(),
            project_root: project_root.to_path_buf(),
            formatter: None,
            script_name: "script.py".to_string(),
            timeout: None,
            strategies: RunStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    pub fn with_formatter(mut self, formatter: Option<String>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<RunStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Write `code` to `<work_dir>/<script_name>` and run it.
    ///
    /// Returns the finished process; a non-zero exit is still `Ok` here.
    pub async fn execute(
        &self,
        code: &str,
        work_dir: &Path,
        journal: &Journal,
    ) -> Result<ProcessOutput, RunError> {
        let shown = format_for_log(self.runner, self.formatter.as_deref(), code).await;
        journal.append(&format!("Executing Code:\n{}", shown));

        fs::create_dir_all(work_dir)?;
        // Absolute, since the child runs from the project root.
        let script = absolute(&work_dir.join(&self.script_name))?;
        journal.append(&format!("Saving script to: {}", script.display()));
        fs::write(&script, code)?;

        if !script.exists() {
            return Err(RunError::ScriptMissing(script));
        }
        journal.append(&format!("Script saved successfully at: {}", script.display()));

        let mut last_err: Option<ProcessError> = None;
        for strategy in &self.strategies {
            if let Some(prev) = &last_err {
                journal.append(&format!("{}, using direct python execution", prev));
            }
            let spec = strategy
                .command(&self.package_manager, &self.interpreter, &script)
                .current_dir(&self.project_root)
                .timeout(self.timeout);
            log::info!("running: {}", spec.display());
            match self.runner.run(&spec).await {
                Ok(out) => return Ok(out),
                Err(e @ ProcessError::NotFound(_)) => {
                    log::warn!("{}", e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .map(RunError::from)
            .unwrap_or_else(|| RunError::Unexpected("no run strategy configured".to_string())))
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
