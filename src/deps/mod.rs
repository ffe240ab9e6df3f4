//! Dependency resolution: probe each library, install what is missing.
//!
//! Installation walks an ordered list of [`InstallStrategy`] values. The first
//! tier that exits 0 wins; if every tier fails, resolution stops at that library
//! and later libraries are never looked at. The caller journals the failure.

use std::path::{Path, PathBuf};

use crate::{
    errors::InstallError,
    journal::Journal,
    process::{python, CommandSpec, ProcessRunner},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// `<pm> add <name>`: declare it as a project dependency.
    Add,
    /// `<pm> pip install <name>`: install into the environment only.
    PipInstall,
}

impl InstallStrategy {
    pub const DEFAULT_ORDER: [InstallStrategy; 2] = [InstallStrategy::Add, InstallStrategy::PipInstall];

    pub fn command(&self, package_manager: &str, library: &str, cwd: &Path) -> CommandSpec {
        let spec = CommandSpec::new(package_manager).current_dir(cwd);
        match self {
            InstallStrategy::Add => spec.args(["add", library]),
            InstallStrategy::PipInstall => spec.args(["pip", "install", library]),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstallStrategy::Add => "add",
            InstallStrategy::PipInstall => "pip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyPresent,
    Installed(InstallStrategy),
}

pub struct Resolver<'a> {
    runner: &'a dyn ProcessRunner,
    package_manager: String,
    interpreter: PathBuf,
    project_root: PathBuf,
    strategies: Vec<InstallStrategy>,
}

impl<'a> Resolver<'a> {
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
            strategies: InstallStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<InstallStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Ensure every library is importable, in order.
    pub async fn resolve(
        &self,
        libraries: &[String],
        journal: &Journal,
    ) -> Result<Vec<(String, InstallOutcome)>, InstallError> {
        let mut outcomes = Vec::with_capacity(libraries.len());
        for lib in libraries {
            let lib = lib.as_str();
            if lib.trim().is_empty() {
                log::warn!("skipping empty library name");
                continue;
            }
            let outcome = self.ensure(lib, journal).await.inspect_err(|e| log::error!("{}", e))?;
            outcomes.push((lib.to_string(), outcome));
        }
        Ok(outcomes)
    }

    async fn ensure(&self, lib: &str, journal: &Journal) -> Result<InstallOutcome, InstallError> {
        let present = python::probe(self.runner, &self.interpreter, lib, &self.project_root)
            .await
            .map_err(|source| InstallError::Probe {
                library: lib.to_string(),
                source,
            })?;
        if present {
            journal.append(&format!("{} already installed.", lib));
            return Ok(InstallOutcome::AlreadyPresent);
        }

        let pm = &self.package_manager;
        journal.append(&format!(
            "Installing {} with {} in {}...",
            lib,
            pm,
            self.project_root.display()
        ));

        let mut failures: Vec<String> = Vec::with_capacity(self.strategies.len());
        for (i, strategy) in self.strategies.iter().enumerate() {
            if i > 0 {
                journal.append(&format!(
                    "{} {} failed, trying {} {} for {}...",
                    pm,
                    self.strategies[i - 1].label(),
                    pm,
                    strategy.label(),
                    lib
                ));
            }
            let spec = strategy.command(pm, lib, &self.project_root);
            log::info!("installing {}: {}", lib, spec.display());
            match self.runner.run(&spec).await {
                Ok(out) if out.success() => {
                    let how = if i == 0 {
                        String::new()
                    } else {
                        format!(" with {} {}", pm, strategy.label())
                    };
                    journal.append(&format!("Successfully installed {}{}", lib, how));
                    return Ok(InstallOutcome::Installed(*strategy));
                }
                Ok(out) => failures.push(out.stderr),
                // A package manager that cannot be launched is just another failed tier.
                Err(e) => failures.push(e.to_string()),
            }
        }

        let mut failures = failures.into_iter();
        let add_stderr = failures.next().unwrap_or_default();
        let pip_stderr = failures.collect::<Vec<_>>().join(" | ");
        Err(InstallError::Failed {
            library: lib.to_string(),
            add_stderr,
            pip_stderr,
        })
    }
}
