//! The public operation: resolve dependencies, then run the script.
//!
//! `run_code` is total. Every failure is journaled and folded into an
//! [`ExecutionResult`] with `Status::Failure`.
//!
//! Concurrent calls must use different folders (or different job ids): the
//! script path inside a work dir is fixed, and installs on a shared project
//! root race on the package manager's own lockfile.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    config::{current_interpreter, Config},
    deps::Resolver,
    errors::RunError,
    execution::{classify, python::Runner, ExecutionResult},
    journal::Journal,
    process::{ProcessRunner, TokioRunner},
    project::{discover_root, ProjectRoot},
};

const WORK_DIR_NAME: &str = "job_work";

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub libraries: Vec<String>,
    pub folder: PathBuf,
    pub interpreter: PathBuf,
    /// Runs with a job id get their own `job_work/<id>` directory.
    pub job_id: Option<String>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, libraries: Vec<String>) -> Self {
        Self {
            code: code.into(),
            libraries,
            folder: PathBuf::from("uploads"),
            interpreter: current_interpreter(),
            job_id: None,
        }
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Fresh random job id, so concurrent runs on one folder do not collide.
    pub fn isolated(self) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        self.with_job_id(id)
    }

    pub fn work_dir(&self) -> Result<PathBuf, RunError> {
        let base = self.folder.join(WORK_DIR_NAME);
        match self.job_id.as_deref() {
            None => Ok(base),
            Some(id) if is_safe_job_id(id) => Ok(base.join(id)),
            Some(id) => Err(RunError::Unexpected(format!("invalid job id: {:?}", id))),
        }
    }
}

fn is_safe_job_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub package_manager: String,
    pub formatter: Option<String>,
    pub project_markers: Vec<String>,
    pub run_timeout: Option<Duration>,
    pub script_name: String,
    pub log_file: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            package_manager: "uv".to_string(),
            formatter: Some("black".to_string()),
            project_markers: vec![
                "pyproject.toml".to_string(),
                "uv.lock".to_string(),
                "main.py".to_string(),
            ],
            run_timeout: None,
            script_name: "script.py".to_string(),
            log_file: "execution_result.txt".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let defaults = Self::default();
        let markers = cfg.get_list("PYRUN_PROJECT_MARKERS");
        Self {
            package_manager: cfg.package_manager(),
            formatter: cfg.formatter(),
            project_markers: if markers.is_empty() {
                defaults.project_markers
            } else {
                markers
            },
            run_timeout: cfg.run_timeout(),
            script_name: cfg
                .get("PYRUN_SCRIPT_NAME")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.script_name),
            log_file: cfg
                .get("PYRUN_LOG_FILE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.log_file),
        }
    }
}

/// Run `request` against real subprocesses.
pub async fn run_code(request: &ExecutionRequest, settings: &EngineSettings) -> ExecutionResult {
    run_code_with(&TokioRunner, request, settings).await
}

pub async fn run_code_with(
    runner: &dyn ProcessRunner,
    request: &ExecutionRequest,
    settings: &EngineSettings,
) -> ExecutionResult {
    let journal = Journal::open(&request.folder, &settings.log_file);
    let res = pipeline(runner, request, settings, &journal).await;
    match &res {
        Ok(stdout) => {
            log::info!("script finished successfully");
            journal.append(&format!("Code executed successfully:\n{}", stdout));
        }
        Err(e) => {
            log::error!("run failed: {}", e);
            journal.append(&e.to_string());
        }
    }
    ExecutionResult::from(res)
}

async fn pipeline(
    runner: &dyn ProcessRunner,
    request: &ExecutionRequest,
    settings: &EngineSettings,
    journal: &Journal,
) -> Result<String, RunError> {
    let root = discover_root(&request.folder, &settings.project_markers)?;
    log_root(&root, journal);

    let work_dir = request.work_dir()?;

    Resolver::new(runner, settings.package_manager.as_str(), &request.interpreter, &root.path)
        .resolve(&request.libraries, journal)
        .await?;

    let out = Runner::new(runner, settings.package_manager.as_str(), &request.interpreter, &root.path)
        .with_formatter(settings.formatter.clone())
        .with_script_name(settings.script_name.as_str())
        .with_timeout(settings.run_timeout)
        .execute(&request.code, &work_dir, journal)
        .await?;
    classify(out)
}

fn log_root(root: &ProjectRoot, journal: &Journal) {
    if root.found {
        journal.append(&format!("Found project root: {}", root.path.display()));
    } else {
        journal.append(&format!(
            "Using current working directory as project root: {}",
            root.path.display()
        ));
    }
}

/// What the pipeline would use, for `--check-env`.
#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    pub package_manager: Result<PathBuf, String>,
    pub interpreter: Result<PathBuf, String>,
    pub formatter: Option<Result<PathBuf, String>>,
    pub project_root: Option<ProjectRoot>,
}

pub fn check_environment(
    settings: &EngineSettings,
    folder: &Path,
    interpreter: &Path,
) -> EnvironmentReport {
    let locate = |tool: &Path| which::which(tool).map_err(|e| e.to_string());
    EnvironmentReport {
        package_manager: locate(Path::new(&settings.package_manager)),
        interpreter: locate(interpreter),
        formatter: settings.formatter.as_deref().map(|f| locate(Path::new(f))),
        project_root: discover_root(folder, &settings.project_markers).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        execution::Status,
        process::fake::{FakeRunner, Reply},
    };
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> EngineSettings {
        EngineSettings {
            formatter: None,
            ..EngineSettings::default()
        }
    }

    fn request(dir: &TempDir, code: &str, libs: &[&str]) -> ExecutionRequest {
        // A marker keeps discovery inside the temp dir.
        fs::write(dir.path().join("pyproject.toml"), "").unwrap();
        ExecutionRequest::new(code, libs.iter().map(|s| s.to_string()).collect())
            .with_folder(dir.path().join("uploads"))
            .with_interpreter("python3")
    }

    #[tokio::test]
    async fn test_success_returns_stdout() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().on("uv run python", Reply::ok("ok\n"));
        let res = run_code_with(&runner, &request(&dir, "print('ok')", &[]), &settings()).await;
        assert_eq!(res, ExecutionResult::success("ok\n"));

        let log = fs::read_to_string(dir.path().join("uploads/execution_result.txt")).unwrap();
        assert!(log.contains("Found project root"));
        assert!(log.contains("Code executed successfully:\nok\n"));
        let runs = runner.specs();
        assert_eq!(runs[0].cwd.as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_install_failure_never_writes_script() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new()
            .on("find_spec", Reply::fail(1, ""))
            .on("uv add", Reply::fail(1, "E-ADD"))
            .on("uv pip install", Reply::fail(1, "E-PIP"));
        let req = request(&dir, "import nothere", &["nothere"]);
        let res = run_code_with(&runner, &req, &settings()).await;

        assert_eq!(res.status, Status::Failure);
        assert!(res.output.contains("E-ADD"));
        assert!(res.output.contains("E-PIP"));
        assert!(!dir.path().join("uploads/job_work/script.py").exists());
        assert!(!runner.calls().iter().any(|c| c.contains(" run python")));

        let log = fs::read_to_string(dir.path().join("uploads/execution_result.txt")).unwrap();
        assert!(log.contains("Failed to install library 'nothere'"));
    }

    #[tokio::test]
    async fn test_runtime_error_returns_stderr_only() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().on(
            "uv run python",
            Reply::Exit {
                code: 1,
                stdout: "printed before crash\n".into(),
                stderr: "ZeroDivisionError: division by zero\n".into(),
            },
        );
        let res = run_code_with(&runner, &request(&dir, "print('x'); 1/0", &[]), &settings()).await;
        assert_eq!(res, ExecutionResult::failure("ZeroDivisionError: division by zero\n"));
    }

    #[tokio::test]
    async fn test_installed_library_triggers_no_install() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().on("find_spec('math')", Reply::ok(""));
        let res = run_code_with(&runner, &request(&dir, "import math", &["math"]), &settings()).await;
        assert_eq!(res.status, Status::Success);
        assert!(!runner
            .calls()
            .iter()
            .any(|c| c.contains("uv add") || c.contains("pip install")));
        let log = fs::read_to_string(dir.path().join("uploads/execution_result.txt")).unwrap();
        assert!(log.contains("math already installed."));
    }

    #[tokio::test]
    async fn test_job_id_gets_its_own_work_dir() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let req = request(&dir, "pass", &[]).with_job_id("job-1");
        run_code_with(&runner, &req, &settings()).await;
        assert!(dir.path().join("uploads/job_work/job-1/script.py").exists());
    }

    #[tokio::test]
    async fn test_bad_job_id_is_reported_not_panicked() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let req = request(&dir, "pass", &["requests"]).with_job_id("../escape");
        let res = run_code_with(&runner, &req, &settings()).await;
        assert_eq!(res.status, Status::Failure);
        assert!(res.output.contains("invalid job id"));
        // Rejected before any library is probed or installed.
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unlaunchable_interpreter_fails_before_writing_script() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().on("find_spec", Reply::NotFound);
        let req = request(&dir, "import numpy", &["numpy"]);
        let res = run_code_with(&runner, &req, &settings()).await;

        assert_eq!(res.status, Status::Failure);
        assert!(res.output.starts_with("Failed to probe library 'numpy'"));
        assert!(!dir.path().join("uploads/job_work/script.py").exists());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_isolated_requests_differ() {
        let a = ExecutionRequest::new("pass", vec![]).isolated();
        let b = ExecutionRequest::new("pass", vec![]).isolated();
        assert_ne!(a.work_dir().unwrap(), b.work_dir().unwrap());
    }

    #[test]
    fn test_default_work_dir_is_fixed() {
        let req = ExecutionRequest::new("pass", vec![]).with_folder("data");
        assert_eq!(req.work_dir().unwrap(), PathBuf::from("data/job_work"));
    }
}
