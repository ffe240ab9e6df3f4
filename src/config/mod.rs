//! Layered configuration: built-in defaults, then `.pyrunrc`, then environment.

use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        // Read .pyrunrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Comma separated value, empty items dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    pub fn folder(&self) -> PathBuf {
        self.get_path("PYRUN_FOLDER")
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }

    pub fn package_manager(&self) -> String {
        self.get("PYRUN_PACKAGE_MANAGER")
            .unwrap_or_else(|| "uv".to_string())
    }

    /// Formatter used for the journal copy of the code; `None` when disabled.
    pub fn formatter(&self) -> Option<String> {
        if !self.get_bool("PYRUN_FORMAT_CODE") {
            return None;
        }
        self.get("PYRUN_FORMATTER")
            .filter(|f| !f.trim().is_empty() && !f.eq_ignore_ascii_case("none"))
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.get_u64("PYRUN_RUN_TIMEOUT")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Interpreter used for probes and the direct-run fallback.
    pub fn python(&self) -> PathBuf {
        if let Some(p) = self.get_path("PYRUN_PYTHON") {
            return p;
        }
        current_interpreter()
    }
}

/// Best guess at "the current interpreter": an active virtualenv first, then
/// whatever `python3` resolves to on PATH.
pub fn current_interpreter() -> PathBuf {
    if let Ok(venv) = env::var("VIRTUAL_ENV") {
        let bin = if cfg!(windows) { "Scripts/python.exe" } else { "bin/python" };
        let candidate = Path::new(&venv).join(bin);
        if candidate.exists() {
            return candidate;
        }
    }
    which::which("python3")
        .or_else(|_| which::which("python"))
        .unwrap_or_else(|_| PathBuf::from("python"))
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("PYRUN_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pyrun").join(".pyrunrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Paths and file names
    m.insert("PYRUN_FOLDER".into(), "uploads".into());
    m.insert("PYRUN_SCRIPT_NAME".into(), "script.py".into());
    m.insert("PYRUN_LOG_FILE".into(), "execution_result.txt".into());
    m.insert(
        "PYRUN_PROJECT_MARKERS".into(),
        "pyproject.toml,uv.lock,main.py".into(),
    );

    // Tools
    m.insert("PYRUN_PACKAGE_MANAGER".into(), "uv".into());
    m.insert("PYRUN_FORMATTER".into(), "black".into());

    // Bools as strings
    m.insert("PYRUN_FORMAT_CODE".into(), "true".into());

    m
}
