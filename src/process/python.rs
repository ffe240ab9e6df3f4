//! Interpreter-side helpers: the module-existence probe.

use std::path::Path;

use super::{CommandSpec, ProcessRunner};
use crate::errors::ProcessError;

/// Python one-liner that exits 0 when `name` resolves via `importlib`, 1 otherwise.
pub fn probe_snippet(name: &str) -> String {
    format!(
        "import importlib.util, sys; sys.exit(0) if importlib.util.find_spec('{}') else sys.exit(1)",
        escape_single_quoted(name)
    )
}

/// `true` when the interpreter can locate `name` as a module or package.
///
/// Any non-zero exit counts as absent, including a `find_spec` error on a
/// dotted name whose parent package is missing.
pub async fn probe(
    runner: &dyn ProcessRunner,
    interpreter: &Path,
    name: &str,
    cwd: &Path,
) -> Result<bool, ProcessError> {
    let spec = CommandSpec::new(interpreter)
        .arg("-c")
        .arg(probe_snippet(name))
        .current_dir(cwd);
    let out = runner.run(&spec).await?;
    Ok(out.success())
}

fn escape_single_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
