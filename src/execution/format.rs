//! Cosmetic reformatting of code for the journal. Never affects what runs.

use crate::process::{CommandSpec, ProcessRunner};

/// Pipe `code` through `<formatter> --quiet -`. Any failure returns `code` as-is.
pub async fn format_for_log(
    runner: &dyn ProcessRunner,
    formatter: Option<&str>,
    code: &str,
) -> String {
    let Some(formatter) = formatter else {
        return code.to_string();
    };
    let spec = CommandSpec::new(formatter).args(["--quiet", "-"]).stdin(code);
    match runner.run(&spec).await {
        Ok(out) if out.success() && !out.stdout.is_empty() => out.stdout,
        Ok(out) => {
            log::debug!("{} rejected the code (exit {:?})", formatter, out.code);
            code.to_string()
        }
        Err(e) => {
            log::debug!("formatter unavailable: {}", e);
            code.to_string()
        }
    }
}
