mod cli;

use std::{
    fs,
    io::{self, Read},
    process::ExitCode,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use pyrun::{
    config::Config,
    engine::{check_environment, EnvironmentReport},
    run_code, EngineSettings, ExecutionRequest,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // Load config
    let cfg = Config::load();
    let mut settings = EngineSettings::from_config(&cfg);
    if args.no_format {
        settings.formatter = None;
    }
    if let Some(secs) = args.timeout {
        settings.run_timeout = Some(Duration::from_secs(secs));
    }

    let folder = args.folder.clone().unwrap_or_else(|| cfg.folder());
    let python = args.python.clone().unwrap_or_else(|| cfg.python());

    if args.check_env {
        print_report(&check_environment(&settings, &folder, &python));
        return Ok(ExitCode::SUCCESS);
    }

    let code = read_code(&args)?;
    let mut request = ExecutionRequest::new(code, args.libs.clone())
        .with_folder(folder)
        .with_interpreter(python);
    if let Some(id) = &args.job_id {
        request = request.with_job_id(id.as_str());
    } else if args.isolate {
        request = request.isolated();
    }

    let result = run_code(&request, &settings).await;

    if args.json {
        println!("{}", serde_json::to_string(&result)?);
    } else if result.status.is_success() {
        print!("{}", result.output);
    } else {
        eprint!("{}", result.output);
        if !result.output.ends_with('\n') {
            eprintln!();
        }
    }

    Ok(if result.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Code comes from the positional argument, `--file`, or piped stdin.
fn read_code(args: &cli::Cli) -> Result<String> {
    if let Some(code) = &args.code {
        return Ok(code.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("reading code file: {}", path.display()));
    }
    if io::stdin().is_terminal() {
        bail!("no code given: pass CODE, --file, or pipe it on stdin");
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        bail!("stdin was empty");
    }
    Ok(buf)
}

fn print_report(report: &EnvironmentReport) {
    fn line(label: &str, value: &Result<std::path::PathBuf, String>) {
        match value {
            Ok(p) => println!("{:<16} {}", label, p.display().green()),
            Err(e) => println!("{:<16} {}", label, e.red()),
        }
    }

    line("package manager", &report.package_manager);
    line("interpreter", &report.interpreter);
    match &report.formatter {
        Some(f) => line("formatter", f),
        None => println!("{:<16} {}", "formatter", "disabled".yellow()),
    }
    match &report.project_root {
        Some(root) if root.found => println!("{:<16} {}", "project root", root.path.display().green()),
        Some(root) => println!(
            "{:<16} {} {}",
            "project root",
            root.path.display().yellow(),
            "(no marker found, using cwd)"
        ),
        None => println!("{:<16} {}", "project root", "unavailable".red()),
    }
}
