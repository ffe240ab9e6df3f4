use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "pyrun", about = "Install a snippet's libraries, run it, report what happened", version)]
#[command(group(ArgGroup::new("source").args(["code", "file"]).multiple(false)))]
#[command(group(ArgGroup::new("job").args(["job_id", "isolate"]).multiple(false)))]
pub struct Cli {
    /// Python code to run. Read from stdin when omitted.
    #[arg(value_name = "CODE")]
    pub code: Option<String>,

    /// Read the code from a file instead.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Library the code needs; repeat for several: --lib numpy --lib pandas
    #[arg(short = 'l', long = "lib", action = ArgAction::Append)]
    pub libs: Vec<String>,

    /// Folder holding the work dir and the execution journal.
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Interpreter used for probes and the direct-run fallback.
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Run inside job_work/<ID> instead of the shared job_work.
    #[arg(long = "job-id")]
    pub job_id: Option<String>,

    /// Like --job-id with a freshly generated id.
    #[arg(long)]
    pub isolate: bool,

    /// Kill the script after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print {"status": 0|1, "output": ...} instead of the raw output.
    #[arg(long)]
    pub json: bool,

    /// Skip reformatting the code for the journal.
    #[arg(long = "no-format")]
    pub no_format: bool,

    /// Show which tools and project root would be used, then exit.
    #[arg(long = "check-env")]
    pub check_env: bool,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
