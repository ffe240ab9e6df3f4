//! Append-only execution journal kept next to the scripts it describes.
//!
//! Entry layout: `\n[YYYY-MM-DD HH:MM:SS]\n<content>\n` followed by a 40-dash rule.
//! Nothing in the crate reads the journal back.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;

const RULE_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal at `<folder>/<file_name>`. The folder is created if missing.
    pub fn open(folder: &Path, file_name: &str) -> Self {
        if let Err(e) = fs::create_dir_all(folder) {
            log::warn!("cannot create journal folder {}: {}", folder.display(), e);
        }
        Self {
            path: folder.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped entry. Failures are logged and swallowed.
    pub fn append(&self, content: &str) {
        log::debug!("journal: {}", content);
        let entry = render_entry(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string(), content);
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(entry.as_bytes()));
        if let Err(e) = res {
            log::warn!("cannot write journal {}: {}", self.path.display(), e);
        }
    }
}

fn render_entry(timestamp: &str, content: &str) -> String {
    format!("\n[{}]\n{}\n{}\n", timestamp, content, "-".repeat(RULE_WIDTH))
}
