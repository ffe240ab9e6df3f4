//! Project root discovery for package-manager and interpreter subprocesses.

use std::{
    env,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    pub path: PathBuf,
    /// `false` when no marker was found and the cwd was used instead.
    pub found: bool,
}

/// Walk upward from the absolute form of `folder` until a directory holding one
/// of `markers` is found. Falls back to the current working directory.
pub fn discover_root(folder: &Path, markers: &[String]) -> std::io::Result<ProjectRoot> {
    let cwd = env::current_dir()?;
    let start = absolutize(folder, &cwd);

    let mut current: Option<&Path> = Some(start.as_path());
    while let Some(dir) = current {
        if markers.iter().any(|m| dir.join(m).exists()) {
            return Ok(ProjectRoot {
                path: dir.to_path_buf(),
                found: true,
            });
        }
        current = dir.parent();
    }

    Ok(ProjectRoot {
        path: cwd,
        found: false,
    })
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn markers() -> Vec<String> {
        vec!["pyproject.toml".into(), "uv.lock".into(), "main.py".into()]
    }

    #[test]
    fn test_finds_nearest_marker_upwards() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("proj");
        let folder = root.join("data").join("uploads");
        fs::create_dir_all(&folder).unwrap();
        fs::write(root.join("pyproject.toml"), "[project]\nname='x'\n").unwrap();

        let found = discover_root(&folder, &markers()).unwrap();
        assert!(found.found);
        assert_eq!(found.path, root);
    }

    #[test]
    fn test_folder_itself_can_be_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("uv.lock"), "").unwrap();
        let found = discover_root(dir.path(), &markers()).unwrap();
        assert_eq!(found.path, dir.path());
    }

    #[test]
    fn test_nonexistent_folder_still_walks_parents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.py"), "").unwrap();
        let folder = dir.path().join("not").join("created").join("yet");
        let found = discover_root(&folder, &markers()).unwrap();
        assert!(found.found);
        assert_eq!(found.path, dir.path());
    }

    #[test]
    fn test_falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let marker = vec!["a-marker-nobody-has.xyz".to_string()];
        let found = discover_root(dir.path(), &marker).unwrap();
        assert!(!found.found);
        assert_eq!(found.path, env::current_dir().unwrap());
    }
}
