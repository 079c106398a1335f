//! Project root and configuration resolution shared by the cache commands.

use std::path::{Path, PathBuf};

use lumen_config::{LumenConfig, CONFIG_FILE_NAME};

use crate::GlobalArgs;

/// A project directory together with its loaded configuration.
#[derive(Debug)]
pub struct Project {
    /// Directory that relative config paths are resolved against.
    pub root: PathBuf,
    /// The loaded configuration.
    pub config: LumenConfig,
}

impl Project {
    /// Absolute location of the IR cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.config.cache.dir)
    }
}

/// Walks up from `start` looking for `lumen.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the project from global CLI args.
///
/// `--config` names either a config file (its directory becomes the root)
/// or a project directory. Without it the nearest `lumen.toml` above the
/// current directory is used, and failing that the current directory with
/// default settings.
pub fn resolve_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let path = PathBuf::from(config_path);
        if path.is_file() {
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let config = lumen_config::load_config_file(&path)?;
            return Ok(Project { root, config });
        }
        if !path.is_dir() {
            return Err(format!("config path {} does not exist", path.display()).into());
        }
        let config = lumen_config::load_config(&path)?;
        return Ok(Project { root: path, config });
    }

    let cwd = std::env::current_dir()?;
    let root = find_project_root(&cwd).unwrap_or(cwd);
    let config = lumen_config::load_config(&root)?;
    Ok(Project { root, config })
}
