//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Default port for the operator web app (trialog-ui)
pub const UI_PORT: u16 = 5810;

/// Default port for the summarization service (trialog-an)
pub const AN_PORT: u16 = 5811;

/// Database file name within the root folder
pub const DATABASE_FILE: &str = "trialog.db";

/// Draft cache file name within the root folder (trialog-ui only)
pub const DRAFT_CACHE_FILE: &str = "drafts.json";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. TRIALOG_ROOT environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("TRIALOG_ROOT") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get default configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("trialog").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/trialog/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("trialog"))
        .unwrap_or_else(|| PathBuf::from("./trialog_data"))
}

/// Resolved root folder with derived file paths
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create the folder if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE)
    }

    pub fn draft_cache_path(&self) -> PathBuf {
        self.path.join(DRAFT_CACHE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_takes_priority() {
        let root = resolve_root_folder(Some("/tmp/trialog-test"));
        assert_eq!(root, PathBuf::from("/tmp/trialog-test"));
    }

    #[test]
    fn test_root_folder_paths() {
        let root = RootFolder::new(PathBuf::from("/data/trialog"));
        assert_eq!(root.database_path(), PathBuf::from("/data/trialog/trialog.db"));
        assert_eq!(root.draft_cache_path(), PathBuf::from("/data/trialog/drafts.json"));
    }

    #[test]
    fn test_ensure_exists_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootFolder::new(dir.path().join("nested").join("root"));
        root.ensure_exists().unwrap();
        assert!(root.path().is_dir());
    }
}
