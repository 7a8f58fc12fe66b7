//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "skillforge.db";

/// Default HTTP port for the core service
pub const DEFAULT_PORT: u16 = 5800;

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_dir` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_dir));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir())
}

/// Full path of the SQLite database inside the resolved data folder
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/skillforge/config.toml first, then /etc/skillforge/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("skillforge").join("config.toml"));
        let system_config = PathBuf::from("/etc/skillforge/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("skillforge").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/skillforge (or /var/lib/skillforge for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("skillforge"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/skillforge"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("skillforge"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/skillforge"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("skillforge"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\skillforge"))
    } else {
        PathBuf::from("./skillforge_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let dir = resolve_data_dir(Some("/tmp/sf-test"), "SKILLFORGE_TEST_UNSET_VAR").unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/sf-test"));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_used_when_no_cli_arg() {
        std::env::set_var("SKILLFORGE_TEST_DATA_DIR_A", "/tmp/sf-env");
        let dir = resolve_data_dir(None, "SKILLFORGE_TEST_DATA_DIR_A").unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/sf-env"));
        std::env::remove_var("SKILLFORGE_TEST_DATA_DIR_A");
    }

    #[test]
    fn test_database_path_appends_file_name() {
        let path = database_path(Path::new("/data/skillforge"));
        assert_eq!(path, PathBuf::from("/data/skillforge/skillforge.db"));
    }
}
