//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FURNICRAFT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "furnicraft.db";

/// Blob storage directory inside the root folder
pub const IMAGES_DIR: &str = "furniture-images";

/// Contents of `config.toml`
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub flowise: FlowiseConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Flowise prediction endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowiseConfig {
    /// Full prediction URL (`.../api/v1/prediction/<chatflow-id>`)
    pub api_url: Option<String>,
    /// Bearer token, when the chatflow is protected
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Overrides the built-in analysis prompt
    pub question: Option<String>,
}

impl Default for FlowiseConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            timeout_secs: 120,
            question: None,
        }
    }
}

/// Analysis status polling cadence
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub initial_delay_ms: u64,
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3000,
            interval_ms: 2000,
            max_attempts: 90,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL under which stored blobs are reachable.
    /// Defaults to `http://<server.host>:<server.port>/storage`.
    pub public_base_url: Option<String>,
}

/// Default location of `config.toml` (`~/.config/furnicraft/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("furnicraft").join("config.toml"))
}

/// Load TOML configuration, falling back to defaults when the file is absent
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument
/// 2. Environment variable (`FURNICRAFT_ROOT_FOLDER`)
/// 3. TOML config `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("furnicraft"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\furnicraft"))
    } else {
        // ~/.local/share/furnicraft, ~/Library/Application Support/furnicraft
        dirs::data_local_dir()
            .map(|d| d.join("furnicraft"))
            .unwrap_or_else(|| PathBuf::from("./furnicraft_data"))
    }
}

/// Creates the root folder layout and names the files inside it
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder and the blob directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.images_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE)
    }

    pub fn images_path(&self) -> PathBuf {
        self.path.join(IMAGES_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [flowise]
            api_url = "https://flowise.example/api/v1/prediction/abc"

            [polling]
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(
            config.flowise.api_url.as_deref(),
            Some("https://flowise.example/api/v1/prediction/abc")
        );
        assert_eq!(config.flowise.timeout_secs, 120);
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.initial_delay_ms, 3000);
        assert_eq!(config.polling.max_attempts, 90);
        assert_eq!(config.server.port, 5740);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_root_folder_layout() {
        let root = RootFolder::new(PathBuf::from("/tmp/fc"));
        assert_eq!(root.database_path(), PathBuf::from("/tmp/fc/furnicraft.db"));
        assert_eq!(root.images_path(), PathBuf::from("/tmp/fc/furniture-images"));
    }

    #[test]
    fn test_bind_address() {
        let server = ServerConfig::default();
        assert_eq!(server.bind_address(), "127.0.0.1:5740");
    }
}
