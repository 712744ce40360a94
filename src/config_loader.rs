use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Define error types for config loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("Failed to acquire lock: {0}")]
    LockError(String),
}

// Result type alias for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Config structs for config.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Paths {
    pub output_directory: String,
    pub public_prefix: String,
    pub log_directory: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Limits {
    pub min_file_size: usize,
    pub max_file_size: usize,
    pub min_width: u32,
    pub min_height: u32,
    pub per_source_quota: usize,
    pub candidates_per_source: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pools {
    pub max_fetch_concurrency: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rate {
    pub fetch_timeout_secs: u64,
    pub query_delay_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Search {
    pub region: String,
    pub safe_search: bool,
    pub size_class: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    pub log_level: String,
    pub log_to_terminal: bool,
    pub log_to_file: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub paths: Paths,
    pub limits: Limits,
    pub pools: Pools,
    pub rate: Rate,
    pub search: Search,
    pub logging: Logging,
}

// Default implementation for AppConfig
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: Paths {
                output_directory: "public/assets/visionary".to_string(),
                public_prefix: "/assets/visionary".to_string(),
                log_directory: "./logs".to_string(),
            },
            limits: Limits {
                min_file_size: 256 * 1024,
                max_file_size: 15 * 1024 * 1024,
                min_width: 1920,
                min_height: 1080,
                per_source_quota: 5,
                candidates_per_source: 10,
            },
            pools: Pools {
                max_fetch_concurrency: 4,
            },
            rate: Rate {
                fetch_timeout_secs: 10,
                query_delay_secs: 1,
            },
            search: Search {
                region: "ca-en".to_string(),
                safe_search: false,
                size_class: "Wallpaper".to_string(),
            },
            logging: Logging {
                log_level: "info".to_string(),
                log_to_terminal: true,
                log_to_file: true,
            },
        }
    }
}

// Config manager to handle the configuration file
pub struct ConfigManager {
    app_config: Arc<RwLock<AppConfig>>,
    config_dir: PathBuf,
}

impl ConfigManager {
    // Create a new ConfigManager instance
    pub fn new(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create the directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        // Load the initial configuration
        let app_config = Self::load_app_config(&config_dir)?;

        let manager = Self {
            app_config: Arc::new(RwLock::new(app_config)),
            config_dir,
        };

        // Create a default config file if one doesn't exist yet
        manager.create_default_config()?;

        Ok(manager)
    }

    // Load app config from config.toml
    fn load_app_config(config_dir: &Path) -> ConfigResult<AppConfig> {
        let config_path = config_dir.join("config.toml");

        if !config_path.exists() {
            tracing::warn!("Config file not found: {}, using defaults", config_path.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    // Write the default config file so the operator has something to edit
    fn create_default_config(&self) -> ConfigResult<()> {
        let config_path = self.config_dir.join("config.toml");

        if config_path.exists() {
            return Ok(());
        }

        let config = self
            .app_config
            .read()
            .map_err(|e| ConfigError::LockError(e.to_string()))?
            .clone();

        let content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::TomlSer(e.to_string()))?;
        fs::write(&config_path, content)?;

        tracing::info!("Created default config file: {}", config_path.display());
        Ok(())
    }

    // Get a snapshot of the current app config
    pub fn get_app_config(&self) -> ConfigResult<AppConfig> {
        let config = self
            .app_config
            .read()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        Ok(config.clone())
    }
}
