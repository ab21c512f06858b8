//! Configuration management module.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::sqlite_url;
use crate::export::{CellRef, ExportOptions, Layout, PhotoPlacement, PhotoScale};
use crate::models::equipment::EquipmentField;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for crate::error::AppError {
    fn from(e: ConfigError) -> Self {
        crate::error::AppError::config(e.to_string())
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Pool size (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

/// Spreadsheet export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Zero-based sheet to fill.
    #[serde(default)]
    pub sheet_index: usize,
    /// Cell the photo's top-left corner is anchored to, in A1 notation.
    #[serde(default = "default_photo_cell")]
    pub photo_cell: String,
    #[serde(default)]
    pub photo_scale: PhotoScale,
    /// Per-field target cells in A1 notation, replacing the default layout entries.
    #[serde(default)]
    pub cells: BTreeMap<String, String>,
}

fn default_file_prefix() -> String {
    "equipment".to_string()
}

fn default_photo_cell() -> String {
    crate::export::DEFAULT_PHOTO_ANCHOR.to_string()
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily log files; console only when absent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Get config file path in the platform config directory.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Database path cannot be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "Database max_connections must be at least 1".to_string(),
            ));
        }
        if self.export.template_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Template path cannot be empty".to_string()));
        }
        if self.export.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Output directory cannot be empty".to_string()));
        }
        let prefix = self.export.file_prefix.trim();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "File prefix must be a non-empty file name".to_string(),
            ));
        }
        if let PhotoScale::Fixed { width_px, height_px } = self.export.photo_scale {
            if width_px == 0 || height_px == 0 {
                return Err(ConfigError::Validation("Photo size must be greater than 0".to_string()));
            }
        }
        self.export.export_options()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// Build connection string for SeaORM.
    pub fn connection_string(&self) -> String {
        sqlite_url(&self.path)
    }
}

impl ExportConfig {
    /// Build exporter options: default layout with configured cell overrides.
    pub fn export_options(&self) -> Result<ExportOptions, ConfigError> {
        let mut layout = Layout::default();
        for (key, cell) in &self.cells {
            let field: EquipmentField = key
                .parse()
                .map_err(|e| ConfigError::Validation(format!("export.cells: {e}")))?;
            let cell: CellRef = cell
                .parse()
                .map_err(|e| ConfigError::Validation(format!("export.cells.{field}: {e}")))?;
            layout = layout.with_override(field, cell);
        }

        let anchor: CellRef = self
            .photo_cell
            .parse()
            .map_err(|e| ConfigError::Validation(format!("export.photo_cell: {e}")))?;

        Ok(ExportOptions {
            layout,
            sheet_index: self.sheet_index,
            photo: PhotoPlacement {
                anchor,
                scale: self.photo_scale,
            },
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "biomed", "biomed-inventory")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("inventory.db"),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            template_path: data_dir().join("template.xlsx"),
            output_dir: data_dir().join("exports"),
            file_prefix: default_file_prefix(),
            sheet_index: 0,
            photo_cell: default_photo_cell(),
            photo_scale: PhotoScale::Original,
            cells: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}
