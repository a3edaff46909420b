//! Configuration management for arsip.
//!
//! Configuration is loaded with figment from defaults, an optional TOML file
//! and `ARSIP_`-prefixed environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "arsip";

/// Default preferences database file name.
const PREFERENCES_FILE_NAME: &str = "preferences.db";

/// Upper bound for the PDF settle delay.
const MAX_PDF_SETTLE_MS: u64 = 60_000;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ARSIP_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/arsip/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Print surface configuration.
    pub print: PrintConfig,
    /// Attachment handle configuration.
    pub attachments: AttachmentConfig,
    /// Preference storage configuration.
    pub preferences: PreferencesConfig,
}

/// Print-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Directory that receives one HTML document per print.
    /// Defaults to `~/.local/share/arsip/prints`
    pub output_dir: Option<PathBuf>,
    /// How long to let an embedded PDF viewer render before printing when
    /// the host cannot signal readiness.
    pub pdf_settle_ms: u64,
    /// Command that receives the finished document path as its last
    /// argument (for example `lp`). When unset the path is only logged.
    pub command: Option<String>,
}

/// Attachment-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Directory backing transient display handles.
    /// Defaults to a per-process directory under the system temp dir.
    pub spool_dir: Option<PathBuf>,
}

/// Preference storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Path to the preferences database.
    /// Defaults to `~/.local/share/arsip/preferences.db`
    pub database_path: Option<PathBuf>,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            pdf_settle_ms: 700,
            command: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ARSIP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.print.pdf_settle_ms == 0 || self.print.pdf_settle_ms > MAX_PDF_SETTLE_MS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "pdf_settle_ms must be between 1 and {MAX_PDF_SETTLE_MS} (got {})",
                    self.print.pdf_settle_ms
                ),
            });
        }

        if let Some(command) = &self.print.command {
            match shlex::split(command) {
                Some(words) if !words.is_empty() => {}
                _ => {
                    return Err(Error::ConfigValidation {
                        message: format!("print command cannot be parsed: {command:?}"),
                    });
                }
            }
        }

        Ok(())
    }

    /// Get the print output directory, resolving defaults if not set.
    #[must_use]
    pub fn print_output_dir(&self) -> PathBuf {
        self.print
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("prints"))
    }

    /// Get the spool directory, resolving defaults if not set.
    #[must_use]
    pub fn spool_dir(&self) -> PathBuf {
        self.attachments.spool_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("arsip-spool-{}", std::process::id()))
        })
    }

    /// Get the preferences database path, resolving defaults if not set.
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(PREFERENCES_FILE_NAME))
    }

    /// Get the PDF settle delay as a Duration.
    #[must_use]
    pub fn pdf_settle(&self) -> Duration {
        Duration::from_millis(self.print.pdf_settle_ms)
    }
}
