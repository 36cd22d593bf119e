//! Static bot configuration, read once at startup from a JSON file.
//!
//! The file is optional; every field has a default. Durations use humantime notation
//! (`"60s"`, `"1m 30s"`) and colors are `"#RRGGBB"` strings.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{info, warn};

use crate::commands::music::utils::session_manager::SessionOptions;
use crate::utils::embeds::Severity;

/// Environment variable pointing at the config file.
pub const CONFIG_PATH_VAR: &str = "CADENCE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_THUMBNAIL: &str = "https://raw.githubusercontent.com/mariusbegby/cadence-discord-bot/main/icons/Cadence-icon-rounded-128px.png";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing DISCORD_TOKEN")]
    MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub embed_colors: EmbedColors,
    pub session: SessionOptions,
    pub dispatch: DispatchOptions,
    /// Thumbnail used for tracks whose source provides none.
    pub default_thumbnail: String,
    /// Linked from failure replies when set.
    pub support_server_url: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            embed_colors: EmbedColors::default(),
            session: SessionOptions::default(),
            dispatch: DispatchOptions::default(),
            default_thumbnail: DEFAULT_THUMBNAIL.to_string(),
            support_server_url: None,
        }
    }
}

impl BotConfig {
    /// Load the file named by `CADENCE_CONFIG`, or `config.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                let config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Embed color per reply severity.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EmbedColors {
    #[serde(deserialize_with = "hex_color")]
    pub info: u32,
    #[serde(deserialize_with = "hex_color")]
    pub success: u32,
    #[serde(deserialize_with = "hex_color")]
    pub warning: u32,
    #[serde(deserialize_with = "hex_color")]
    pub error: u32,
}

impl Default for EmbedColors {
    fn default() -> Self {
        Self {
            info: 0x5865F2,
            success: 0x23A55A,
            warning: 0xF0B232,
            error: 0xF23F43,
        }
    }
}

impl EmbedColors {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Info => self.info,
            Severity::Success => self.success,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        }
    }
}

fn hex_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let digits = raw.trim_start_matches('#');
    u32::from_str_radix(digits, 16)
        .ok()
        .filter(|_| digits.len() == 6)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid color `{}`", raw)))
}

/// Execution-time thresholds used by the dispatcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Commands running at least this long get a warning reply.
    #[serde(with = "humantime_serde")]
    pub slow_command_threshold: Duration,
    /// Commands that are expected to run long, by name. Once a listed command has run for
    /// its duration, the slow warning no longer applies.
    pub patient_commands: HashMap<String, humantime_serde::Serde<Duration>>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        // the filters menu waits on a 60 second component collector
        let patient_commands = HashMap::from([(
            "filters".to_string(),
            humantime_serde::Serde::from(Duration::from_secs(55)),
        )]);

        Self {
            slow_command_threshold: Duration::from_secs(20),
            patient_commands,
        }
    }
}

impl DispatchOptions {
    pub fn patient_after(&self, command: &str) -> Option<Duration> {
        self.patient_commands
            .get(command)
            .map(|duration| **duration)
    }
}
