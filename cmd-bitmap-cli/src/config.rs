//! Configuration loading and parsing

use anyhow::{Context, Result};
use cmd_bitmap::{RenderConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub samples: SamplesConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Command or signal-set JSON file
    pub command: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// HTML output file (stdout when unset)
    pub file: Option<PathBuf>,
    /// Page title
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            title: default_title(),
        }
    }
}

fn default_title() -> String {
    "Command Bit Map".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SamplesConfig {
    /// Directory holding `<command-id>.txt` sample files
    pub dir: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
