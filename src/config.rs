//! Shell configuration
//!
//! Read from `calc-desktop.toml` in the app config directory. Every field has a
//! default, so a missing file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// File name looked up inside the app config directory
pub const CONFIG_FILE_NAME: &str = "calc-desktop.toml";

/// Top-level shell configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub window: WindowConfig,
}

/// How to launch and reach the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Executable to launch, resolved on PATH when not absolute
    pub program: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Working directory for the child; inherits the shell's when unset
    pub working_dir: Option<PathBuf>,

    pub host: String,

    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["app.py".to_string()],
            working_dir: None,
            host: "localhost".to_string(),
            port: 5002,
        }
    }
}

impl BackendConfig {
    /// URL the display surface loads
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Endpoint the calculate relay posts to
    pub fn calculate_url(&self) -> String {
        format!("{}/calculate", self.base_url())
    }
}

/// Display surface settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Calc Desktop".to_string(),
            width: 800.0,
            height: 600.0,
        }
    }
}

impl ShellConfig {
    /// Load the config from a directory, falling back to defaults when the file is absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);

        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load the config from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShellConfig = toml::from_str(&content)?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
