//! Harness configuration
//!
//! Optional TOML file with defaults for the window flags, the EGL context,
//! the pointer cursor and logging. Command-line flags are applied on top.
//!
//! ```toml
//! [window]
//! opaque = true
//!
//! [egl]
//! context_client_version = 3
//!
//! [cursor]
//! theme = "Adwaita"
//! size = 48
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HarnessConfig {
    /// Initial window flags
    #[serde(default)]
    pub window: WindowConfig,

    /// EGL context settings
    #[serde(default)]
    pub egl: EglConfig,

    /// Pointer cursor appearance
    #[serde(default)]
    pub cursor: CursorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    pub fullscreen: bool,
    pub maximized: bool,
    pub opaque: bool,
    /// Sync swaps to the compositor's redraw; `false` sets swap interval 0
    pub frame_sync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            maximized: false,
            opaque: false,
            frame_sync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EglConfig {
    /// OpenGL ES major version requested for the context (2 or 3)
    pub context_client_version: i32,

    /// Swap interval used when frame sync is off
    pub swap_interval_when_unsynced: i32,
}

impl Default for EglConfig {
    fn default() -> Self {
        Self {
            context_client_version: 2,
            swap_interval_when_unsynced: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CursorConfig {
    /// Cursor theme name; `XCURSOR_THEME` or the default theme when unset
    pub theme: Option<String>,

    /// Cursor size in pixels
    pub size: u32,

    /// Cursor image shown over the window
    pub name: String,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            theme: None,
            size: 32,
            name: "left_ptr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Expands a leading `~` to `$HOME`
fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl HarnessConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_home(path.as_ref())?;

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: HarnessConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.egl.context_client_version, 2 | 3) {
            anyhow::bail!(
                "Invalid context_client_version {}: must be 2 or 3",
                self.egl.context_client_version
            );
        }

        if self.egl.swap_interval_when_unsynced < 0 {
            anyhow::bail!("Invalid swap_interval_when_unsynced: must not be negative");
        }

        if self.cursor.size == 0 || self.cursor.size > 256 {
            anyhow::bail!("Invalid cursor size {}: must be between 1 and 256", self.cursor.size);
        }

        if self.cursor.name.is_empty() {
            anyhow::bail!("Invalid cursor name: must not be empty");
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}


#[cfg(test)]
mod property_tests;
