//! Configuration file for the hci-usb binary

use crate::factory::{BackendKind, parse_backend_choice};
use anyhow::{Context, Result, anyhow};
use common::UsbParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
    /// Backend to use (usb, native, auto); platform default when unset
    #[serde(default)]
    pub backend: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            backend: None,
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Controller selection
///
/// Fields set here act as explicit bind parameters and override the
/// `BLUETOOTH_HCI_SOCKET_USB_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbSettings {
    /// 1-based index among controllers matching vid/pid
    #[serde(default)]
    pub dev_id: i32,
    #[serde(default)]
    pub vid: Option<u16>,
    #[serde(default)]
    pub pid: Option<u16>,
    #[serde(default)]
    pub bus: Option<u8>,
    #[serde(default)]
    pub address: Option<u8>,
}

impl UsbSettings {
    pub fn params(&self) -> UsbParams {
        UsbParams {
            vid: self.vid,
            pid: self.pid,
            bus: self.bus,
            address: self.address,
        }
    }
}

impl AppConfig {
    /// Load configuration from the given path, or the default path if none
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(anyhow!("No configuration file found, using defaults"));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("{}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("hci-usb").join("config.toml")
        } else {
            PathBuf::from(".config/hci-usb/config.toml")
        }
    }

    /// Backend named in the file, `None` when unset or `auto`
    pub fn backend(&self) -> Result<Option<BackendKind>> {
        match self.general.backend.as_deref() {
            Some(name) => parse_backend_choice(name).map_err(|e| anyhow!(e)),
            None => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        self.backend()?;

        if self.usb.bus.is_some() != self.usb.address.is_some() {
            return Err(anyhow!("usb.bus and usb.address must be set together"));
        }

        Ok(())
    }
}
