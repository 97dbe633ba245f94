use crate::hal::mock::SimulatedHardware;
use crate::hal::PropertyBackend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding the configured backend
pub const BACKEND_ENV: &str = "ADM_BACKEND";

/// Which hardware the tool talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    CoreAudio,
    Simulated,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            BackendKind::CoreAudio
        } else {
            BackendKind::Simulated
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "coreaudio" => Ok(BackendKind::CoreAudio),
            "simulated" => Ok(BackendKind::Simulated),
            other => anyhow::bail!("Unknown backend '{}' (expected coreaudio or simulated)", other),
        }
    }
}

/// Tool configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmConfig {
    pub backend: BackendKind,
    /// JSON fixture for the simulated backend
    pub simulated_devices: Option<PathBuf>,
    /// Minimum width of the device name column
    pub padding: usize,
}

impl Default for AdmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            simulated_devices: None,
            padding: 0,
        }
    }
}

impl AdmConfig {
    /// Apply an explicit backend override (normally from `ADM_BACKEND`)
    pub fn apply_backend_override(&mut self, backend: Option<&str>) -> Result<()> {
        if let Some(value) = backend.filter(|v| !v.trim().is_empty()) {
            self.backend = value
                .parse()
                .with_context(|| format!("Invalid {} value", BACKEND_ENV))?;
        }
        Ok(())
    }

    /// Open the configured hardware backend
    pub fn open_backend(&self) -> Result<Box<dyn PropertyBackend>> {
        match self.backend {
            BackendKind::CoreAudio => open_coreaudio(),
            BackendKind::Simulated => {
                let hardware = match &self.simulated_devices {
                    Some(path) => SimulatedHardware::from_json_file(path)?,
                    None => SimulatedHardware::new(),
                };
                Ok(Box::new(hardware))
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn open_coreaudio() -> Result<Box<dyn PropertyBackend>> {
    Ok(Box::new(crate::hal::drivers::CoreAudioHardware::new()))
}

#[cfg(not(target_os = "macos"))]
fn open_coreaudio() -> Result<Box<dyn PropertyBackend>> {
    anyhow::bail!("The coreaudio backend is only available on macOS; use the simulated backend")
}

/// Loads and stores the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// `~/.adm/config.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".adm")
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Read the configuration; a missing file yields the defaults
    ///
    /// The `ADM_BACKEND` environment variable takes precedence over the file.
    pub fn load(&self) -> Result<AdmConfig> {
        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .with_context(|| format!("Failed to read config file {:?}", self.config_path))?;
            serde_json::from_str(&content).context("Failed to parse config JSON")?
        } else {
            log::debug!("no config at {:?}, using defaults", self.config_path);
            AdmConfig::default()
        };

        config.apply_backend_override(std::env::var(BACKEND_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Write the default configuration unless a file already exists
    ///
    /// Returns whether a file was written.
    pub fn ensure_config_file(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.save(&AdmConfig::default())?;
        Ok(true)
    }

    pub fn save(&self, config: &AdmConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(config)?;

        // Write to temporary file first
        let temp_path = self.config_path.with_extension("tmp");
        fs::write(&temp_path, json).context("Failed to write temporary config file")?;

        fs::rename(&temp_path, &self.config_path)
            .context("Failed to atomically update config file")?;

        Ok(())
    }
}
