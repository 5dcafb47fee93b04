use crate::script::{Platform, ScriptOptions};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the NC Python modules are installed on Unix.
pub const DEFAULT_LIB_DIR: &str = "/usr/lib/heekscnc/";

pub const DEFAULT_MACHINE: &str = "nc.iso";

/// Settings new programs start from, remembered between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Python module that turns the script into machine-specific G-code.
    pub machine: String,
    /// File the NC toolchain writes its output to.
    pub output_file: String,
    /// 1.0 for millimetres, 25.4 for inches.
    pub units: f64,
    pub script_lib_dir: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            machine: DEFAULT_MACHINE.to_string(),
            output_file: default_output_file().to_string(),
            units: 1.0,
            script_lib_dir: DEFAULT_LIB_DIR.to_string(),
        }
    }
}

fn default_output_file() -> &'static str {
    if cfg!(windows) {
        "test.tap"
    } else {
        "/tmp/test.tap"
    }
}

impl ProgramConfig {
    /// Load the config from the provided path. A missing file yields the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let config: ProgramConfig =
            serde_json::from_slice(&data).context("deserialize program config")?;
        Ok(config)
    }

    /// Persist the config, creating the parent directory if needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(self).context("serialize program config")?;
        fs::write(path, data).with_context(|| format!("write config {}", path.display()))
    }

    /// The default config path (`~/.camscript/config.json`).
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".camscript").join("config.json"))
    }

    /// Script options for the current platform using the configured library directory.
    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            platform: Platform::current(),
            lib_dir: self.script_lib_dir.clone(),
            ..ScriptOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProgramConfig::default();
        assert_eq!(config.machine, "nc.iso");
        assert_eq!(config.units, 1.0);
        assert_eq!(config.script_lib_dir, "/usr/lib/heekscnc/");
        assert!(config.output_file.ends_with("test.tap"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: ProgramConfig = serde_json::from_str(r#"{"machine": "nc.emc2"}"#).unwrap();
        assert_eq!(config.machine, "nc.emc2");
        assert_eq!(config.units, 1.0);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("camscript-config-{}", ulid::Ulid::new()))
            .join("config.json");
        let config = ProgramConfig {
            units: 25.4,
            ..ProgramConfig::default()
        };
        config.save_to_path(&path).unwrap();
        assert_eq!(ProgramConfig::load_from_path(&path).unwrap(), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
