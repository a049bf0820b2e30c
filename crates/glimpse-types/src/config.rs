use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{GlimpseError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    /// JPEG quality, 1..=100. 50 is the "medium" level.
    pub quality: u8,
    /// Directory for redacted side files; `None` disables them.
    pub diagnostics_dir: Option<String>,
    pub adb_serial: Option<String>,
    pub adb_path: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            quality: 50,
            diagnostics_dir: None,
            adb_serial: None,
            adb_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub buffering_mode: bool,
    pub cycle_interval_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffering_mode: false,
            cycle_interval_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub verbose_diagnostics: bool,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            verbose_diagnostics: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlimpseConfig {
    pub capture: CaptureConfig,
    pub buffer: BufferConfig,
    pub ops: OpsConfig,
}

impl GlimpseConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            GlimpseError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            GlimpseError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.interval_ms == 0 {
            return Err(GlimpseError::Configuration(
                "capture.interval_ms must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.capture.quality) {
            return Err(GlimpseError::Configuration(
                "capture.quality must be between 1 and 100".into(),
            ));
        }
        if self.buffer.cycle_interval_ms == 0 {
            return Err(GlimpseError::Configuration(
                "buffer.cycle_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_glimpse_config_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("glimpse.toml");
        let config = GlimpseConfig {
            capture: CaptureConfig {
                interval_ms: 500,
                quality: 70,
                diagnostics_dir: Some("captures".into()),
                adb_serial: Some("emulator-5554".into()),
                adb_path: None,
            },
            buffer: BufferConfig {
                buffering_mode: true,
                cycle_interval_ms: 10_000,
            },
            ops: OpsConfig {
                log_level: "debug".into(),
                verbose_diagnostics: true,
            },
        };

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&path, doc).expect("write temp config");

        let loaded = GlimpseConfig::from_file(&path).expect("load config");
        assert_eq!(loaded.capture.interval_ms, 500);
        assert_eq!(loaded.capture.quality, 70);
        assert!(loaded.buffer.buffering_mode);
        assert_eq!(loaded.buffer.cycle_interval_ms, 10_000);
        assert!(loaded.ops.verbose_diagnostics);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let loaded: GlimpseConfig =
            toml::from_str("[buffer]\nbuffering_mode = true\n").expect("parse partial");
        assert!(loaded.buffer.buffering_mode);
        assert_eq!(loaded.buffer.cycle_interval_ms, 30_000);
        assert_eq!(loaded.capture.interval_ms, 1_000);
        assert_eq!(loaded.capture.quality, 50);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = GlimpseConfig::from_file("/nonexistent/glimpse.toml").unwrap_err();
        assert!(matches!(err, GlimpseError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = GlimpseConfig::default();
        assert!(config.validate().is_ok());
        config.capture.interval_ms = 0;
        assert!(config.validate().is_err());
        config.capture.interval_ms = 1_000;
        config.capture.quality = 0;
        assert!(config.validate().is_err());
        config.capture.quality = 101;
        assert!(config.validate().is_err());
        config.capture.quality = 50;
        config.buffer.cycle_interval_ms = 0;
        assert!(config.validate().is_err());
        config.buffer.cycle_interval_ms = 30_000;
        assert!(config.validate().is_ok());
    }
}
