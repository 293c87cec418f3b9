use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, time::MinuteOfDay};

const APP_NAME: &str = "roosty_alarm";

const fn default_volume() -> f32 {
    80.0
}

const fn default_snooze_minutes() -> u32 {
    5
}

const fn default_duration_minutes() -> u32 {
    15
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// chrono format used to show alarm times
    pub time_format: String,
    /// 0 - 100
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    /// used when a timed alarm is created without a duration
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
    /// where alarms are saved, the platform data directory if unset
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// refuse to save alarm lists larger than this many bytes
    #[serde(default)]
    pub storage_quota_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%-I:%M %p".to_string(),
            volume: default_volume(),
            snooze_minutes: default_snooze_minutes(),
            default_duration_minutes: default_duration_minutes(),
            storage_dir: None,
            storage_quota_bytes: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// if the file can't be read, isn't valid toml, or has an unusable `time_format`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&config).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// if chrono can't format a time with `time_format`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sample = MinuteOfDay::from(chrono::NaiveTime::MIN);
        match sample.try_format(&self.time_format) {
            Some(_) => Ok(()),
            None => Err(ConfigError::TimeFormat(self.time_format.clone())),
        }
    }

    /// like [`Config::load`] but a missing file gives the defaults
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// # Errors
    /// if the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, config).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
        directories::ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoProjectDirs)
    }

    /// # Errors
    /// if there is no home directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// the directory alarms are saved in
    ///
    /// # Errors
    /// if none is configured and there is no home directory
    pub fn storage_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = toml::from_str(r#"time_format = "%H:%M""#).unwrap();
        assert_eq!(config.time_format, "%H:%M");
        assert_eq!(config.snooze_minutes, 5);
        assert_eq!(config.default_duration_minutes, 15);
        assert!((config.volume - 80.0).abs() < f32::EPSILON);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn saves_and_loads() {
        let dir = std::env::temp_dir().join(format!("roosty_alarm_config_{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let config = Config {
            snooze_minutes: 9,
            storage_dir: Some(dir.join("data")),
            storage_quota_bytes: Some(4096),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
        assert_eq!(config.storage_dir().unwrap(), dir.join("data"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_gives_defaults_but_broken_file_errors() {
        let dir = std::env::temp_dir().join(format!("roosty_alarm_broken_{}", std::process::id()));
        let path = dir.join("config.toml");
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "time_format = ").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unusable_time_format_is_rejected() {
        let dir = std::env::temp_dir().join(format!("roosty_alarm_format_{}", std::process::id()));
        let path = dir.join("config.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, r#"time_format = "%Q""#).unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::TimeFormat(format)) if format == "%Q"
        ));
        assert!(Config::default().validate().is_ok());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
