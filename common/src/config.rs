// Configuration management with layered configuration (file, env)

use crate::clock::WallClockZone;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reminder: ReminderSettings,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// How often the polling loop compares the clock against schedules
    pub check_interval_seconds: u64,
    /// Half-width of the match window around each scheduled minute
    pub tolerance_minutes: u16,
    pub max_log_entries: usize,
    pub snooze_minutes: u64,
    /// Seed demo regimens from the catalog when no schedules are stored
    pub seed_examples: bool,
    /// IANA zone name; absent means the host's local zone
    pub timezone: Option<String>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            check_interval_seconds: 30,
            tolerance_minutes: 1,
            max_log_entries: 100,
            snooze_minutes: 5,
            seed_examples: true,
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON export of the dispenser's medicines; absent means the demo catalog
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub pin: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pin: "1234".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
            metrics_port: None,
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        let reminder = &self.reminder;

        if reminder.check_interval_seconds == 0 {
            return Err("Reminder check_interval_seconds must be greater than 0".to_string());
        }

        // A reminder matches for (2 * tolerance + 1) distinct minutes. Polling
        // less often than that can skip a reminder for the whole day.
        let window_seconds = (2 * u64::from(reminder.tolerance_minutes) + 1) * 60;
        if reminder.check_interval_seconds > window_seconds {
            return Err(format!(
                "Reminder check_interval_seconds ({}) exceeds the {}s match window",
                reminder.check_interval_seconds, window_seconds
            ));
        }

        if reminder.max_log_entries == 0 {
            return Err("Reminder max_log_entries must be greater than 0".to_string());
        }

        if reminder.snooze_minutes == 0 {
            return Err("Reminder snooze_minutes must be greater than 0".to_string());
        }

        WallClockZone::from_setting(reminder.timezone.as_deref())?;

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err("Storage data_dir cannot be empty".to_string());
        }

        if self.auth.pin.len() != crate::auth::PIN_LENGTH
            || !self.auth.pin.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format!(
                "Auth pin must be exactly {} digits",
                crate::auth::PIN_LENGTH
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_zero_interval() {
        let mut settings = Settings::default();
        settings.reminder.check_interval_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_interval_longer_than_window() {
        let mut settings = Settings::default();
        settings.reminder.tolerance_minutes = 0;
        settings.reminder.check_interval_seconds = 61;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_log_cap() {
        let mut settings = Settings::default();
        settings.reminder.max_log_entries = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_pin() {
        let mut settings = Settings::default();
        settings.auth.pin = "12ab".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_unknown_timezone() {
        let mut settings = Settings::default();
        settings.reminder.timezone = Some("Not/AZone".to_string());
        assert!(settings.validate().is_err());
    }
}
