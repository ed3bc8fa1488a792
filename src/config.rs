use std::fs;
use std::time::Duration;
use chrono::{FixedOffset, Offset, Utc};
use log::LevelFilter;
use serde::Deserialize;
use crate::errors::ConfigError;
use crate::retry::RetryPolicy;

#[derive(Deserialize, Clone)]
pub struct Api {
    pub webhook_url: String,
    pub qweather_key: String,
    pub api_host: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Deserialize, Clone)]
pub struct Location {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub daily_push_hour: u32,
    pub daily_push_minute: u32,
    pub check_interval_minutes: u32,
    pub rain_threshold_precip: f64,
    #[serde(default)]
    pub rain_threshold_pop: u8,
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
}

#[derive(Deserialize, Clone)]
pub struct Retry {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self { max_attempts: 5, delay_secs: 3 }
    }
}

/// Keyword sets matched against the provider's free text condition fields.
/// The defaults assume the provider is queried with `lang = "en"`.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Keywords {
    pub rain: Vec<String>,
    pub severe: Vec<String>,
    pub severe_rain: Vec<String>,
    pub rain_marker: String,
}

impl Default for Keywords {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<String>>();

        Self {
            rain: owned(&["shower", "moderate rain", "heavy rain", "rainstorm", "extreme rainfall"]),
            severe: owned(&["hail", "typhoon", "snow", "blizzard", "heavy snow", "sandstorm",
                "fog", "haze", "freezing rain", "sleet"]),
            severe_rain: owned(&["moderate rain", "heavy rain", "rainstorm", "extreme rainfall"]),
            rain_marker: "rain".to_string(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    #[serde(default = "default_log_max_bytes")]
    pub log_max_bytes: u64,
    #[serde(default = "default_log_backups")]
    pub log_backups: u32,
}

#[derive(Deserialize, Clone)]
pub struct Config {
    pub api: Api,
    pub location: Location,
    pub settings: Settings,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub keywords: Keywords,
    pub general: General,
}

impl Config {
    /// Returns the fixed offset all wall clock decisions are made in
    pub fn timezone(&self) -> FixedOffset {
        // Range checked in validate
        FixedOffset::east_opt(self.settings.utc_offset_hours * 3600)
            .unwrap_or(Utc.fix())
    }

    /// Returns the retry policy used for both forecast fetches and webhook pushes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            delay: Duration::from_secs(self.retry.delay_secs),
        }
    }
}

fn default_lang() -> String { "en".to_string() }
fn default_utc_offset() -> i32 { 8 }
fn default_log_max_bytes() -> u64 { 1024 * 1024 }
fn default_log_backups() -> u32 { 5 }

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    parse_config(&toml)
}

/// Parses and validates configuration from a TOML document
///
/// # Arguments
///
/// * 'toml' - the configuration document
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml)?;
    validate(&config)?;

    Ok(config)
}

/// Rejects configurations the monitor loop can't run with
///
/// # Arguments
///
/// * 'config' - the configuration to check
fn validate(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("api.webhook_url", &config.api.webhook_url),
        ("api.qweather_key", &config.api.qweather_key),
        ("api.api_host", &config.api.api_host),
        ("location.id", &config.location.id),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(ConfigError(format!("{} must not be empty", name)));
    }

    let s = &config.settings;
    if s.daily_push_hour > 23 {
        return Err(ConfigError(format!("daily_push_hour out of range: {}", s.daily_push_hour)));
    }
    if s.daily_push_minute > 59 {
        return Err(ConfigError(format!("daily_push_minute out of range: {}", s.daily_push_minute)));
    }
    if s.check_interval_minutes == 0 || s.check_interval_minutes > 60 {
        return Err(ConfigError(format!("check_interval_minutes must be 1-60: {}", s.check_interval_minutes)));
    }
    if s.daily_push_minute % s.check_interval_minutes != 0 {
        return Err(ConfigError(format!("daily_push_minute {} is not on a {} minute check boundary",
            s.daily_push_minute, s.check_interval_minutes)));
    }
    if !(-12..=14).contains(&s.utc_offset_hours) {
        return Err(ConfigError(format!("utc_offset_hours out of range: {}", s.utc_offset_hours)));
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::from("retry.max_attempts must be at least 1"));
    }
    if config.general.log_backups == 0 {
        return Err(ConfigError::from("general.log_backups must be at least 1"));
    }

    Ok(())
}
