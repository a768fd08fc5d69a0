use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "default_disk_path")]
    pub disk_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_cpu_threshold_percent")]
    pub cpu_percent: f64,
    #[serde(default = "default_memory_threshold_percent")]
    pub memory_percent: f64,
    #[serde(default = "default_disk_threshold_percent")]
    pub disk_percent: f64,
    #[serde(default = "default_net_threshold_mb_s")]
    pub net_sent_mb_s: f64,
    #[serde(default = "default_net_threshold_mb_s")]
    pub net_recv_mb_s: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_smtp_timeout_secs")]
    pub smtp_timeout_secs: u64,
    #[serde(default = "default_renotify_cooldown_secs")]
    pub renotify_cooldown_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            hostname: None,
            disk_path: default_disk_path(),
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu_percent: default_cpu_threshold_percent(),
            memory_percent: default_memory_threshold_percent(),
            disk_percent: default_disk_threshold_percent(),
            net_sent_mb_s: default_net_threshold_mb_s(),
            net_recv_mb_s: default_net_threshold_mb_s(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            max_size_mb: default_max_size_mb(),
            backup_count: default_backup_count(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sender: String::new(),
            receiver: String::new(),
            subject: default_subject(),
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password_env: default_password_env(),
            smtp_timeout_secs: default_smtp_timeout_secs(),
            renotify_cooldown_secs: default_renotify_cooldown_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "general.interval_secs must be >= 1".to_string(),
            ));
        }
        if self.general.disk_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "general.disk_path must not be empty".to_string(),
            ));
        }

        validate_thresholds(&self.thresholds)?;
        validate_logging(&self.logging)?;
        validate_email(&self.email)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(cfg: &ThresholdsConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("thresholds.cpu_percent", cfg.cpu_percent),
        ("thresholds.memory_percent", cfg.memory_percent),
        ("thresholds.disk_percent", cfg.disk_percent),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{name} must be in the range 0..100"
            )));
        }
    }
    for (name, value) in [
        ("thresholds.net_sent_mb_s", cfg.net_sent_mb_s),
        ("thresholds.net_recv_mb_s", cfg.net_recv_mb_s),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!("{name} must be >= 0")));
        }
    }
    Ok(())
}

fn validate_logging(cfg: &LoggingConfig) -> Result<(), ConfigError> {
    if cfg.log_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "logging.log_file must not be empty".to_string(),
        ));
    }
    if cfg.max_size_mb < 1 {
        return Err(ConfigError::Validation(
            "logging.max_size_mb must be >= 1".to_string(),
        ));
    }
    if cfg.backup_count < 1 {
        return Err(ConfigError::Validation(
            "logging.backup_count must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(cfg: &EmailConfig) -> Result<(), ConfigError> {
    if cfg.smtp_port == 0 {
        return Err(ConfigError::Validation(
            "email.smtp_port must be in the range 1..65535".to_string(),
        ));
    }
    if cfg.smtp_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "email.smtp_timeout_secs must be >= 1".to_string(),
        ));
    }
    if cfg.renotify_cooldown_secs < 1 {
        return Err(ConfigError::Validation(
            "email.renotify_cooldown_secs must be >= 1".to_string(),
        ));
    }
    if cfg.password_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "email.password_env must not be empty".to_string(),
        ));
    }
    Ok(())
}

const fn default_interval_secs() -> u64 {
    5
}

fn default_disk_path() -> String {
    "/".to_string()
}

const fn default_cpu_threshold_percent() -> f64 {
    85.0
}

const fn default_memory_threshold_percent() -> f64 {
    80.0
}

const fn default_disk_threshold_percent() -> f64 {
    90.0
}

const fn default_net_threshold_mb_s() -> f64 {
    10.0
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/sysmond.log")
}

const fn default_max_size_mb() -> u64 {
    10
}

const fn default_backup_count() -> u32 {
    5
}

fn default_subject() -> String {
    "System Monitor Alert".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_password_env() -> String {
    "EMAIL_PASSWORD".to_string()
}

const fn default_smtp_timeout_secs() -> u64 {
    10
}

const fn default_renotify_cooldown_secs() -> u64 {
    300
}
