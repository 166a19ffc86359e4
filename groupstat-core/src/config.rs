//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/groupstat/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/groupstat/` (~/.config/groupstat/)
//! - Data: `$XDG_DATA_HOME/groupstat/` (~/.local/share/groupstat/)
//! - State/Logs: `$XDG_STATE_HOME/groupstat/` (~/.local/state/groupstat/)

use crate::error::{Error, Result};
use crate::history::parse_time_of_day;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Report schedule, thresholds and subscriptions
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// History pagination
    #[serde(default)]
    pub history: HistoryConfig,

    /// OneBot HTTP host
    #[serde(default)]
    pub onebot: OneBotConfig,

    /// Avatar fetch
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Report output
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis settings and subscription list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Times of day (`HH:MM`) at which subscribed groups get a report
    #[serde(default = "default_analysis_times")]
    pub times: Vec<String>,

    /// Minutes of history each report covers
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,

    /// Reports are refused below this many messages
    #[serde(default = "default_minimum_message_count")]
    pub minimum_message_count: usize,

    /// Groups receiving automatic reports
    #[serde(default)]
    pub subscribed_groups: Vec<String>,

    /// Offset from UTC used for hour buckets and times of day
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// How many entries of each ranking get names and avatars
    #[serde(default = "default_ranking_depth")]
    pub ranking_depth: usize,

    /// Extra render attempts after the first one fails
    #[serde(default = "default_render_retries")]
    pub render_retries: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            times: default_analysis_times(),
            duration_minutes: default_duration_minutes(),
            minimum_message_count: default_minimum_message_count(),
            subscribed_groups: vec![],
            utc_offset_minutes: 0,
            ranking_depth: default_ranking_depth(),
            render_retries: default_render_retries(),
        }
    }
}

fn default_analysis_times() -> Vec<String> {
    vec!["23:00".to_string()]
}

fn default_duration_minutes() -> u32 {
    1440
}

fn default_minimum_message_count() -> usize {
    50
}

fn default_ranking_depth() -> usize {
    3
}

fn default_render_retries() -> u32 {
    3
}

impl AnalysisConfig {
    /// Configured UTC offset as a chrono offset.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "analysis.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    /// Whether `group_id` receives automatic reports.
    pub fn is_subscribed(&self, group_id: &str) -> bool {
        self.subscribed_groups.iter().any(|g| g == group_id)
    }

    /// Add a subscription. Returns false if the group was already subscribed.
    pub fn subscribe(&mut self, group_id: &str) -> bool {
        if self.is_subscribed(group_id) {
            return false;
        }
        self.subscribed_groups.push(group_id.to_string());
        true
    }

    /// Remove a subscription. Returns false if the group was not subscribed.
    pub fn unsubscribe(&mut self, group_id: &str) -> bool {
        let before = self.subscribed_groups.len();
        self.subscribed_groups.retain(|g| g != group_id);
        before != self.subscribed_groups.len()
    }
}

/// History pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Initial page size and growth step
    #[serde(default = "default_page_step")]
    pub page_step: usize,

    /// Largest page ever requested
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_step: default_page_step(),
            max_count: default_max_count(),
        }
    }
}

fn default_page_step() -> usize {
    101
}

fn default_max_count() -> usize {
    5050
}

/// OneBot v11 HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneBotConfig {
    /// HTTP API root (e.g., `http://127.0.0.1:3000`)
    #[serde(default = "default_onebot_url")]
    pub base_url: String,

    /// Bearer token, if the host requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_onebot_timeout")]
    pub timeout_secs: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            base_url: default_onebot_url(),
            access_token: None,
            timeout_secs: default_onebot_timeout(),
        }
    }
}

fn default_onebot_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_onebot_timeout() -> u64 {
    10
}

/// Avatar fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// URL with a `{user_id}` placeholder
    #[serde(default = "default_avatar_url")]
    pub url_template: String,

    /// Attempts before giving up on one avatar
    #[serde(default = "default_avatar_retries")]
    pub max_retries: usize,

    /// Pause between attempts
    #[serde(default = "default_avatar_delay")]
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_avatar_timeout")]
    pub timeout_secs: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            url_template: default_avatar_url(),
            max_retries: default_avatar_retries(),
            retry_delay_ms: default_avatar_delay(),
            timeout_secs: default_avatar_timeout(),
        }
    }
}

impl AvatarConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_avatar_url() -> String {
    "http://q1.qlogo.cn/g?b=qq&nk={user_id}&s=100".to_string()
}

fn default_avatar_retries() -> usize {
    3
}

fn default_avatar_delay() -> u64 {
    200
}

fn default_avatar_timeout() -> u64 {
    5
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Title printed at the top of every report
    #[serde(default = "default_report_title")]
    pub title: String,

    /// Where transient chart images are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Where finished reports are saved by the CLI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// TrueType/OpenType font (or collection) for report text; needs CJK
    /// coverage for Chinese names. Unset: first usable system CJK font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            scratch_dir: None,
            output_dir: None,
            font_path: None,
        }
    }
}

impl ReportConfig {
    /// Configured scratch dir or `$XDG_DATA_HOME/groupstat/scratch`
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("scratch"))
    }

    /// Configured output dir or `$XDG_DATA_HOME/groupstat/reports`
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("reports"))
    }
}

fn default_report_title() -> String {
    "Daily Group Chat Summary".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files (default: the XDG state dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Configured directory or `$XDG_STATE_HOME/groupstat`
    pub fn directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(Config::state_dir)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        for time in &self.analysis.times {
            parse_time_of_day(time)
                .map_err(|_| Error::Config(format!("analysis.times has invalid entry {time:?}")))?;
        }
        self.analysis.utc_offset()?;
        if self.history.page_step == 0 {
            return Err(Error::Config(
                "history.page_step must be greater than 0".to_string(),
            ));
        }
        if self.history.max_count < self.history.page_step {
            return Err(Error::Config(
                "history.max_count must be at least history.page_step".to_string(),
            ));
        }
        if !self.avatar.url_template.contains("{user_id}") {
            return Err(Error::Config(
                "avatar.url_template must contain {user_id}".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/groupstat/config.toml` (~/.config/groupstat/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("groupstat").join("config.toml")
    }

    /// Returns the data directory path (scratch images, saved reports)
    ///
    /// `$XDG_DATA_HOME/groupstat/` (~/.local/share/groupstat/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("groupstat")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/groupstat/` (~/.local/state/groupstat/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("groupstat")
    }
}
