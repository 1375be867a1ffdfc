use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "DEVFEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// When false the app runs against the bundled sample feed.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_api_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_api_timeout(),
        }
    }
}

fn default_base_url() -> String {
    crate::feed::DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    format!(
        "devfeed/{} (+https://github.com/danielmerja/devfeed)",
        crate::VERSION
    )
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            tick_interval: default_tick_interval(),
            scroll: ScrollConfig::default(),
            pulse: PulseConfig::default(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(120)
}

/// Offsets are in scroll units (one wheel notch = `wheel_step` units), matching
/// the point-based thresholds the chrome fade was tuned against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrollConfig {
    #[serde(default = "default_chrome_fade_start")]
    pub chrome_fade_start: f32,
    #[serde(default = "default_chrome_fade_end")]
    pub chrome_fade_end: f32,
    #[serde(default = "default_top_button_start")]
    pub top_button_start: f32,
    #[serde(default = "default_top_button_end")]
    pub top_button_end: f32,
    #[serde(default = "default_wheel_step")]
    pub wheel_step: f32,
    #[serde(default = "default_coalesce_interval", with = "humantime_serde")]
    pub coalesce_interval: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            chrome_fade_start: default_chrome_fade_start(),
            chrome_fade_end: default_chrome_fade_end(),
            top_button_start: default_top_button_start(),
            top_button_end: default_top_button_end(),
            wheel_step: default_wheel_step(),
            coalesce_interval: default_coalesce_interval(),
        }
    }
}

fn default_chrome_fade_start() -> f32 {
    0.0
}

fn default_chrome_fade_end() -> f32 {
    200.0
}

fn default_top_button_start() -> f32 {
    300.0
}

fn default_top_button_end() -> f32 {
    500.0
}

fn default_wheel_step() -> f32 {
    40.0
}

fn default_coalesce_interval() -> Duration {
    Duration::from_millis(16)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PulseConfig {
    #[serde(default = "default_like_peak")]
    pub like_peak: f32,
    #[serde(default = "default_comment_peak")]
    pub comment_peak: f32,
    /// Grow duration; the shrink leg takes twice this long.
    #[serde(default = "default_pulse_grow", with = "humantime_serde")]
    pub grow: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            like_peak: default_like_peak(),
            comment_peak: default_comment_peak(),
            grow: default_pulse_grow(),
        }
    }
}

fn default_like_peak() -> f32 {
    1.1
}

fn default_comment_peak() -> f32 {
    1.2
}

fn default_pulse_grow() -> Duration {
    Duration::from_millis(120)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub path: Option<PathBuf>,
    pub skip_env: bool,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("devfeed").join("config.yaml"))
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let path = options.path.or_else(default_path);
    let mut config = match path {
        Some(ref path) if path.exists() => read_file(path)?,
        _ => Config::default(),
    };
    if !options.skip_env {
        apply_env_overrides(&mut config);
    }
    Ok(config)
}

fn read_file(path: &Path) -> Result<Config> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(value) = env::var(format!("{DEFAULT_ENV_PREFIX}_API_BASE_URL")) {
        if !value.trim().is_empty() {
            config.api.base_url = value;
            config.api.enabled = true;
        }
    }
    if let Ok(value) = env::var(format!("{DEFAULT_ENV_PREFIX}_USER_AGENT")) {
        if !value.trim().is_empty() {
            config.api.user_agent = value;
        }
    }
    if let Ok(value) = env::var(format!("{DEFAULT_ENV_PREFIX}_THEME")) {
        if !value.trim().is_empty() {
            config.ui.theme = value;
        }
    }
}
