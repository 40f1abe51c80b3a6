use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT_URL: &str = "https://readwise.io/api/v2/review/";
pub const DEFAULT_REVIEW_URL: &str = "https://readwise.io/dailyreview";

#[derive(Parser, Debug)]
#[command(name = "highlight_overlay")]
#[command(about = "Shows a rotating highlight from your daily review", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".highlight_overlay")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

/// Feature switch and credential for the overlay. Read-only once loaded.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OverlayConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_review_url")]
    pub review_url: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint_url: default_endpoint_url(),
            review_url: default_review_url(),
        }
    }
}

impl OverlayConfig {
    /// The credential, treating an empty or blank value as absent.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_review_url() -> String {
    DEFAULT_REVIEW_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_frame_interval")]
    frame_interval_ms: u64,
    #[serde(default = "default_request_timeout")]
    request_timeout_secs: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_frame_interval() -> u64 {
    16
}

fn default_request_timeout() -> u64 {
    10
}

impl App {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str =
            fs::read_to_string(path).with_context(|| format!("failed to read config file {path}"))?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env).context("invalid config")?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
