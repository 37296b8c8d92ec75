/*
 *  config.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered under command line overrides
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::compose::{Align, Justify};
use crate::coordinator::QuietHours;
use crate::coordinator::quiet::parse_time_of_day;
use crate::model::{DeviceModel, ModelError};
use crate::render::{DEFAULT_PNG_HEIGHT, ImageFormat};
use crate::vbml::VBML_URL;

pub const DEFAULT_POLL_SECS: u64 = 15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    /// where message.txt and the board image are published
    pub output_dir: Option<PathBuf>,
    pub image: Option<ImageConfig>,
    pub vbml_url: Option<String>,
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageConfig {
    pub format: Option<ImageFormat>,
    /// PNG height in pixels
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub id: String,
    pub host: String,
    /// API key, or a one-time enablement token when `enablement_token` is set
    pub api_key: String,
    #[serde(default)]
    pub enablement_token: bool,
    #[serde(default = "default_model")]
    pub model: String,
    pub quiet_start: Option<String>,
    pub quiet_end: Option<String>,
}

fn default_model() -> String {
    "black".to_string()
}

impl BoardConfig {
    pub fn device_model(&self) -> Result<&'static DeviceModel, ConfigError> {
        Ok(DeviceModel::from_name(&self.model)?)
    }

    pub fn quiet_hours(&self) -> Result<Option<QuietHours>, ConfigError> {
        let parse = |field: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|s| {
                    parse_time_of_day(s).map_err(|e| {
                        ConfigError::Validation(format!("board '{}' {} '{}': {}", self.id, field, s, e))
                    })
                })
                .transpose()
        };
        let start = parse("quiet_start", &self.quiet_start)?;
        let end = parse("quiet_end", &self.quiet_end)?;
        if start.is_some() != end.is_some() {
            return Err(ConfigError::Validation(format!(
                "board '{}' needs both quiet_start and quiet_end",
                self.id
            )));
        }
        Ok(QuietHours::from_config(start, end))
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(DEFAULT_POLL_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn image_format(&self) -> ImageFormat {
        self.image.as_ref().and_then(|i| i.format).unwrap_or_default()
    }

    pub fn image_height(&self) -> u32 {
        self.image.as_ref().and_then(|i| i.height).unwrap_or(DEFAULT_PNG_HEIGHT)
    }

    pub fn vbml_url(&self) -> &str {
        self.vbml_url.as_deref().unwrap_or(VBML_URL)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/// CLI overrides and one-shot commands. Options layer over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "vestamon", about = "Vestaboard monitor", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, short = 'd', action = ArgAction::SetTrue)]
    pub debug: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
    /// seconds between polls
    #[arg(long)]
    pub poll_interval: Option<u64>,
    /// send TEXT and exit
    #[arg(long, value_name = "TEXT", conflicts_with = "vbml")]
    pub send: Option<String>,
    /// send a VBML document (YAML or JSON) and exit
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub vbml: Option<PathBuf>,
    /// target board id, repeatable; default is every board
    #[arg(long = "board", value_name = "ID")]
    pub boards: Vec<String>,
    #[arg(long, default_value = "center")]
    pub justify: Justify,
    #[arg(long, default_value = "center")]
    pub align: Align,
    /// show the message for SECS then revert
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

impl Cli {
    /// Whether this run is a one-shot command rather than the monitor.
    pub fn is_one_shot(&self) -> bool {
        self.send.is_some() || self.vbml.is_some()
    }
}

/// Read YAML (explicit path or search), apply CLI overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective config.
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/vestamon/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/vestamon/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/vestamon.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["vestamon.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    Config::from_yaml_str(&s)
}

/// Shallow merge `src` into `dst`, Option-by-Option. A non-empty board list
/// replaces the existing one.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()            { dst.log_level = src.log_level; }
    if src.poll_interval_secs.is_some()   { dst.poll_interval_secs = src.poll_interval_secs; }
    if src.request_timeout_secs.is_some() { dst.request_timeout_secs = src.request_timeout_secs; }
    if src.output_dir.is_some()           { dst.output_dir = src.output_dir; }
    if src.vbml_url.is_some()             { dst.vbml_url = src.vbml_url; }
    match (&mut dst.image, src.image) {
        (None, Some(i)) => dst.image = Some(i),
        (Some(d), Some(s)) => {
            if s.format.is_some() { d.format = s.format; }
            if s.height.is_some() { d.height = s.height; }
        }
        _ => {}
    }
    if !src.boards.is_empty() { dst.boards = src.boards; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()     { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                   { cfg.log_level = Some("debug".to_string()); }
    if cli.output_dir.is_some()    { cfg.output_dir = cli.output_dir.clone(); }
    if cli.poll_interval.is_some() { cfg.poll_interval_secs = cli.poll_interval; }
}

/// Invariants every run relies on.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.boards.is_empty() {
        return Err(ConfigError::Validation("no boards configured".into()));
    }
    if cfg.poll_interval_secs == Some(0) {
        return Err(ConfigError::Validation("poll_interval_secs must be > 0".into()));
    }
    if cfg.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation("request_timeout_secs must be > 0".into()));
    }
    if cfg.image.as_ref().and_then(|i| i.height) == Some(0) {
        return Err(ConfigError::Validation("image height must be > 0".into()));
    }

    let mut ids = HashSet::new();
    let mut hosts = HashSet::new();
    for board in &cfg.boards {
        if board.id.trim().is_empty() {
            return Err(ConfigError::Validation("board id must not be empty".into()));
        }
        if board.host.trim().is_empty() {
            return Err(ConfigError::Validation(format!("board '{}' has no host", board.id)));
        }
        if board.api_key.trim().is_empty() {
            return Err(ConfigError::Validation(format!("board '{}' has no api_key", board.id)));
        }
        if !ids.insert(board.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate board id '{}'", board.id)));
        }
        if !hosts.insert(board.host.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate board host '{}'", board.host)));
        }
        board.device_model()?;
        board.quiet_hours()?;
    }
    Ok(())
}
