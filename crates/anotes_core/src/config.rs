use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::bridge::{DEFAULT_OSASCRIPT, DEFAULT_TIMEOUT_MS, Osascript};

pub const CONFIG_ENV: &str = "ANOTES_CONFIG";
pub const TIMEOUT_ENV: &str = "ANOTES_TIMEOUT_MS";
pub const OSASCRIPT_ENV: &str = "ANOTES_OSASCRIPT";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AnotesConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BridgeSection {
    pub timeout_ms: Option<u64>,
    pub osascript: Option<String>,
}

/// Per-invocation overrides taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct BridgeOverrides {
    pub timeout_ms: Option<u64>,
}

impl AnotesConfig {
    /// Resolve the bridge timeout: flag > env ANOTES_TIMEOUT_MS > config > default.
    pub fn timeout_ms(&self, overrides: &BridgeOverrides) -> Result<u64> {
        let timeout = match overrides.timeout_ms {
            Some(value) => value,
            None => match env_value(TIMEOUT_ENV) {
                Some(raw) => parse_timeout(&raw)
                    .with_context(|| format!("invalid {TIMEOUT_ENV}"))?,
                None => self.bridge.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            },
        };
        if timeout == 0 {
            bail!("bridge timeout must be greater than zero");
        }
        Ok(timeout)
    }

    /// Resolve the bridge binary: env ANOTES_OSASCRIPT > config > `osascript`.
    pub fn osascript_binary(&self) -> String {
        if let Some(value) = env_value(OSASCRIPT_ENV) {
            return value;
        }
        self.bridge
            .osascript
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_OSASCRIPT)
            .to_string()
    }

    pub fn runner(&self, overrides: &BridgeOverrides) -> Result<Osascript> {
        let timeout_ms = self.timeout_ms(overrides)?;
        Ok(Osascript::new(
            self.osascript_binary(),
            Duration::from_millis(timeout_ms),
        ))
    }
}

fn env_value(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_timeout(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("\"{value}\" is not a number of milliseconds"))
}

/// `$XDG_CONFIG_HOME/anotes/config.toml`, falling back to `~/.config/anotes/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = env_value("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("anotes").join("config.toml"));
    }
    env_value("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("anotes")
            .join("config.toml")
    })
}

/// Pick the config file: flag > env ANOTES_CONFIG > default location.
pub fn resolve_config_path(flag: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_value(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    default_config_path()
}

/// Load and parse an AnotesConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<AnotesConfig> {
    if !config_path.exists() {
        return Ok(AnotesConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: AnotesConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
