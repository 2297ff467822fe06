//! Configuration system for the relay.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RELAY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/relay/config.toml
//!   3. ~/.config/relay/config.toml
//!
//! The signing secret is never written to the default file; supply it with
//! `SIGNING_SECRET` or add it to the file by hand.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::banner::ProgressStyle;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Shared secret for task signatures.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signing_secret: String,
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub generation: GenerationConfig,
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Externally reachable base URL. Live links are built on it.
    pub public_url: String,
    /// Path of the live answer view under `public_url`.
    pub live_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token. Empty = in-memory transport (nothing reaches Slack).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bot_token: String,
    pub api_base: String,
    /// Texts longer than this are refused locally as too large.
    pub max_text_len: usize,
    /// Per-request timeout for Web API calls.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    /// File holding the system instruction. Missing file = no instruction.
    pub context_path: PathBuf,
    /// Per-request timeout. Bounds how long a lost race keeps a call alive.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub tick_interval_ms: u64,
    pub stage_ms: u64,
    pub bar_width: usize,
    /// Hard deadline for one generation call.
    pub deadline_secs: u64,
    /// How long a terminal write waits for an in-flight progress frame.
    pub stop_grace_ms: u64,
    /// Route answers that arrive after the deadline through the guarded write.
    pub deliver_late_answers: bool,
    /// Recent-events ring buffer size. 0 = disabled.
    pub event_capacity: usize,
    /// Events older than this are evicted. 0 = keep until pushed out.
    pub event_max_age_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            public_url: "http://127.0.0.1:3000".to_string(),
            live_path: "/response.html".to_string(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://slack.com/api".to_string(),
            max_text_len: 40_000,
            timeout_secs: 10,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            context_path: config_dir().join("context.txt"),
            timeout_secs: 120,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            stage_ms: 1500,
            bar_width: 10,
            deadline_secs: 25,
            stop_grace_ms: 2000,
            deliver_late_answers: true,
            event_capacity: 50,
            event_max_age_secs: 3600,
        }
    }
}

impl SlackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl RelaySettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn progress_style(&self) -> ProgressStyle {
        ProgressStyle {
            bar_width: self.bar_width,
            stage_duration: Duration::from_millis(self.stage_ms),
        }
    }

    pub fn event_max_age(&self) -> Option<Duration> {
        (self.event_max_age_secs > 0).then(|| Duration::from_secs(self.event_max_age_secs))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("relay")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("no signing secret: set SIGNING_SECRET or `signing_secret` in {0}")]
    MissingSecret(PathBuf),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RelayConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RELAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RelayConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// The signing secret, or an error naming where to put it.
    pub fn require_secret(&self) -> Result<&str, ConfigError> {
        if self.signing_secret.is_empty() {
            Err(ConfigError::MissingSecret(Self::file_path()))
        } else {
            Ok(&self.signing_secret)
        }
    }

    /// Apply env overrides. `lookup` is `std::env::var` outside tests.
    ///
    /// `BOT_TOKEN`, `SIGNING_SECRET`, `GEMINI_API_KEY` and `PORT` keep the
    /// names the bot has always been deployed with.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SIGNING_SECRET") {
            self.signing_secret = v;
        }
        if let Some(v) = lookup("BOT_TOKEN") {
            self.slack.bot_token = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.generation.api_key = v;
        }
        if let Some(p) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = p;
        }
        if let Some(v) = lookup("RELAY_SERVER__PUBLIC_URL") {
            self.server.public_url = v;
        }
        if let Some(v) = lookup("RELAY_SLACK__API_BASE") {
            self.slack.api_base = v;
        }
        if let Some(v) = lookup("RELAY_GENERATION__MODEL") {
            self.generation.model = v;
        }
        if let Some(s) = lookup("RELAY_RELAY__DEADLINE_SECS").and_then(|v| v.parse().ok()) {
            self.relay.deadline_secs = s;
        }
        if let Some(ms) = lookup("RELAY_RELAY__TICK_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.relay.tick_interval_ms = ms;
        }
    }
}
