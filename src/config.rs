//! Configuration
//!
//! Layering, lowest to highest precedence:
//! 1. built-in defaults
//! 2. TOML file (`--config` or `<config dir>/datafile-portal/config.toml`)
//! 3. environment variables (`DFP_*`)
//! 4. command-line flags (applied by the binary)

use crate::error::{Error, Result};
use crate::history::MatchMode;
use crate::poll::PollConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "DFP_SERVER_URL";
/// Environment variable holding the API token
pub const ENV_TOKEN: &str = "DFP_TOKEN";
/// Environment variable overriding `poll.max_attempts`
pub const ENV_POLL_MAX_ATTEMPTS: &str = "DFP_POLL_MAX_ATTEMPTS";
/// Environment variable overriding `poll.interval_ms`
pub const ENV_POLL_INTERVAL_MS: &str = "DFP_POLL_INTERVAL_MS";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the data file API
    pub server_url: Option<String>,
    /// Bearer token forwarded with every request
    pub token: Option<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Status polling
    pub poll: PollSettings,
    /// Submission history display
    pub history: HistorySettings,
}

/// Status polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Status fetches before giving up with `TimedOut`
    pub max_attempts: u32,
    /// Delay between fetches in milliseconds
    pub interval_ms: u64,
}

/// History display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Match sections by substring of the raw label (legacy servers)
    pub legacy_substring_match: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll: PollSettings::default(),
            history: HistorySettings::default(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_ms: 10_000,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("datafile-portal").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from `path`, or from the default location
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Loaded config from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("cannot read {}: {e}", path.display()))),
        }
    }

    /// Apply `DFP_*` overrides read through `lookup`
    ///
    /// Pass `|key| std::env::var(key).ok()` for the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(value) = lookup(ENV_POLL_MAX_ATTEMPTS) {
            self.poll.max_attempts = value
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_POLL_MAX_ATTEMPTS}: not a number: {value}")))?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll.interval_ms = value
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_POLL_INTERVAL_MS}: not a number: {value}")))?;
        }
        Ok(())
    }

    /// The configured server URL, validated
    pub fn require_server_url(&self) -> Result<Url> {
        let raw = self.server_url.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "no server URL configured. Use --server, set {ENV_SERVER_URL}, or add server_url to the config file"
            ))
        })?;

        let url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid server URL {raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::Config(format!("unsupported URL scheme: {other}"))),
        }
    }

    /// Poller settings
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.poll.max_attempts,
            Duration::from_millis(self.poll.interval_ms),
        )
    }

    /// How history buckets match record sections
    pub const fn match_mode(&self) -> MatchMode {
        if self.history.legacy_substring_match {
            MatchMode::LegacySubstring
        } else {
            MatchMode::Exact
        }
    }
}
