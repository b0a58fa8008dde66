//! Configuration for the guessing game service.
//!
//! Settings are read from `guess.json` (camelCase keys). Every field is
//! optional, a missing file yields the defaults, and unknown fields are
//! ignored.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "guess.json";

/// Default address to bind the HTTP server to.
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Default HTTP port.
const fn default_port() -> u16 {
    3000
}

/// Default idle time in seconds before a session may be evicted.
const fn default_session_idle_timeout() -> u64 {
    1800
}

/// Default seconds between idle-session sweeps.
const fn default_sweep_interval() -> u64 {
    60
}

/// Main configuration for the guessing game service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How concurrent updates to one player's session are handled.
    #[serde(default)]
    pub consistency: ConsistencyMode,

    /// Seconds a session may sit unchanged before it is evicted.
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout: u64,

    /// Seconds between idle-session sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            consistency: ConsistencyMode::default(),
            session_idle_timeout: default_session_idle_timeout(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `guess.json` in the current directory and falls back to the
    /// defaults when it is absent.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            GameError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `guess.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GameError::ConfigParseError` if the file cannot be read or
    /// holds invalid JSON, and `GameError::ConfigValidationError` if a value
    /// is out of bounds.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(GameError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GameError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `host` must not be empty
    /// - `port` must not be 0
    /// - `sessionIdleTimeout` must be greater than 0
    /// - `sweepInterval` must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GameError::config_validation(
                "host must not be empty",
                "Set host to an address such as 127.0.0.1 in your guess.json",
            ));
        }

        if self.port == 0 {
            return Err(GameError::config_validation(
                "port must not be 0",
                "Set port to a free TCP port in your guess.json or pass --port",
            ));
        }

        if self.session_idle_timeout == 0 {
            return Err(GameError::config_validation(
                "sessionIdleTimeout must be greater than 0",
                "Set sessionIdleTimeout to at least 1 second in your guess.json",
            ));
        }

        if self.sweep_interval == 0 {
            return Err(GameError::config_validation(
                "sweepInterval must be greater than 0",
                "Set sweepInterval to at least 1 second in your guess.json",
            ));
        }

        Ok(())
    }

    /// The `host:port` pair the server should bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout)
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub const fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

/// How the session store handles concurrent updates for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Each read-modify-write holds the player's lock (default).
    #[default]
    Atomic,
    /// Reads and writes are separate steps; a concurrent update can be lost.
    LastWriteWins,
}

impl ConsistencyMode {
    /// Parses a mode name, case-insensitively. Accepts `last-write-wins`
    /// and `last_write_wins` as spellings of `lastWriteWins`.
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "atomic" => Some(Self::Atomic),
            "lastwritewins" => Some(Self::LastWriteWins),
            _ => None,
        }
    }

    /// The name used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::LastWriteWins => "lastWriteWins",
        }
    }
}

impl std::fmt::Display for ConsistencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsistencyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!("invalid consistency mode '{s}': expected 'atomic' or 'lastWriteWins'")
        })
    }
}

impl<'de> Deserialize<'de> for ConsistencyMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Self>().map_err(serde::de::Error::custom)
    }
}

impl Serialize for ConsistencyMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
