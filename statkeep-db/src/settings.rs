//! Connection settings for the statistics database.
//!
//! The host process keeps these under a `[database]` table in its
//! `settings.toml`; [`DbSettings::from_toml_str`] reads that table and
//! falls back to defaults for everything but the database path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Upper bound on how long a liveness probe may wait on a busy handle.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed settings file: {0}")]
    Malformed(#[from] toml::de::Error),
    #[error("Missing [database] table or `path` key")]
    MissingPath,
}

/// Cool-down schedule between reconnect attempts against a dead store.
///
/// Each consecutive failed attempt doubles the wait, capped at
/// `max_delay`. While the cool-down is running no fresh connect is
/// attempted; callers keep getting degraded results instead of
/// hot-looping against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// A policy with no cool-down at all. Every failed statement retries
    /// the connect immediately; useful in tests and throwaway tools.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before the next connect attempt after `failures` consecutive
    /// failed ones.
    pub fn cooldown(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Everything needed to open (and re-open) the statistics database.
#[derive(Debug, Clone)]
pub struct DbSettings {
    /// Path to the database file. May live on a network share; the
    /// connection manager treats it as unreliable either way.
    pub path: PathBuf,
    /// Gates verbose failure diagnostics in the logs.
    pub debug: bool,
    pub reconnect: ReconnectPolicy,
}

impl DbSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debug: false,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Read the `[database]` table from a settings file on disk.
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Read the `[database]` table from TOML text.
    ///
    /// Only `path` is required; `debug` and the `[database.reconnect]`
    /// delays fall back to defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let doc: toml::Value = contents.parse()?;
        let db = doc.get("database").ok_or(SettingsError::MissingPath)?;
        let path = db
            .get("path")
            .and_then(|v| v.as_str())
            .filter(|p| !p.is_empty())
            .ok_or(SettingsError::MissingPath)?;
        let debug = db.get("debug").and_then(|v| v.as_bool()).unwrap_or(false);

        let mut reconnect = ReconnectPolicy::default();
        if let Some(r) = db.get("reconnect") {
            if let Some(ms) = r.get("base_delay_ms").and_then(|v| v.as_integer()) {
                reconnect.base_delay = Duration::from_millis(ms.max(0) as u64);
            }
            if let Some(ms) = r.get("max_delay_ms").and_then(|v| v.as_integer()) {
                reconnect.max_delay = Duration::from_millis(ms.max(0) as u64);
            }
        }

        Ok(Self {
            path: PathBuf::from(path),
            debug,
            reconnect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_table() {
        let settings = DbSettings::from_toml_str(
            r#"
            [database]
            path = "stats.db"
            debug = true

            [database.reconnect]
            base_delay_ms = 100
            max_delay_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(settings.path, PathBuf::from("stats.db"));
        assert!(settings.debug);
        assert_eq!(settings.reconnect.base_delay, Duration::from_millis(100));
        assert_eq!(settings.reconnect.max_delay, Duration::from_millis(2000));
    }

    #[test]
    fn path_is_required() {
        assert!(matches!(
            DbSettings::from_toml_str("[database]\ndebug = true\n"),
            Err(SettingsError::MissingPath)
        ));
        assert!(matches!(
            DbSettings::from_toml_str("[other]\nx = 1\n"),
            Err(SettingsError::MissingPath)
        ));
    }

    #[test]
    fn cooldown_doubles_up_to_cap() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1500),
        };
        assert_eq!(policy.cooldown(1), Duration::from_millis(100));
        assert_eq!(policy.cooldown(2), Duration::from_millis(200));
        assert_eq!(policy.cooldown(3), Duration::from_millis(400));
        assert_eq!(policy.cooldown(5), Duration::from_millis(1500));
        assert_eq!(policy.cooldown(40), Duration::from_millis(1500));
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = ReconnectPolicy::immediate();
        assert_eq!(policy.cooldown(1), Duration::ZERO);
        assert_eq!(policy.cooldown(10), Duration::ZERO);
    }
}
