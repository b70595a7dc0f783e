//! Ledger runtime configuration.
//!
//! Resolved once at process startup and passed into the store, audit log and
//! gateway constructors; nothing reads the environment during operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use clinicledger_core::UserId;
use clinicledger_events::Actor;
use clinicledger_observability::LogFormat;

pub const ENV_DATA_DIR: &str = "CLINIC_LEDGER_DATA_DIR";
pub const ENV_AUDIT_LOG: &str = "CLINIC_LEDGER_AUDIT_LOG";
pub const ENV_LOG_FORMAT: &str = "CLINIC_LEDGER_LOG_FORMAT";
pub const ENV_LOG_FILTER: &str = "CLINIC_LEDGER_LOG_FILTER";
pub const ENV_USER_ID: &str = "CLINIC_LEDGER_USER_ID";
pub const ENV_USER_NAME: &str = "CLINIC_LEDGER_USER_NAME";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_AUDIT_LOG_NAME: &str = "audit.log";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_USER_ID: &str = "system";
const DEFAULT_USER_NAME: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    data_dir: PathBuf,
    audit_log_path: PathBuf,
    /// Set through `CLINIC_LEDGER_AUDIT_LOG` rather than derived from `data_dir`.
    audit_log_explicit: bool,
    log_format: LogFormat,
    log_filter: String,
    actor: Actor,
}

impl LedgerConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = PathBuf::from(get(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let explicit_audit_log = get(ENV_AUDIT_LOG).map(PathBuf::from);
        let audit_log_explicit = explicit_audit_log.is_some();
        let audit_log_path =
            explicit_audit_log.unwrap_or_else(|| data_dir.join(DEFAULT_AUDIT_LOG_NAME));

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, e.to_string()))?,
            None => LogFormat::default(),
        };

        let log_filter = get(ENV_LOG_FILTER).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let user_id = match get(ENV_USER_ID) {
            Some(raw) => raw
                .parse::<UserId>()
                .map_err(|e| ConfigError::invalid(ENV_USER_ID, e.to_string()))?,
            None => UserId::new(DEFAULT_USER_ID),
        };
        let user_name = get(ENV_USER_NAME).unwrap_or_else(|| DEFAULT_USER_NAME.to_string());

        Ok(Self {
            data_dir,
            audit_log_path,
            audit_log_explicit,
            log_format,
            log_filter,
            actor: Actor::new(user_id, user_name),
        })
    }

    /// Point at another data directory. A derived audit log moves along with
    /// it; an explicitly configured one stays put.
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        if !self.audit_log_explicit {
            self.audit_log_path = data_dir.join(DEFAULT_AUDIT_LOG_NAME);
        }
        self.data_dir = data_dir;
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn audit_log_path(&self) -> &Path {
        &self.audit_log_path
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir(), Path::new("./data"));
        assert_eq!(config.audit_log_path(), Path::new("./data/audit.log"));
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.actor().user_id, UserId::new("system"));
        assert_eq!(config.actor().user_name, "System");
    }

    #[test]
    fn audit_log_follows_data_dir_unless_overridden() {
        let config = LedgerConfig::from_lookup(lookup(&[(ENV_DATA_DIR, "/srv/ledger")])).unwrap();
        assert_eq!(config.audit_log_path(), Path::new("/srv/ledger/audit.log"));

        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/srv/ledger"),
            (ENV_AUDIT_LOG, "/var/log/ledger-audit.log"),
            (ENV_LOG_FORMAT, "Pretty"),
            (ENV_USER_ID, "u-42"),
            (ENV_USER_NAME, "Dr. Okafor"),
        ]))
        .unwrap();
        assert_eq!(config.audit_log_path(), Path::new("/var/log/ledger-audit.log"));
        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert_eq!(config.actor().user_name, "Dr. Okafor");
    }

    #[test]
    fn data_dir_override_moves_the_audit_log() {
        let config = LedgerConfig::from_lookup(lookup(&[(ENV_LOG_FILTER, "debug")]))
            .unwrap()
            .with_data_dir(PathBuf::from("/tmp/ledger"));
        assert_eq!(config.audit_log_path(), Path::new("/tmp/ledger/audit.log"));
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn data_dir_override_keeps_an_explicit_audit_log() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/srv/ledger"),
            (ENV_AUDIT_LOG, "/var/log/ledger-audit.log"),
        ]))
        .unwrap()
        .with_data_dir(PathBuf::from("/tmp/ledger"));
        assert_eq!(config.data_dir(), Path::new("/tmp/ledger"));
        assert_eq!(config.audit_log_path(), Path::new("/var/log/ledger-audit.log"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_LOG_FORMAT, .. }));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = LedgerConfig::from_lookup(lookup(&[(ENV_USER_ID, "   "), (ENV_DATA_DIR, "")])).unwrap();
        assert_eq!(config.actor().user_id, UserId::new("system"));
        assert_eq!(config.data_dir(), Path::new("./data"));
    }
}
