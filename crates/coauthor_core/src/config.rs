//! Core configuration.
//!
//! # Responsibility
//! - Collect the tunables a host may override (history depth, retention
//!   ladder, placeholder titles) in one serde-friendly struct.
//!
//! # Invariants
//! - A config returned by `CoreConfig::from_json` has passed `validate`.

use crate::history::profile::{ProfileConfigError, ProfileLadder};
use crate::history::stacks::HistoryLimits;
use crate::reconcile::engine::{ReconcileContext, DEFAULT_PLACEHOLDER_TITLES};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Invalid host-supplied configuration.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Profile(ProfileConfigError),
    /// The in-memory undo stack must hold at least one entry.
    ZeroUndoLimit,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::Profile(err) => write!(f, "{err}"),
            Self::ZeroUndoLimit => write!(f, "history.max_undo must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Profile(err) => Some(err),
            Self::ZeroUndoLimit => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ProfileConfigError> for ConfigError {
    fn from(value: ProfileConfigError) -> Self {
        Self::Profile(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub history: HistoryLimits,
    pub profiles: ProfileLadder,
    /// Lead titles that count as "not named yet".
    pub placeholder_titles: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            history: HistoryLimits::default(),
            profiles: ProfileLadder::default(),
            placeholder_titles: DEFAULT_PLACEHOLDER_TITLES
                .iter()
                .map(|title| (*title).to_string())
                .collect(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config; absent fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_undo == 0 {
            return Err(ConfigError::ZeroUndoLimit);
        }
        self.profiles.validate()?;
        Ok(())
    }

    /// Builds the reconciliation context for one call.
    pub fn reconcile_context(&self, now_ms: i64) -> ReconcileContext {
        ReconcileContext::new(now_ms).with_placeholder_titles(self.placeholder_titles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_json_yields_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.history.max_undo, 50);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = CoreConfig::from_json(
            r#"{"history": {"max_undo": 5, "max_redo": 5}, "placeholder_titles": ["Draft"]}"#,
        )
        .unwrap();
        assert_eq!(config.history.max_undo, 5);
        assert_eq!(config.placeholder_titles, vec!["Draft".to_string()]);
        assert_eq!(config.reconcile_context(9).placeholder_titles, vec!["Draft"]);
    }

    #[test]
    fn invalid_ladder_is_rejected() {
        let mut raw = serde_json::to_value(CoreConfig::default()).unwrap();
        raw["profiles"]["minimal"]["max_messages"] = serde_json::json!(500);
        let err = CoreConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Profile(_)));
    }

    #[test]
    fn zero_undo_limit_is_rejected() {
        let err = CoreConfig::from_json(r#"{"history": {"max_undo": 0, "max_redo": 1}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroUndoLimit));
    }
}
