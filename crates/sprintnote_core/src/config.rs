//! Sync configuration.
//!
//! # Responsibility
//! - Hold the values the zone manager needs at startup: zone name,
//!   current-user identity, storage locations, retry policy.
//! - Resolve environment overrides.
//!
//! # Invariants
//! - `validate()` must pass before a manager is started.
//! - Storage paths always live under `app_support_dir`.

use crate::model::zone::{ZoneIdentity, CURRENT_USER_SENTINEL, DEFAULT_ZONE_NAME};
use crate::repo::collaborator_repo::COLLABORATORS_FILE_NAME;
use crate::sync::events::DEFAULT_EVENT_CAPACITY;
use crate::sync::retry::RetryPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Application directory name under the platform data directory.
pub const APP_DIR_NAME: &str = "sprintnote";
/// Preference database file name.
pub const PREFERENCES_FILE_NAME: &str = "preferences.sqlite3";

/// Overrides the application-support directory.
pub const ENV_APP_SUPPORT_DIR: &str = "SPRINTNOTE_APP_SUPPORT_DIR";
/// Overrides the current-user owner identity.
pub const ENV_CURRENT_USER: &str = "SPRINTNOTE_CURRENT_USER";
/// Overrides the zone name.
pub const ENV_ZONE_NAME: &str = "SPRINTNOTE_ZONE_NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub zone_name: String,
    /// Owner identity that marks zones as owned by the signed-in user.
    pub current_user: String,
    pub app_support_dir: PathBuf,
    pub collaborators_file_name: String,
    pub preferences_file_name: String,
    pub retry: RetryPolicy,
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::for_dir(default_app_support_dir())
    }
}

impl SyncConfig {
    /// Default values rooted at `app_support_dir`.
    pub fn for_dir(app_support_dir: impl Into<PathBuf>) -> Self {
        Self {
            zone_name: DEFAULT_ZONE_NAME.to_string(),
            current_user: CURRENT_USER_SENTINEL.to_string(),
            app_support_dir: app_support_dir.into(),
            collaborators_file_name: COLLABORATORS_FILE_NAME.to_string(),
            preferences_file_name: PREFERENCES_FILE_NAME.to_string(),
            retry: RetryPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup`. Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = match read(ENV_APP_SUPPORT_DIR) {
            Some(dir) => Self::for_dir(dir),
            None => Self::default(),
        };
        if let Some(user) = read(ENV_CURRENT_USER) {
            config.current_user = user;
        }
        if let Some(zone_name) = read(ENV_ZONE_NAME) {
            config.zone_name = zone_name;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone_name.trim().is_empty() {
            return Err(ConfigError::EmptyZoneName);
        }
        if self.current_user.trim().is_empty() {
            return Err(ConfigError::EmptyCurrentUser);
        }
        if self.collaborators_file_name.trim().is_empty()
            || self.preferences_file_name.trim().is_empty()
        {
            return Err(ConfigError::EmptyFileName);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(())
    }

    /// Zone owned by the current user.
    pub fn owned_zone(&self) -> ZoneIdentity {
        ZoneIdentity::new(self.zone_name.clone(), self.current_user.clone())
    }

    /// Zone owned by one collaborator.
    pub fn collaborator_zone(&self, identity: &str) -> ZoneIdentity {
        ZoneIdentity::new(self.zone_name.clone(), identity)
    }

    pub fn collaborators_path(&self) -> PathBuf {
        self.app_support_dir.join(&self.collaborators_file_name)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.app_support_dir.join(&self.preferences_file_name)
    }
}

/// Platform data directory joined with the app directory name.
///
/// Falls back to the temp directory when the platform reports none.
pub fn default_app_support_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyZoneName,
    EmptyCurrentUser,
    EmptyFileName,
    ZeroEventCapacity,
    ZeroRetryAttempts,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyZoneName => write!(f, "zone name must not be empty"),
            Self::EmptyCurrentUser => write!(f, "current user identity must not be empty"),
            Self::EmptyFileName => write!(f, "storage file names must not be empty"),
            Self::ZeroEventCapacity => write!(f, "event capacity must be at least 1"),
            Self::ZeroRetryAttempts => write!(f, "retry policy needs at least one attempt"),
        }
    }
}

impl Error for ConfigError {}
