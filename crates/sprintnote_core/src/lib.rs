//! Sync core for SprintNote.
//! Owns sync-zone orchestration state; the cloud backend stays behind a trait.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sync;

pub use config::{ConfigError, SyncConfig};
pub use db::{DbError, PreferenceStore};
pub use logging::{
    init_logging, logging_status, start_logging, LogLevel, LogSettings, LoggingError,
};
pub use model::notification::{
    parse_database_notification, resolve_notification_scope, resolve_notification_scope_json,
    DatabaseNotification, NotificationScope,
};
pub use model::record::{parse_record_type, RecordType, RecordTypeError};
pub use model::zone::{DatabaseScope, ZoneIdentity, ZoneSetupState};
pub use repo::collaborator_repo::{
    CollaboratorRepository, CollaboratorSet, FileCollaboratorRepository, RepoError,
};
pub use sync::backend::{
    BackendError, BackendOperation, BackendResult, PermissionStatus, SubscriptionSpec, SyncBackend,
};
pub use sync::events::{SubscriptionOutcome, SyncEvent, SyncEventBus};
pub use sync::memory::InMemoryBackend;
pub use sync::retry::RetryPolicy;
pub use sync::zone_manager::{database_scope_for, SyncError, SyncStores, SyncZoneManager};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
