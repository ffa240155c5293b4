//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level sync helpers to Dart via FRB.
//! - Keep error semantics simple: strings and empty collections, no throws.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Return values are UTF-8 strings with stable meaning.
//! - Zone orchestration itself runs in the host app through
//!   `SyncZoneManager`; nothing here talks to the cloud backend.

use log::warn;
use sprintnote_core::{
    core_version as core_version_inner, database_scope_for, init_logging as init_logging_inner,
    ping as ping_inner, resolve_notification_scope_json, CollaboratorRepository,
    FileCollaboratorRepository, SyncConfig,
};

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Classifies a remote push payload (JSON object text) by database.
///
/// Returns `private|shared|public`, or `unrecognized` for anything that is
/// not a database notification, including malformed JSON.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn notification_scope(payload_json: String) -> String {
    resolve_notification_scope_json(&payload_json)
        .as_str()
        .to_string()
}

/// Database (`private|shared`) holding the zone owned by `owner`.
///
/// The current-user identity comes from `SPRINTNOTE_CURRENT_USER`, falling
/// back to the default-owner sentinel.
#[flutter_rust_bridge::frb(sync)]
pub fn database_for_owner(owner: String) -> String {
    let config = SyncConfig::from_env();
    let zone = config.collaborator_zone(&owner);
    database_scope_for(&zone, &config.current_user)
        .as_str()
        .to_string()
}

/// Reads persisted collaborator identities under `app_support_dir`, sorted.
///
/// # FFI contract
/// - Sync call, small file read.
/// - Never panics; returns an empty list when the directory is blank or the
///   file is missing or unreadable.
#[flutter_rust_bridge::frb(sync)]
pub fn load_collaborators(app_support_dir: String) -> Vec<String> {
    let dir = app_support_dir.trim();
    if dir.is_empty() {
        return Vec::new();
    }

    match FileCollaboratorRepository::in_dir(dir).load() {
        Ok(set) => set.to_vec(),
        Err(err) => {
            warn!(
                "event=collaborators_load module=ffi status=error error_code=collaborators_unreadable error={}",
                err
            );
            Vec::new()
        }
    }
}
