//! Inbound push-notification payload parsing.
//!
//! # Responsibility
//! - Decide which database an inbound change notification refers to.
//!
//! # Invariants
//! - Parsing never fails; malformed payloads resolve to `Unrecognized`.
//! - Only database-change payloads (`ck.met.dbs`) are recognized.
//!
//! Expected shape:
//! `{"ck": {"met": {"dbs": 2, "sid": "privateDBSubscription"}}}`

use crate::model::zone::DatabaseScope;
use serde_json::{Map, Value};

const CLOUD_KEY: &str = "ck";
const METADATA_KEY: &str = "met";
const DATABASE_SCOPE_KEY: &str = "dbs";
const SUBSCRIPTION_ID_KEY: &str = "sid";

/// Scope resolution result for one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
    Database(DatabaseScope),
    Unrecognized,
}

impl NotificationScope {
    /// Stable label (`private|shared|public|unrecognized`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database(scope) => scope.as_str(),
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn database(self) -> Option<DatabaseScope> {
        match self {
            Self::Database(scope) => Some(scope),
            Self::Unrecognized => None,
        }
    }
}

/// Decoded database-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseNotification {
    pub scope: DatabaseScope,
    /// Subscription that fired, when the payload carries it.
    pub subscription_id: Option<String>,
}

/// Decodes a database-change notification from a string-keyed payload.
pub fn parse_database_notification(payload: &Map<String, Value>) -> Option<DatabaseNotification> {
    let metadata = payload
        .get(CLOUD_KEY)?
        .as_object()?
        .get(METADATA_KEY)?
        .as_object()?;
    let scope = DatabaseScope::from_wire_code(metadata.get(DATABASE_SCOPE_KEY)?.as_i64()?)?;
    let subscription_id = metadata
        .get(SUBSCRIPTION_ID_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(DatabaseNotification {
        scope,
        subscription_id,
    })
}

/// Resolves the database scope an inbound payload pertains to.
pub fn resolve_notification_scope(payload: &Map<String, Value>) -> NotificationScope {
    match parse_database_notification(payload) {
        Some(notification) => NotificationScope::Database(notification.scope),
        None => NotificationScope::Unrecognized,
    }
}

/// Same as [`resolve_notification_scope`] for raw JSON text.
pub fn resolve_notification_scope_json(payload: &str) -> NotificationScope {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => resolve_notification_scope(&map),
        _ => NotificationScope::Unrecognized,
    }
}
