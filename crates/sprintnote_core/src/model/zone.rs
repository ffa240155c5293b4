//! Sync zone identity and database scope model.
//!
//! # Responsibility
//! - Define the immutable zone identity used to address remote partitions.
//! - Map database scopes to their deterministic subscription ids.
//! - Define the persisted owned-zone setup state.
//!
//! # Invariants
//! - Two `ZoneIdentity` values are equal iff zone name and owner both match.
//! - Subscription ids are stable per scope and never derived from user data.
//! - Setup state string values are stable storage keys.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default zone name shared by every zone in the app.
pub const DEFAULT_ZONE_NAME: &str = "SprintNoteZone";
/// Owner identity that denotes the signed-in user.
pub const CURRENT_USER_SENTINEL: &str = "__defaultOwner__";

/// Subscription id watching the private database.
pub const PRIVATE_SUBSCRIPTION_ID: &str = "privateDBSubscription";
/// Subscription id watching the public database.
pub const PUBLIC_SUBSCRIPTION_ID: &str = "publicDBSubscription";
/// Subscription id watching the shared database.
pub const SHARED_SUBSCRIPTION_ID: &str = "sharedDBSubscription";

/// Named remote partition scoped to one owner identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneIdentity {
    zone_name: String,
    owner_identity: String,
}

impl ZoneIdentity {
    pub fn new(zone_name: impl Into<String>, owner_identity: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            owner_identity: owner_identity.into(),
        }
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn owner_identity(&self) -> &str {
        &self.owner_identity
    }
}

impl Display for ZoneIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.zone_name, self.owner_identity)
    }
}

/// Logical remote database a zone or subscription lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseScope {
    /// Owned by the current user.
    Private,
    /// Owned by a collaborator and shared to the current user.
    Shared,
    /// App-wide database. Not used by zone orchestration.
    Public,
}

impl DatabaseScope {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }

    /// Deterministic subscription id for this scope.
    pub fn subscription_id(self) -> &'static str {
        match self {
            Self::Private => PRIVATE_SUBSCRIPTION_ID,
            Self::Shared => SHARED_SUBSCRIPTION_ID,
            Self::Public => PUBLIC_SUBSCRIPTION_ID,
        }
    }

    /// Numeric scope code carried by inbound database notifications.
    pub fn wire_code(self) -> i64 {
        match self {
            Self::Public => 1,
            Self::Private => 2,
            Self::Shared => 3,
        }
    }

    /// Inverse of [`DatabaseScope::wire_code`].
    pub fn from_wire_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Public),
            2 => Some(Self::Private),
            3 => Some(Self::Shared),
            _ => None,
        }
    }
}

impl Display for DatabaseScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted progress of owned-zone creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneSetupState {
    #[default]
    NotStarted,
    /// Creation was issued but not confirmed. Seen at startup after a crash.
    InProgress,
    Done,
}

impl ZoneSetupState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parses a stored value.
    ///
    /// Accepts the legacy boolean flag representation (`true`/`false`).
    pub fn parse(value: &str) -> Result<Self, ZoneSetupStateError> {
        match value.trim() {
            "not_started" | "false" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "done" | "true" => Ok(Self::Done),
            other => Err(ZoneSetupStateError(other.to_string())),
        }
    }

    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}

/// Unknown persisted setup state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSetupStateError(pub String);

impl Display for ZoneSetupStateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown zone setup state: `{}`", self.0)
    }
}

impl Error for ZoneSetupStateError {}
