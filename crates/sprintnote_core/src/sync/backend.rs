//! Remote sync backend contract.
//!
//! # Responsibility
//! - Describe the zone, subscription and permission primitives the zone
//!   manager drives on the managed cloud backend.
//! - Carry backend failures in one envelope with a retry hint.
//!
//! # Invariants
//! - Implementations never panic; every failure is a `BackendError`.
//! - Subscription ids passed to `save_subscription` are deterministic per
//!   database scope.
//!
//! Record storage, conflict merge, transport and push delivery stay inside
//! the backend and are not modeled here.

use crate::model::zone::{DatabaseScope, ZoneIdentity};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackendResult<T> = Result<T, BackendError>;

/// Backend operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendOperation {
    CreateZone,
    FetchSubscriptions,
    SaveSubscription,
    DeleteSubscription,
    PermissionStatus,
    RequestPermission,
}

impl BackendOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateZone => "create_zone",
            Self::FetchSubscriptions => "fetch_subscriptions",
            Self::SaveSubscription => "save_subscription",
            Self::DeleteSubscription => "delete_subscription",
            Self::PermissionStatus => "permission_status",
            Self::RequestPermission => "request_permission",
        }
    }
}

/// Failure envelope for backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub operation: BackendOperation,
    /// Stable machine-readable code, e.g. `network_unavailable`.
    pub code: String,
    pub message: String,
    /// Whether repeating the same call may succeed.
    pub retryable: bool,
}

impl BackendError {
    pub fn new(
        operation: BackendOperation,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            operation,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed ({}): {}",
            self.operation.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for BackendError {}

/// Subscription registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub subscription_id: String,
    pub scope: DatabaseScope,
    /// Background delivery without a visible alert.
    pub silent_delivery: bool,
}

impl SubscriptionSpec {
    /// Silent all-changes subscription for one database.
    pub fn for_scope(scope: DatabaseScope) -> Self {
        Self {
            subscription_id: scope.subscription_id().to_string(),
            scope,
            silent_delivery: true,
        }
    }
}

/// Discoverability permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    Granted,
    Denied,
    CouldNotComplete,
}

impl PermissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::CouldNotComplete => "could_not_complete",
        }
    }
}

/// Async primitives exposed by the managed cloud backend.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Creates one record zone. Creating an existing zone succeeds.
    async fn create_zone(&self, zone: &ZoneIdentity) -> BackendResult<()>;

    /// Lists subscription ids registered on one database.
    async fn fetch_subscriptions(&self, scope: DatabaseScope) -> BackendResult<Vec<String>>;

    /// Registers one subscription and returns its id.
    async fn save_subscription(&self, spec: &SubscriptionSpec) -> BackendResult<String>;

    /// Deletes one subscription by id and returns the deleted id.
    async fn delete_subscription(
        &self,
        scope: DatabaseScope,
        subscription_id: &str,
    ) -> BackendResult<String>;

    async fn permission_status(&self) -> BackendResult<PermissionStatus>;

    /// Prompts for discoverability and returns the resulting state.
    async fn request_permission(&self) -> BackendResult<PermissionStatus>;
}
