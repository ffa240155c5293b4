//! Sync lifecycle events.
//!
//! Background outcomes (zone creation, subscriptions, permission requests) are
//! published here instead of being dropped. Observing is optional.

use crate::model::zone::{DatabaseScope, ZoneIdentity};
use crate::sync::backend::{BackendError, PermissionStatus};
use tokio::sync::broadcast;

/// Default buffered events per receiver.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Result of ensuring change notifications for one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// A subscription with this id was registered.
    Created(String),
    /// The target database already had a subscription.
    AlreadyPresent,
    Failed(BackendError),
}

impl SubscriptionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::AlreadyPresent => "already_present",
            Self::Failed(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ZoneCreated {
        zone: ZoneIdentity,
    },
    ZoneCreationFailed {
        zone: ZoneIdentity,
        error: BackendError,
    },
    NotificationsEnsured {
        zone: ZoneIdentity,
        scope: DatabaseScope,
        outcome: SubscriptionOutcome,
    },
    SubscriptionRemoved {
        scope: DatabaseScope,
        subscription_id: String,
    },
    SubscriptionRemovalFailed {
        scope: DatabaseScope,
        error: BackendError,
    },
    PermissionResolved {
        status: PermissionStatus,
    },
    PermissionFailed {
        error: BackendError,
    },
    CollaboratorAdded {
        identity: String,
        newly_added: bool,
    },
}

/// Broadcast channel for `SyncEvent`s.
#[derive(Debug, Clone)]
pub struct SyncEventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl SyncEventBus {
    /// Creates a bus. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publishes one event. Having no receivers is fine.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
