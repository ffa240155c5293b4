//! Sync zone and change-subscription orchestration.
//!
//! # Responsibility
//! - Ensure the owned zone exists, at most once across process lifetimes.
//! - Ensure one change subscription per database for the owned zone and every
//!   known collaborator zone.
//! - Persist the collaborator set and react to new collaborators.
//! - Request discoverability permission once per start.
//!
//! # Invariants
//! - Backend failures never escape as errors: they are logged and published
//!   on the event bus.
//! - Enumerate-then-create runs under a per-scope lock, so one process never
//!   creates duplicate subscriptions.
//! - The in-memory collaborator set only changes after the file write
//!   succeeded.
//! - The current-user identity is never a collaborator.
//! - Preference and collaborator-file I/O runs on the blocking pool, never on
//!   a runtime worker.
//! - Setup state is `InProgress` while zone creation is in flight and falls
//!   back to `NotStarted` on failure.

use crate::config::{ConfigError, SyncConfig};
use crate::db::{DbError, PreferenceStore};
use crate::logging::{loggable_error, redact_identity};
use crate::model::notification::{resolve_notification_scope, NotificationScope};
use crate::model::zone::{DatabaseScope, ZoneIdentity, ZoneSetupState};
use crate::repo::collaborator_repo::{
    normalize_identity, CollaboratorRepository, CollaboratorSet, FileCollaboratorRepository,
    RepoError,
};
use crate::sync::backend::{BackendError, PermissionStatus, SubscriptionSpec, SyncBackend};
use crate::sync::events::{SubscriptionOutcome, SyncEvent, SyncEventBus};
use log::{error, info, warn};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, Mutex};
use tokio::task::{JoinHandle, JoinSet};

/// Scopes whose subscriptions are removed on sign-out.
const REMOVABLE_SCOPES: [DatabaseScope; 2] = [DatabaseScope::Private, DatabaseScope::Shared];

/// Errors surfaced to callers of the zone manager.
///
/// Only local failures are reported here; backend failures travel as events.
#[derive(Debug)]
pub enum SyncError {
    Config(ConfigError),
    InvalidIdentity(String),
    Collaborators(RepoError),
    Preferences(DbError),
    /// A blocking storage task panicked or was cancelled.
    BlockingTask(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid sync configuration: {err}"),
            Self::InvalidIdentity(value) => {
                write!(f, "collaborator identity is invalid: `{value}`")
            }
            Self::Collaborators(err) => write!(f, "{err}"),
            Self::Preferences(err) => write!(f, "{err}"),
            Self::BlockingTask(message) => write!(f, "storage task failed: {message}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Collaborators(err) => Some(err),
            Self::Preferences(err) => Some(err),
            Self::InvalidIdentity(_) | Self::BlockingTask(_) => None,
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidIdentity(identity) => Self::InvalidIdentity(identity),
            other => Self::Collaborators(other),
        }
    }
}

impl From<DbError> for SyncError {
    fn from(value: DbError) -> Self {
        Self::Preferences(value)
    }
}

/// Local stores the manager reads at startup and writes on mutation.
pub struct SyncStores {
    pub preferences: PreferenceStore,
    pub collaborators: Box<dyn CollaboratorRepository>,
}

impl SyncStores {
    /// Opens the preference database and collaborator file under the
    /// configured application-support directory.
    pub fn open(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self {
            preferences: PreferenceStore::open(config.preferences_path())?,
            collaborators: Box::new(FileCollaboratorRepository::at_path(
                config.collaborators_path(),
            )),
        })
    }
}

/// Returns `Private` iff `zone` is owned by `current_user`, else `Shared`.
pub fn database_scope_for(zone: &ZoneIdentity, current_user: &str) -> DatabaseScope {
    if zone.owner_identity() == current_user {
        DatabaseScope::Private
    } else {
        DatabaseScope::Shared
    }
}

/// Coordinates local zone/collaborator state with the remote backend.
///
/// Construct once at startup with [`SyncZoneManager::start`] and share the
/// returned `Arc`.
pub struct SyncZoneManager {
    config: SyncConfig,
    backend: Arc<dyn SyncBackend>,
    events: SyncEventBus,
    preferences: Arc<StdMutex<PreferenceStore>>,
    collaborator_repo: Arc<dyn CollaboratorRepository>,
    collaborators: Mutex<CollaboratorSet>,
    zone_setup: Mutex<()>,
    private_scope: Mutex<()>,
    shared_scope: Mutex<()>,
    public_scope: Mutex<()>,
    permission_task: StdMutex<Option<JoinHandle<()>>>,
}

impl SyncZoneManager {
    /// Builds the manager and runs startup orchestration.
    ///
    /// Order: owned zone creation, then notifications for the owned zone and
    /// every persisted collaborator zone (concurrently), then the background
    /// permission request.
    ///
    /// # Errors
    /// - Returns `SyncError::Config` for invalid configuration. Unreadable
    ///   local state is logged and treated as empty instead.
    pub async fn start(
        config: SyncConfig,
        backend: Arc<dyn SyncBackend>,
        stores: SyncStores,
        events: SyncEventBus,
    ) -> Result<Arc<Self>, SyncError> {
        config.validate()?;

        let collaborator_repo: Arc<dyn CollaboratorRepository> = Arc::from(stores.collaborators);
        let repo = Arc::clone(&collaborator_repo);
        let collaborators = match run_blocking(move || repo.load()).await {
            Ok(set) => set,
            Err(err) => {
                error!(
                    "event=collaborators_load module=sync status=error error_code=collaborators_unreadable error={}",
                    loggable_error(&err)
                );
                CollaboratorSet::new()
            }
        };
        if collaborators.contains(&config.current_user) {
            warn!("event=collaborators_load module=sync status=skip reason=current_user_listed");
        }
        info!(
            "event=sync_start module=sync status=start collaborators={} zone={}",
            collaborators.len(),
            config.zone_name
        );

        let manager = Arc::new(Self {
            config,
            backend,
            events,
            preferences: Arc::new(StdMutex::new(stores.preferences)),
            collaborator_repo,
            collaborators: Mutex::new(collaborators),
            zone_setup: Mutex::new(()),
            private_scope: Mutex::new(()),
            shared_scope: Mutex::new(()),
            public_scope: Mutex::new(()),
            permission_task: StdMutex::new(None),
        });

        manager.ensure_owned_zone().await;
        manager.ensure_known_zone_notifications().await;
        manager.spawn_permission_request();

        info!("event=sync_start module=sync status=ok");
        Ok(manager)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn owned_zone(&self) -> ZoneIdentity {
        self.config.owned_zone()
    }

    /// Receives events published after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Snapshot of known collaborator identities.
    pub async fn collaborators(&self) -> CollaboratorSet {
        self.collaborators.lock().await.clone()
    }

    /// Persisted owned-zone setup state.
    pub async fn zone_setup_state(&self) -> Result<ZoneSetupState, SyncError> {
        self.with_preferences(|prefs| prefs.zone_setup_state()).await
    }

    /// Database holding `zone`.
    pub fn resolve_database(&self, zone: &ZoneIdentity) -> DatabaseScope {
        database_scope_for(zone, &self.config.current_user)
    }

    /// Database an inbound push payload refers to.
    pub fn resolve_notification_scope(&self, payload: &Map<String, Value>) -> NotificationScope {
        resolve_notification_scope(payload)
    }

    /// Creates the owned zone unless setup already completed.
    ///
    /// Safe to call again after a failure; returns the resulting state.
    pub async fn retry_owned_zone(&self) -> ZoneSetupState {
        self.ensure_owned_zone().await
    }

    /// Ensures one change subscription exists for the database holding `zone`.
    ///
    /// Never fails; the outcome is also published as
    /// `SyncEvent::NotificationsEnsured`.
    pub async fn ensure_notifications_for(&self, zone: &ZoneIdentity) -> SubscriptionOutcome {
        let scope = self.resolve_database(zone);
        let outcome = {
            let _guard = self.scope_lock(scope).lock().await;
            self.ensure_scope_subscription(scope).await
        };

        match &outcome {
            SubscriptionOutcome::Failed(err) => error!(
                "event=subscription_ensure module=sync status=error scope={} owner={} error_code={} error={}",
                scope,
                redact_identity(zone.owner_identity()),
                err.code,
                loggable_error(err)
            ),
            other => info!(
                "event=subscription_ensure module=sync status={} scope={} owner={}",
                other.status_label(),
                scope,
                redact_identity(zone.owner_identity())
            ),
        }

        self.events.publish(SyncEvent::NotificationsEnsured {
            zone: zone.clone(),
            scope,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Deletes the private and shared subscriptions by their well-known ids.
    ///
    /// Each scope is handled independently; one failure does not stop the
    /// other.
    pub async fn remove_subscriptions(&self) -> Vec<(DatabaseScope, Result<String, BackendError>)> {
        let mut results = Vec::with_capacity(REMOVABLE_SCOPES.len());
        for scope in REMOVABLE_SCOPES {
            let result = {
                let _guard = self.scope_lock(scope).lock().await;
                self.backend
                    .delete_subscription(scope, scope.subscription_id())
                    .await
            };

            match &result {
                Ok(subscription_id) => {
                    info!(
                        "event=subscription_remove module=sync status=ok scope={} subscription_id={}",
                        scope, subscription_id
                    );
                    self.events.publish(SyncEvent::SubscriptionRemoved {
                        scope,
                        subscription_id: subscription_id.clone(),
                    });
                }
                Err(err) => {
                    error!(
                        "event=subscription_remove module=sync status=error scope={} error_code={} error={}",
                        scope,
                        err.code,
                        loggable_error(err)
                    );
                    self.events.publish(SyncEvent::SubscriptionRemovalFailed {
                        scope,
                        error: err.clone(),
                    });
                }
            }
            results.push((scope, result));
        }
        results
    }

    /// Adds one collaborator, persists the set and ensures notifications for
    /// the collaborator's zone.
    ///
    /// # Errors
    /// - `SyncError::InvalidIdentity` for blank identities and for the
    ///   current-user identity.
    /// - `SyncError::Collaborators` when the set cannot be written; the
    ///   in-memory set is left unchanged and no subscription call is made.
    pub async fn add_collaborator(&self, identity: &str) -> Result<SubscriptionOutcome, SyncError> {
        let identity = normalize_identity(identity)?;
        if identity == self.config.current_user {
            warn!("event=collaborator_add module=sync status=rejected reason=current_user");
            return Err(SyncError::InvalidIdentity(identity));
        }

        let newly_added = {
            let mut current = self.collaborators.lock().await;
            let mut next = current.clone();
            let newly_added = next.insert(&identity)?;
            if newly_added {
                let repo = Arc::clone(&self.collaborator_repo);
                let snapshot = next.clone();
                if let Err(err) = run_blocking(move || repo.save(&snapshot)).await {
                    error!(
                        "event=collaborator_add module=sync status=error owner={} error_code=collaborators_write_failed error={}",
                        redact_identity(&identity),
                        loggable_error(&err)
                    );
                    return Err(err);
                }
                *current = next;
            }
            newly_added
        };

        info!(
            "event=collaborator_add module=sync status=ok owner={} newly_added={}",
            redact_identity(&identity),
            newly_added
        );
        self.events.publish(SyncEvent::CollaboratorAdded {
            identity: identity.clone(),
            newly_added,
        });

        let zone = self.config.collaborator_zone(&identity);
        Ok(self.ensure_notifications_for(&zone).await)
    }

    /// Waits for the startup permission request to finish.
    ///
    /// Returns immediately when it already finished or was never started.
    pub async fn wait_for_permission_request(&self) {
        let handle = self.take_permission_task();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!(
                        "event=permission_request module=sync status=error error_code=task_failed error={}",
                        err
                    );
                }
            }
        }
    }

    /// Cancels outstanding background work owned by the manager.
    pub fn shutdown(&self) {
        if let Some(handle) = self.take_permission_task() {
            handle.abort();
        }
        info!("event=sync_shutdown module=sync status=ok");
    }

    async fn ensure_owned_zone(&self) -> ZoneSetupState {
        let _guard = self.zone_setup.lock().await;
        let zone = self.config.owned_zone();

        let state = match self.zone_setup_state().await {
            Ok(state) => state,
            Err(err) => {
                error!(
                    "event=zone_create module=sync status=error error_code=setup_state_unreadable error={}",
                    loggable_error(&err)
                );
                ZoneSetupState::NotStarted
            }
        };
        match state {
            ZoneSetupState::Done => return state,
            ZoneSetupState::InProgress => warn!(
                "event=zone_create module=sync status=resume reason=previous_attempt_unfinished"
            ),
            ZoneSetupState::NotStarted => {}
        }

        self.persist_setup_state(ZoneSetupState::InProgress).await;
        let backend = &self.backend;
        let target = &zone;
        let result = self
            .config
            .retry
            .run("create_zone", move || backend.create_zone(target))
            .await;

        match result {
            Ok(()) => {
                self.persist_setup_state(ZoneSetupState::Done).await;
                info!("event=zone_create module=sync status=ok zone={}", zone.zone_name());
                self.events.publish(SyncEvent::ZoneCreated { zone });
                ZoneSetupState::Done
            }
            Err(err) => {
                self.persist_setup_state(ZoneSetupState::NotStarted).await;
                error!(
                    "event=zone_create module=sync status=error zone={} error_code={} error={}",
                    zone.zone_name(),
                    err.code,
                    loggable_error(&err)
                );
                self.events
                    .publish(SyncEvent::ZoneCreationFailed { zone, error: err });
                ZoneSetupState::NotStarted
            }
        }
    }

    async fn ensure_known_zone_notifications(self: &Arc<Self>) {
        let mut zones = vec![self.config.owned_zone()];
        zones.extend(
            self.collaborators
                .lock()
                .await
                .iter()
                .filter(|identity| *identity != self.config.current_user)
                .map(|identity| self.config.collaborator_zone(identity)),
        );

        let mut tasks = JoinSet::new();
        for zone in zones {
            let manager = Arc::clone(self);
            tasks.spawn(async move {
                manager.ensure_notifications_for(&zone).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(
                    "event=subscription_ensure module=sync status=error error_code=task_failed error={}",
                    err
                );
            }
        }
    }

    async fn ensure_scope_subscription(&self, scope: DatabaseScope) -> SubscriptionOutcome {
        let backend = &self.backend;
        let existing = self
            .config
            .retry
            .run("fetch_subscriptions", move || {
                backend.fetch_subscriptions(scope)
            })
            .await;

        match existing {
            Err(err) => SubscriptionOutcome::Failed(err),
            Ok(ids) if !ids.is_empty() => SubscriptionOutcome::AlreadyPresent,
            Ok(_) => {
                let spec = SubscriptionSpec::for_scope(scope);
                let spec = &spec;
                match self
                    .config
                    .retry
                    .run("save_subscription", move || backend.save_subscription(spec))
                    .await
                {
                    Ok(subscription_id) => SubscriptionOutcome::Created(subscription_id),
                    Err(err) => SubscriptionOutcome::Failed(err),
                }
            }
        }
    }

    fn spawn_permission_request(&self) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            request_discoverability(backend.as_ref(), &events).await;
        });
        if let Some(previous) = self.replace_permission_task(Some(handle)) {
            previous.abort();
        }
    }

    fn scope_lock(&self, scope: DatabaseScope) -> &Mutex<()> {
        match scope {
            DatabaseScope::Private => &self.private_scope,
            DatabaseScope::Shared => &self.shared_scope,
            DatabaseScope::Public => &self.public_scope,
        }
    }

    async fn persist_setup_state(&self, state: ZoneSetupState) {
        let result = self
            .with_preferences(move |prefs| prefs.set_zone_setup_state(state))
            .await;
        if let Err(err) = result {
            error!(
                "event=zone_setup_state module=sync status=error state={} error={}",
                state.as_str(),
                loggable_error(&err)
            );
        }
    }

    async fn with_preferences<T, F>(&self, f: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&PreferenceStore) -> Result<T, DbError> + Send + 'static,
    {
        let preferences = Arc::clone(&self.preferences);
        run_blocking(move || {
            let prefs = preferences
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&prefs)
        })
        .await
    }

    fn take_permission_task(&self) -> Option<JoinHandle<()>> {
        self.replace_permission_task(None)
    }

    fn replace_permission_task(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = self
            .permission_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, next)
    }
}

/// Runs blocking storage work on the blocking pool.
async fn run_blocking<T, E, F>(f: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    E: Into<SyncError> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| SyncError::BlockingTask(err.to_string()))?
        .map_err(Into::into)
}

/// Queries discoverability and prompts when the user was never asked.
async fn request_discoverability(backend: &dyn SyncBackend, events: &SyncEventBus) {
    let result = match backend.permission_status().await {
        Ok(PermissionStatus::NotDetermined) => backend.request_permission().await,
        other => other,
    };

    match result {
        Ok(status) => {
            info!(
                "event=permission_request module=sync status=ok permission={}",
                status.as_str()
            );
            events.publish(SyncEvent::PermissionResolved { status });
        }
        Err(err) => {
            error!(
                "event=permission_request module=sync status=error error_code={} error={}",
                err.code,
                loggable_error(&err)
            );
            events.publish(SyncEvent::PermissionFailed { error: err });
        }
    }
}
