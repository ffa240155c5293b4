//! In-process backend for tests and local diagnostics.
//!
//! Keeps zones and subscriptions in memory, counts calls per operation and
//! supports queued failure injection.

use crate::model::zone::{DatabaseScope, ZoneIdentity};
use crate::sync::backend::{
    BackendError, BackendOperation, BackendResult, PermissionStatus, SubscriptionSpec, SyncBackend,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct MemoryState {
    zones: BTreeSet<ZoneIdentity>,
    subscriptions: BTreeMap<DatabaseScope, BTreeMap<String, SubscriptionSpec>>,
    permission: PermissionStatus,
    grant_on_request: bool,
    calls: BTreeMap<BackendOperation, usize>,
    failures: BTreeMap<BackendOperation, VecDeque<BackendError>>,
    latency: Duration,
}

/// Thread-safe in-memory `SyncBackend`.
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend; permission not yet asked, requests are granted.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                grant_on_request: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Sets the current permission state.
    pub fn set_permission(&self, status: PermissionStatus) {
        self.lock().permission = status;
    }

    /// Whether a permission request resolves to granted or denied.
    pub fn set_grant_on_request(&self, grant: bool) {
        self.lock().grant_on_request = grant;
    }

    /// Delays every call, which lets concurrent callers interleave.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Queues one failure for the next call of `operation`.
    pub fn fail_next(&self, error: BackendError) {
        self.lock()
            .failures
            .entry(error.operation)
            .or_default()
            .push_back(error);
    }

    /// Registers a subscription directly, bypassing call accounting.
    pub fn seed_subscription(&self, scope: DatabaseScope, subscription_id: &str) {
        let mut spec = SubscriptionSpec::for_scope(scope);
        spec.subscription_id = subscription_id.to_string();
        self.lock()
            .subscriptions
            .entry(scope)
            .or_default()
            .insert(subscription_id.to_string(), spec);
    }

    pub fn calls(&self, operation: BackendOperation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn zones(&self) -> Vec<ZoneIdentity> {
        self.lock().zones.iter().cloned().collect()
    }

    pub fn subscription_ids(&self, scope: DatabaseScope) -> Vec<String> {
        self.lock()
            .subscriptions
            .get(&scope)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a panicking test thread; the state is
        // still plain data.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the call, waits out the configured latency and pops any
    /// injected failure.
    async fn enter(&self, operation: BackendOperation) -> BackendResult<()> {
        let (latency, injected) = {
            let mut state = self.lock();
            *state.calls.entry(operation).or_default() += 1;
            let injected = state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);
            (state.latency, injected)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match injected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SyncBackend for InMemoryBackend {
    async fn create_zone(&self, zone: &ZoneIdentity) -> BackendResult<()> {
        self.enter(BackendOperation::CreateZone).await?;
        self.lock().zones.insert(zone.clone());
        Ok(())
    }

    async fn fetch_subscriptions(&self, scope: DatabaseScope) -> BackendResult<Vec<String>> {
        self.enter(BackendOperation::FetchSubscriptions).await?;
        Ok(self.subscription_ids(scope))
    }

    async fn save_subscription(&self, spec: &SubscriptionSpec) -> BackendResult<String> {
        self.enter(BackendOperation::SaveSubscription).await?;
        self.lock()
            .subscriptions
            .entry(spec.scope)
            .or_default()
            .insert(spec.subscription_id.clone(), spec.clone());
        Ok(spec.subscription_id.clone())
    }

    async fn delete_subscription(
        &self,
        scope: DatabaseScope,
        subscription_id: &str,
    ) -> BackendResult<String> {
        self.enter(BackendOperation::DeleteSubscription).await?;
        let removed = self
            .lock()
            .subscriptions
            .get_mut(&scope)
            .and_then(|entries| entries.remove(subscription_id));
        match removed {
            Some(_) => Ok(subscription_id.to_string()),
            None => Err(BackendError::new(
                BackendOperation::DeleteSubscription,
                "unknown_item",
                format!("subscription `{subscription_id}` does not exist"),
                false,
            )),
        }
    }

    async fn permission_status(&self) -> BackendResult<PermissionStatus> {
        self.enter(BackendOperation::PermissionStatus).await?;
        Ok(self.lock().permission)
    }

    async fn request_permission(&self) -> BackendResult<PermissionStatus> {
        self.enter(BackendOperation::RequestPermission).await?;
        let mut state = self.lock();
        let status = if state.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        state.permission = status;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryBackend;
    use crate::model::zone::{DatabaseScope, ZoneIdentity};
    use crate::sync::backend::{
        BackendError, BackendOperation, PermissionStatus, SubscriptionSpec, SyncBackend,
    };

    #[tokio::test]
    async fn stores_zones_and_subscriptions() {
        let backend = InMemoryBackend::new();
        backend
            .create_zone(&ZoneIdentity::new("zone", "me"))
            .await
            .expect("create zone");
        let id = backend
            .save_subscription(&SubscriptionSpec::for_scope(DatabaseScope::Private))
            .await
            .expect("save subscription");

        assert_eq!(backend.zones(), vec![ZoneIdentity::new("zone", "me")]);
        assert_eq!(
            backend
                .fetch_subscriptions(DatabaseScope::Private)
                .await
                .expect("fetch"),
            vec![id]
        );
        assert!(backend
            .fetch_subscriptions(DatabaseScope::Shared)
            .await
            .expect("fetch shared")
            .is_empty());
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let backend = InMemoryBackend::new();
        backend.fail_next(BackendError::new(
            BackendOperation::CreateZone,
            "network_unavailable",
            "offline",
            true,
        ));
        let zone = ZoneIdentity::new("zone", "me");

        let err = backend.create_zone(&zone).await.expect_err("first call fails");
        assert_eq!(err.code, "network_unavailable");
        backend.create_zone(&zone).await.expect("second call succeeds");
        assert_eq!(backend.calls(BackendOperation::CreateZone), 2);
    }

    #[tokio::test]
    async fn deleting_unknown_subscription_fails() {
        let backend = InMemoryBackend::new();
        let err = backend
            .delete_subscription(DatabaseScope::Private, "privateDBSubscription")
            .await
            .expect_err("unknown subscription");
        assert_eq!(err.code, "unknown_item");
    }

    #[tokio::test]
    async fn permission_request_follows_grant_setting() {
        let backend = InMemoryBackend::new();
        backend.set_grant_on_request(false);
        assert_eq!(
            backend.permission_status().await.expect("status"),
            PermissionStatus::NotDetermined
        );
        assert_eq!(
            backend.request_permission().await.expect("request"),
            PermissionStatus::Denied
        );
        assert_eq!(
            backend.permission_status().await.expect("status"),
            PermissionStatus::Denied
        );
    }

    #[tokio::test]
    async fn permission_status_reports_exactly_what_was_set() {
        let backend = InMemoryBackend::default();
        assert_eq!(
            backend.permission_status().await.expect("status"),
            PermissionStatus::NotDetermined
        );
        for status in [
            PermissionStatus::Granted,
            PermissionStatus::Denied,
            PermissionStatus::CouldNotComplete,
        ] {
            backend.set_permission(status);
            assert_eq!(backend.permission_status().await.expect("status"), status);
        }
    }
}
