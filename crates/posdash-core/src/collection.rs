//! Live collection controller.
//!
//! A [`CollectionController`] mirrors one remote collection in memory. It is
//! seeded by a full fetch on activation and kept current by push channel
//! record events. Reconciliation is idempotent: a `created` for a known
//! identity is ignored, an `updated` for an unknown identity is dropped, and a
//! `deleted` for an unknown identity is a no-op, so refetches and push events
//! can interleave in any order without duplicating records.
//!
//! Every fetch takes a ticket and only the latest issued fetch is applied. A
//! deletion is remembered against the latest ticket at the time it was
//! applied, so a fetch that was already in flight cannot bring the record
//! back. A later `created` event or a fetch issued after the deletion can.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::api::{ApiError, ApiResult, RecordGateway};
use crate::channel::{handler, EventKind, Handler, PushChannel, RecordChange};
use crate::models::{RecordId, Resource};
use crate::util::lock;

/// Records plus fetch status, as rendered by a view.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot<R> {
    pub records: Vec<R>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

#[derive(Debug)]
pub(crate) struct CollectionState<R> {
    records: Vec<R>,
    loading: bool,
    error: Option<ApiError>,
    /// Deleted identities, keyed to the latest fetch ticket when deleted.
    tombstones: HashMap<RecordId, u64>,
    active: bool,
    /// Latest fetch ticket issued. Survives deactivation so fetches from an
    /// earlier activation stay stale.
    latest_fetch: u64,
}

impl<R> Default for CollectionState<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            error: None,
            tombstones: HashMap::new(),
            active: false,
            latest_fetch: 0,
        }
    }
}

impl<R: Resource> CollectionState<R> {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.id() == Some(id))
    }

    /// Merge one record change; returns whether the collection changed.
    pub(crate) fn apply(&mut self, change: &RecordChange<R>) -> bool {
        match change {
            RecordChange::Created(record) => {
                let Some(id) = record.id() else {
                    return false;
                };
                self.tombstones.remove(id);
                if self.position(id).is_some() {
                    return false;
                }
                self.records.push(record.clone());
                true
            }
            RecordChange::Updated(record) => {
                let Some(index) = record.id().and_then(|id| self.position(id)) else {
                    return false;
                };
                if self.records[index] == *record {
                    return false;
                }
                self.records[index] = record.clone();
                true
            }
            RecordChange::Deleted(id) => {
                self.tombstones.insert(id.clone(), self.latest_fetch);
                match self.position(id) {
                    Some(index) => {
                        self.records.remove(index);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Issue a fetch ticket and mark the collection as loading.
    fn begin_fetch(&mut self) -> u64 {
        self.latest_fetch += 1;
        self.loading = true;
        self.latest_fetch
    }

    /// Apply the result of fetch `ticket`; returns false when a newer fetch
    /// was issued meanwhile and the result was dropped.
    fn finish_fetch(&mut self, ticket: u64, result: ApiResult<Vec<R>>) -> bool {
        if !self.active || ticket != self.latest_fetch {
            return false;
        }
        match result {
            Ok(records) => {
                self.replace(ticket, records);
                self.error = None;
            }
            Err(error) => {
                tracing::warn!("Failed to load {} collection: {}", R::KIND, error);
                self.error = Some(error);
            }
        }
        self.loading = false;
        true
    }

    /// Replace the sequence with fetch `ticket`, minus identities deleted
    /// while it was in flight.
    fn replace(&mut self, ticket: u64, mut records: Vec<R>) {
        self.tombstones.retain(|_, deleted_at| *deleted_at >= ticket);
        if !self.tombstones.is_empty() {
            records.retain(|record| {
                record
                    .id()
                    .is_none_or(|id| !self.tombstones.contains_key(id))
            });
        }
        self.records = records;
    }

    fn snapshot(&self) -> CollectionSnapshot<R> {
        CollectionSnapshot {
            records: self.records.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// In-memory mirror of one resource collection.
pub struct CollectionController<R: Resource, G: RecordGateway<R>> {
    gateway: Arc<G>,
    channel: Arc<PushChannel>,
    state: Arc<Mutex<CollectionState<R>>>,
    revision: Arc<watch::Sender<u64>>,
    handler: Handler,
}

impl<R: Resource, G: RecordGateway<R>> CollectionController<R, G> {
    pub fn new(gateway: Arc<G>, channel: Arc<PushChannel>) -> Self {
        let state = Arc::new(Mutex::new(CollectionState::default()));
        let revision = Arc::new(watch::Sender::new(0_u64));

        let handler = {
            let state = Arc::clone(&state);
            let revision = Arc::clone(&revision);
            handler(move |event| {
                let Some(change) = R::select_change(event) else {
                    return;
                };
                let changed = {
                    let mut state = lock(&state);
                    state.active && state.apply(change)
                };
                tracing::debug!(
                    "Applied {}:{} (changed: {})",
                    R::KIND,
                    change.operation().as_str(),
                    changed
                );
                if changed {
                    revision.send_modify(|value| *value += 1);
                }
            })
        };

        Self {
            gateway,
            channel,
            state,
            revision,
            handler,
        }
    }

    /// Subscribe to record events and seed the collection.
    pub async fn activate(&self) {
        let newly_active = {
            let mut state = lock(&self.state);
            if state.active {
                false
            } else {
                state.active = true;
                true
            }
        };
        if newly_active {
            for kind in EventKind::record_kinds(R::KIND) {
                self.channel.on(kind, &self.handler);
            }
            tracing::debug!("Activated {} collection", R::KIND);
        }
        self.refresh().await;
    }

    /// Deregister event handlers and discard local state.
    ///
    /// A fetch still in flight completes but its result is dropped.
    pub fn deactivate(&self) {
        for kind in EventKind::record_kinds(R::KIND) {
            self.channel.off(kind, &self.handler);
        }
        let was_active = {
            let mut state = lock(&self.state);
            let was_active = state.active;
            *state = CollectionState {
                latest_fetch: state.latest_fetch,
                ..CollectionState::default()
            };
            was_active
        };
        if was_active {
            tracing::debug!("Deactivated {} collection", R::KIND);
            self.notify();
        }
    }

    /// Replace the collection with a full fetch.
    ///
    /// On failure the previous records are kept and the error is recorded.
    /// When refreshes overlap only the last one issued is applied, and the
    /// collection stays loading until it completes.
    pub async fn refresh(&self) {
        let ticket = {
            let mut state = lock(&self.state);
            if !state.active {
                return;
            }
            state.begin_fetch()
        };
        self.notify();

        let result = self.gateway.list_all().await;

        let applied = lock(&self.state).finish_fetch(ticket, result);
        if applied {
            self.notify();
        } else {
            tracing::debug!("Discarding stale {} fetch", R::KIND);
        }
    }

    /// Re-issue the seeding fetch after a failure.
    pub async fn retry(&self) {
        self.refresh().await;
    }

    /// Create a record, then refetch.
    pub async fn create(&self, record: &R) -> ApiResult<R> {
        let created = self.gateway.create(record).await.map_err(|error| {
            tracing::error!("Failed to create {}: {}", R::KIND, error);
            error
        })?;
        self.refresh().await;
        Ok(created)
    }

    /// Update a record, then refetch.
    pub async fn update(&self, id: &RecordId, patch: &R::Patch) -> ApiResult<R> {
        let updated = self.gateway.update(id, patch).await.map_err(|error| {
            tracing::error!("Failed to update {} {}: {}", R::KIND, id, error);
            error
        })?;
        self.refresh().await;
        Ok(updated)
    }

    /// Delete a record, then refetch.
    ///
    /// Failures are logged only; returns whether the delete succeeded.
    pub async fn delete(&self, id: &RecordId) -> bool {
        match self.gateway.delete(id).await {
            Ok(()) => {
                self.refresh().await;
                true
            }
            Err(error) => {
                tracing::error!("Failed to delete {} {}: {}", R::KIND, id, error);
                false
            }
        }
    }

    pub fn records(&self) -> Vec<R> {
        lock(&self.state).records.clone()
    }

    pub fn find(&self, id: &RecordId) -> Option<R> {
        let state = lock(&self.state);
        state.position(id).map(|index| state.records[index].clone())
    }

    pub fn snapshot(&self) -> CollectionSnapshot<R> {
        lock(&self.state).snapshot()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn last_error(&self) -> Option<ApiError> {
        lock(&self.state).error.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Revision counter bumped on every visible change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn notify(&self) {
        self.revision.send_modify(|value| *value += 1);
    }
}

impl<R: Resource, G: RecordGateway<R>> Drop for CollectionController<R, G> {
    fn drop(&mut self) {
        for kind in EventKind::record_kinds(R::KIND) {
            self.channel.off(kind, &self.handler);
        }
    }
}
