//! In-memory gateways shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;

use crate::api::{ApiError, ApiErrorKind, ApiResult, RecordGateway, StatusSource};
use crate::models::{BackendStatus, RecordId, Resource};
use crate::util::lock;

/// Pauses one `list_all` call until the test releases it.
#[derive(Debug, Default)]
pub struct ListGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Record store that behaves like the REST API, including `PUT` merges.
#[derive(Debug)]
pub struct MemoryGateway<R> {
    records: Mutex<Vec<R>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    fail_list: Mutex<Option<ApiError>>,
    fail_write: Mutex<Option<ApiError>>,
    gate: Mutex<Option<Arc<ListGate>>>,
}

impl<R> Default for MemoryGateway<R> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(100),
            list_calls: AtomicUsize::new(0),
            fail_list: Mutex::new(None),
            fail_write: Mutex::new(None),
            gate: Mutex::new(None),
        }
    }
}

impl<R: Resource> MemoryGateway<R> {
    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Vec<R> {
        lock(&self.records).clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self, error: ApiError) {
        *lock(&self.fail_list) = Some(error);
    }

    pub fn fail_next_write(&self, error: ApiError) {
        *lock(&self.fail_write) = Some(error);
    }

    pub fn hold_next_list(&self) -> Arc<ListGate> {
        let gate = Arc::new(ListGate::default());
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    fn take_write_failure(&self) -> ApiResult<()> {
        lock(&self.fail_write).take().map_or(Ok(()), Err)
    }

    fn not_found() -> ApiError {
        ApiError::new(ApiErrorKind::Server, "Not Found")
    }
}

fn merge<R: Resource>(record: &R, overlay: Value) -> R {
    let mut value = serde_json::to_value(record).unwrap();
    if let (Value::Object(target), Value::Object(fields)) = (&mut value, overlay) {
        target.extend(fields);
    }
    serde_json::from_value(value).unwrap()
}

impl<R: Resource> RecordGateway<R> for MemoryGateway<R> {
    async fn list_all(&self) -> ApiResult<Vec<R>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(error) = lock(&self.fail_list).take() {
            return Err(error);
        }
        Ok(self.stored())
    }

    async fn get_one(&self, id: &RecordId) -> ApiResult<R> {
        lock(&self.records)
            .iter()
            .find(|record| record.id() == Some(id))
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn create(&self, record: &R) -> ApiResult<R> {
        self.take_write_failure()?;
        let id = format!("{:024x}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let created = merge(record, serde_json::json!({ "_id": id }));
        lock(&self.records).push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &RecordId, patch: &R::Patch) -> ApiResult<R> {
        self.take_write_failure()?;
        let mut records = lock(&self.records);
        let slot = records
            .iter_mut()
            .find(|record| record.id() == Some(id))
            .ok_or_else(Self::not_found)?;
        *slot = merge(slot, serde_json::to_value(patch).unwrap());
        Ok(slot.clone())
    }

    async fn delete(&self, id: &RecordId) -> ApiResult<()> {
        self.take_write_failure()?;
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|record| record.id() != Some(id));
        if records.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }
}

/// Status source that replays scripted replies, repeating the last one.
#[derive(Debug, Default)]
pub struct ScriptedStatus {
    replies: Mutex<VecDeque<ApiResult<BackendStatus>>>,
    calls: AtomicUsize,
}

impl ScriptedStatus {
    pub fn new(replies: impl IntoIterator<Item = ApiResult<BackendStatus>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatusSource for ScriptedStatus {
    async fn fetch_status(&self) -> ApiResult<BackendStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = lock(&self.replies);
        if replies.len() > 1 {
            return replies.pop_front().unwrap();
        }
        replies
            .front()
            .cloned()
            .unwrap_or_else(|| Err(ApiError::new(ApiErrorKind::NoResponse, "no reply scripted")))
    }
}
