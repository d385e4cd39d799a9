//! Recent `sync:status` activity reported by the server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::channel::{handler, ChannelEvent, EventKind, Handler, PushChannel};
use crate::models::SyncStatusMessage;
use crate::util::lock;

/// Number of messages retained.
pub const SYNC_LOG_CAPACITY: usize = 50;

/// Newest-first log of sync progress messages.
pub struct SyncActivityLog {
    channel: Arc<PushChannel>,
    entries: Arc<Mutex<VecDeque<SyncStatusMessage>>>,
    revision: Arc<watch::Sender<u64>>,
    on_status: Handler,
}

impl SyncActivityLog {
    pub fn activate(channel: Arc<PushChannel>) -> Self {
        let entries = Arc::new(Mutex::new(VecDeque::with_capacity(SYNC_LOG_CAPACITY)));
        let revision = Arc::new(watch::Sender::new(0_u64));

        let on_status = {
            let entries = Arc::clone(&entries);
            let revision = Arc::clone(&revision);
            handler(move |event| {
                let ChannelEvent::SyncStatus(message) = event else {
                    return;
                };
                {
                    let mut entries = lock(&entries);
                    entries.push_front(message.clone());
                    entries.truncate(SYNC_LOG_CAPACITY);
                }
                revision.send_modify(|value| *value += 1);
            })
        };
        channel.on(EventKind::SyncStatus, &on_status);

        Self {
            channel,
            entries,
            revision,
            on_status,
        }
    }

    /// Messages, newest first.
    pub fn entries(&self) -> Vec<SyncStatusMessage> {
        lock(&self.entries).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
        self.revision.send_modify(|value| *value += 1);
    }

    /// Revision counter bumped on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Stop recording; same as dropping the log.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl Drop for SyncActivityLog {
    fn drop(&mut self) {
        self.channel.off(EventKind::SyncStatus, &self.on_status);
    }
}
