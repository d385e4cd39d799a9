//! Typed push channel events.
//!
//! Wire event names map onto the closed [`EventKind`] taxonomy; payloads are
//! decoded into [`ChannelEvent`] before any handler sees them.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::channel::protocol::ProtocolError;
use crate::models::{Guest, Order, RecordId, ResourceKind, SyncStatusMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// A server-side mutation of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange<R> {
    Created(R),
    Updated(R),
    /// Deletions carry the bare identity only.
    Deleted(RecordId),
}

impl<R> RecordChange<R> {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Created(_) => Operation::Created,
            Self::Updated(_) => Operation::Updated,
            Self::Deleted(_) => Operation::Deleted,
        }
    }
}

/// Every event name a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    GuestCreated,
    GuestUpdated,
    GuestDeleted,
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    SyncStatus,
}

impl EventKind {
    #[must_use]
    pub const fn record(kind: ResourceKind, operation: Operation) -> Self {
        match (kind, operation) {
            (ResourceKind::Guest, Operation::Created) => Self::GuestCreated,
            (ResourceKind::Guest, Operation::Updated) => Self::GuestUpdated,
            (ResourceKind::Guest, Operation::Deleted) => Self::GuestDeleted,
            (ResourceKind::Order, Operation::Created) => Self::OrderCreated,
            (ResourceKind::Order, Operation::Updated) => Self::OrderUpdated,
            (ResourceKind::Order, Operation::Deleted) => Self::OrderDeleted,
        }
    }

    /// The created/updated/deleted kinds of one resource.
    #[must_use]
    pub const fn record_kinds(kind: ResourceKind) -> [Self; 3] {
        [
            Self::record(kind, Operation::Created),
            Self::record(kind, Operation::Updated),
            Self::record(kind, Operation::Deleted),
        ]
    }

    /// Socket event name as sent by the server.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::GuestCreated => "guest:created",
            Self::GuestUpdated => "guest:updated",
            Self::GuestDeleted => "guest:deleted",
            Self::OrderCreated => "order:created",
            Self::OrderUpdated => "order:updated",
            Self::OrderDeleted => "order:deleted",
            Self::SyncStatus => "sync:status",
        }
    }

    /// Resolve an inbound event name; lifecycle names are not delivered as
    /// events and resolve to `None`.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "guest:created" => Some(Self::GuestCreated),
            "guest:updated" => Some(Self::GuestUpdated),
            "guest:deleted" => Some(Self::GuestDeleted),
            "order:created" => Some(Self::OrderCreated),
            "order:updated" => Some(Self::OrderUpdated),
            "order:deleted" => Some(Self::OrderDeleted),
            "sync:status" => Some(Self::SyncStatus),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Guest(RecordChange<Guest>),
    Order(RecordChange<Order>),
    SyncStatus(SyncStatusMessage),
}

impl ChannelEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::Guest(change) => EventKind::record(ResourceKind::Guest, change.operation()),
            Self::Order(change) => EventKind::record(ResourceKind::Order, change.operation()),
            Self::SyncStatus(_) => EventKind::SyncStatus,
        }
    }

    /// Decode an inbound socket event.
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn from_wire(name: &str, data: Option<Value>) -> Result<Option<Self>, ProtocolError> {
        let Some(kind) = EventKind::from_wire_name(name) else {
            return Ok(None);
        };
        let data = data.ok_or_else(|| {
            ProtocolError::MalformedEvent(format!("{name} arrived without a payload"))
        })?;

        let event = match kind {
            EventKind::GuestCreated => Self::Guest(RecordChange::Created(parse(data)?)),
            EventKind::GuestUpdated => Self::Guest(RecordChange::Updated(parse(data)?)),
            EventKind::GuestDeleted => Self::Guest(RecordChange::Deleted(deleted_id(data)?)),
            EventKind::OrderCreated => Self::Order(RecordChange::Created(parse(data)?)),
            EventKind::OrderUpdated => Self::Order(RecordChange::Updated(parse(data)?)),
            EventKind::OrderDeleted => Self::Order(RecordChange::Deleted(deleted_id(data)?)),
            EventKind::SyncStatus => Self::SyncStatus(parse(data)?),
            EventKind::Connected | EventKind::Disconnected => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(data)?)
}

/// Deletion payloads arrive either wrapped (`{"_id": ...}`) or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeletedPayload {
    Bare(RecordId),
    Wrapped {
        #[serde(rename = "_id")]
        id: RecordId,
    },
}

fn deleted_id(data: Value) -> Result<RecordId, ProtocolError> {
    match serde_json::from_value::<DeletedPayload>(data) {
        Ok(DeletedPayload::Bare(id) | DeletedPayload::Wrapped { id }) => Ok(id),
        Err(_) => Err(ProtocolError::MalformedEvent(
            "deletion payload carried no record identity".to_string(),
        )),
    }
}
