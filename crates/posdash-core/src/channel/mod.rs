//! Push channel client.
//!
//! A [`PushChannel`] owns at most one Socket.IO connection to the server and
//! fans decoded [`ChannelEvent`]s out to registered handlers. It is created
//! once at startup, shared behind an `Arc` by every controller and observer,
//! and torn down with [`PushChannel::disconnect`].

mod event;
mod observers;
pub mod protocol;
mod transport;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::models::SyncCollection;
use crate::util::lock;

pub use event::{ChannelEvent, EventKind, Operation, RecordChange};
pub use observers::{handler, Handler, ObserverSet};
pub use transport::ReconnectPolicy;

use transport::Connection;

const SOCKET_PATH: &str = "/socket.io/";
const SOCKET_QUERY: &str = "EIO=4&transport=websocket";

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Invalid push channel URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug)]
pub struct PushChannel {
    endpoint: String,
    policy: ReconnectPolicy,
    observers: Arc<ObserverSet>,
    connection: Mutex<Option<Connection>>,
}

impl PushChannel {
    pub fn new(base_url: &str, policy: ReconnectPolicy) -> Result<Self, ChannelError> {
        Ok(Self {
            endpoint: socket_endpoint(base_url)?,
            policy,
            observers: Arc::new(ObserverSet::default()),
            connection: Mutex::new(None),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ChannelError> {
        Self::new(
            config.push_base_url(),
            ReconnectPolicy {
                delay: config.reconnect_delay(),
                max_attempts: config.reconnect_attempts,
            },
        )
    }

    /// WebSocket endpoint this channel connects to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start the connection task unless one is already running.
    ///
    /// A channel that exhausted its reconnection attempts is restarted.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut connection = lock(&self.connection);
        if connection.as_ref().is_some_and(Connection::is_running) {
            return;
        }
        tracing::info!("Connecting push channel to {}", self.endpoint);
        *connection = Some(Connection::spawn(
            self.endpoint.clone(),
            self.policy,
            Arc::clone(&self.observers),
        ));
    }

    /// Tear down the transport and drop every registered handler.
    pub fn disconnect(&self) {
        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            if connection.close() {
                self.observers.dispatch(&ChannelEvent::Disconnected);
            }
            tracing::info!("Push channel closed");
        }
        self.observers.clear();
    }

    /// Live transport state at call time.
    pub fn is_connected(&self) -> bool {
        lock(&self.connection)
            .as_ref()
            .is_some_and(Connection::is_live)
    }

    pub fn on(&self, kind: EventKind, handler: &Handler) {
        if !self.observers.insert(kind, Arc::clone(handler)) {
            tracing::debug!("Handler already registered for {}", kind);
        }
    }

    pub fn off(&self, kind: EventKind, handler: &Handler) {
        self.observers.remove(kind, handler);
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.observers.count(kind)
    }

    /// Ask the server to reconcile a collection; it answers with
    /// `sync:status` events. Returns `false` when not connected.
    pub fn request_sync(&self, collection: SyncCollection) -> bool {
        let connection = lock(&self.connection);
        let Some(connection) = connection.as_ref().filter(|c| c.is_live()) else {
            tracing::debug!("Skipping sync request while disconnected");
            return false;
        };
        let payload = serde_json::json!({ "collection": collection });
        match protocol::encode_event("sync:request", &payload) {
            Ok(frame) => connection.send(frame),
            Err(error) => {
                tracing::warn!("Failed to encode sync request: {}", error);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn dispatch(&self, event: &ChannelEvent) -> usize {
        self.observers.dispatch(event)
    }

    /// Install a stub connection whose liveness the test controls.
    #[cfg(test)]
    pub(crate) fn install_stub_connection(
        &self,
        live: bool,
    ) -> (
        Arc<std::sync::atomic::AtomicBool>,
        tokio::sync::mpsc::UnboundedReceiver<String>,
    ) {
        let (connection, flag, outbound) = Connection::stub(live);
        *lock(&self.connection) = Some(connection);
        (flag, outbound)
    }
}

/// Derive the Socket.IO WebSocket endpoint from an `http(s)` or `ws(s)` base.
pub fn socket_endpoint(base_url: &str) -> Result<String, ChannelError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|error| ChannelError::InvalidUrl(format!("{base_url}: {error}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::InvalidUrl(format!(
                "unsupported scheme {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ChannelError::InvalidUrl(format!("cannot use scheme {scheme}")))?;
    url.set_path(SOCKET_PATH);
    url.set_query(Some(SOCKET_QUERY));
    Ok(url.to_string())
}
