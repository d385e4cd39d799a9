//! Connection status observer for the push channel.

use std::sync::Arc;

use tokio::sync::watch;

use crate::channel::{handler, EventKind, Handler, PushChannel};

/// Boolean "connected" signal derived from channel lifecycle events.
///
/// Handlers are deregistered when the observer is dropped.
pub struct ConnectionStatus {
    channel: Arc<PushChannel>,
    state: Arc<watch::Sender<bool>>,
    on_connected: Handler,
    on_disconnected: Handler,
}

impl ConnectionStatus {
    pub fn activate(channel: Arc<PushChannel>) -> Self {
        let state = Arc::new(watch::Sender::new(false));

        let on_connected = {
            let state = Arc::clone(&state);
            handler(move |_| {
                state.send_replace(true);
            })
        };
        let on_disconnected = {
            let state = Arc::clone(&state);
            handler(move |_| {
                state.send_replace(false);
            })
        };
        channel.on(EventKind::Connected, &on_connected);
        channel.on(EventKind::Disconnected, &on_disconnected);

        // The channel may have connected before this observer subscribed.
        state.send_replace(channel.is_connected());

        Self {
            channel,
            state,
            on_connected,
            on_disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Deregister both handlers; same as dropping the observer.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl Drop for ConnectionStatus {
    fn drop(&mut self) {
        self.channel.off(EventKind::Connected, &self.on_connected);
        self.channel.off(EventKind::Disconnected, &self.on_disconnected);
    }
}
