//! WebSocket connection task with fixed-delay reconnection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::protocol::{self, Packet, CONNECT_PACKET, PONG_PACKET};
use crate::channel::{ChannelEvent, ObserverSet};

/// Fixed-delay, bounded reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// Consecutive failed attempts before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

/// Handle to a running connection task.
#[derive(Debug)]
pub(crate) struct Connection {
    live: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl Connection {
    pub(crate) fn spawn(
        endpoint: String,
        policy: ReconnectPolicy,
        observers: Arc<ObserverSet>,
    ) -> Self {
        let live = Arc::new(AtomicBool::new(false));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(
            endpoint,
            policy,
            observers,
            Arc::clone(&live),
            outbound_rx,
        ));
        Self {
            live,
            outbound,
            task,
        }
    }

    /// Whether the namespace handshake has completed and the socket is open.
    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether the task is still connecting, connected or waiting to retry.
    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub(crate) fn send(&self, frame: String) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Stop the task; returns whether the connection was live.
    pub(crate) fn close(self) -> bool {
        self.task.abort();
        self.live.swap(false, Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn stub(live: bool) -> (Self, Arc<AtomicBool>, mpsc::UnboundedReceiver<String>) {
        let live = Arc::new(AtomicBool::new(live));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(std::future::pending::<()>());
        (
            Self {
                live: Arc::clone(&live),
                outbound,
                task,
            },
            live,
            outbound_rx,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Socket failed or closed; eligible for reconnection
    Lost { was_connected: bool },
    /// Server removed us from the namespace; no reconnection
    ServerDisconnect,
    /// The owning channel is gone
    Shutdown,
}

async fn run(
    endpoint: String,
    policy: ReconnectPolicy,
    observers: Arc<ObserverSet>,
    live: Arc<AtomicBool>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let mut failed_attempts = 0u32;
    loop {
        let end = session(&endpoint, &observers, &live, &mut outbound).await;
        if live.swap(false, Ordering::SeqCst) {
            tracing::info!("Push channel disconnected");
            observers.dispatch(&ChannelEvent::Disconnected);
        }

        match end {
            SessionEnd::Lost { was_connected } => {
                if was_connected {
                    failed_attempts = 0;
                }
            }
            SessionEnd::ServerDisconnect => {
                tracing::info!("Server closed the push channel; not reconnecting");
                return;
            }
            SessionEnd::Shutdown => return,
        }

        if failed_attempts >= policy.max_attempts {
            tracing::warn!(
                "Push channel gave up after {} reconnection attempts",
                policy.max_attempts
            );
            return;
        }
        failed_attempts += 1;
        tracing::debug!(
            "Reconnecting push channel in {:?} (attempt {}/{})",
            policy.delay,
            failed_attempts,
            policy.max_attempts
        );
        tokio::time::sleep(policy.delay).await;
    }
}

async fn session(
    endpoint: &str,
    observers: &ObserverSet,
    live: &AtomicBool,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> SessionEnd {
    let (stream, _response) = match tokio_tungstenite::connect_async(endpoint).await {
        Ok(connected) => connected,
        Err(error) => {
            tracing::warn!("Push channel connection to {} failed: {}", endpoint, error);
            return SessionEnd::Lost {
                was_connected: false,
            };
        }
    };
    let (mut sink, mut source) = stream.split();
    let mut connected = false;
    let lost = |was_connected| SessionEnd::Lost { was_connected };
    // Armed by the handshake; any inbound frame pushes it forward.
    let mut heartbeat: Option<Duration> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            frame = source.next() => {
                if let (Some(Ok(_)), Some(window)) = (&frame, heartbeat) {
                    deadline = Some(Instant::now() + window);
                }
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return lost(connected),
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        tracing::warn!("Push channel read failed: {}", error);
                        return lost(connected);
                    }
                };

                let reply = match protocol::decode(text.as_str()) {
                    Ok(Packet::Open(handshake)) => {
                        tracing::debug!("Engine.IO session {} opened", handshake.sid);
                        heartbeat = handshake.heartbeat_window();
                        deadline = heartbeat.map(|window| Instant::now() + window);
                        Some(CONNECT_PACKET)
                    }
                    Ok(Packet::Ping) => Some(PONG_PACKET),
                    Ok(Packet::Connect) => {
                        connected = true;
                        live.store(true, Ordering::SeqCst);
                        tracing::info!("Push channel connected");
                        observers.dispatch(&ChannelEvent::Connected);
                        None
                    }
                    Ok(Packet::Event { name, data }) => {
                        dispatch_event(observers, &name, data);
                        None
                    }
                    Ok(Packet::ConnectError(message)) => {
                        tracing::warn!("Push channel connection refused: {}", message);
                        return lost(connected);
                    }
                    Ok(Packet::Disconnect) => return SessionEnd::ServerDisconnect,
                    Ok(Packet::Close) => return lost(connected),
                    Ok(Packet::Pong | Packet::Ignored) => None,
                    Err(error) => {
                        tracing::warn!("Dropping undecodable push packet: {}", error);
                        None
                    }
                };

                if let Some(reply) = reply {
                    if let Err(error) = sink.send(Message::text(reply.to_string())).await {
                        tracing::warn!("Push channel write failed: {}", error);
                        return lost(connected);
                    }
                }
            }
            () = expire(deadline) => {
                tracing::warn!("Push channel heartbeat timed out");
                return lost(connected);
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                };
                if !connected {
                    tracing::debug!("Dropping outbound frame sent before namespace join");
                    continue;
                }
                if let Err(error) = sink.send(Message::text(frame)).await {
                    tracing::warn!("Push channel write failed: {}", error);
                    return lost(connected);
                }
            }
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn dispatch_event(observers: &ObserverSet, name: &str, data: Option<serde_json::Value>) {
    match ChannelEvent::from_wire(name, data) {
        Ok(Some(event)) => {
            let delivered = observers.dispatch(&event);
            tracing::debug!("Dispatched {} to {} handler(s)", name, delivered);
        }
        Ok(None) => tracing::debug!("Ignoring unhandled push event {}", name),
        Err(error) => tracing::warn!("Dropping malformed {} event: {}", name, error),
    }
}
