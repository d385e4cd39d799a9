use std::time::Duration;

use posdash_core::channel::{handler, ChannelEvent, EventKind};
use posdash_core::config::ClientConfig;
use posdash_core::models::{SyncCollection, SyncPhase, SyncStatusMessage};
use posdash_core::status::ConnectionStatus;
use tokio::sync::{mpsc, watch};

use crate::commands::common::{format_sync_line, push_channel};
use crate::error::CliError;

pub async fn run_sync(collection: SyncCollection, config: &ClientConfig) -> Result<(), CliError> {
    let channel = push_channel(config)?;
    let status = ConnectionStatus::activate(channel.clone());

    let (messages, mut inbox) = mpsc::unbounded_channel::<SyncStatusMessage>();
    let forward = handler(move |event| {
        if let ChannelEvent::SyncStatus(message) = event {
            let _ = messages.send(message.clone());
        }
    });
    channel.on(EventKind::SyncStatus, &forward);

    channel.connect();
    let connected = wait_connected(status.subscribe(), config.request_timeout()).await;
    if !connected || !channel.request_sync(collection) {
        channel.disconnect();
        return Err(CliError::NotConnected(channel.endpoint().to_string()));
    }
    tracing::info!("Requested sync of {:?}", collection);

    loop {
        tokio::select! {
            message = inbox.recv() => {
                let Some(message) = message else { break };
                println!("{}", format_sync_line(&message));
                if message.status == SyncPhase::Completed {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.disconnect();
    Ok(())
}

/// Wait for the channel to report connected, up to `timeout`.
pub async fn wait_connected(mut state: watch::Receiver<bool>, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, state.wait_for(|connected| *connected))
        .await
        .is_ok_and(|result| result.is_ok())
}
