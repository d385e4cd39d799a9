use std::sync::Arc;
use std::time::Duration;

use posdash_core::api::{ApiClient, RecordGateway};
use posdash_core::collection::CollectionController;
use posdash_core::config::ClientConfig;
use posdash_core::health::HealthMonitor;
use posdash_core::models::Resource;
use posdash_core::status::ConnectionStatus;
use posdash_core::sync_log::SyncActivityLog;
use posdash_core::{Guest, Order};

use crate::cli::WatchTarget;
use crate::commands::common::{
    api_client, connection_label, format_guest_lines, format_health, format_order_lines,
    format_sync_line, push_channel,
};
use crate::error::CliError;

/// Period between retries of a failed collection fetch.
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run_watch(target: WatchTarget, config: &ClientConfig) -> Result<(), CliError> {
    match target {
        WatchTarget::Guests => watch_collection::<Guest>(config, format_guest_lines).await,
        WatchTarget::Orders => watch_collection::<Order>(config, format_order_lines).await,
    }
}

async fn watch_collection<R>(
    config: &ClientConfig,
    render: fn(&[R]) -> Vec<String>,
) -> Result<(), CliError>
where
    R: Resource,
    ApiClient: RecordGateway<R>,
{
    let api = Arc::new(api_client(config)?);
    let channel = push_channel(config)?;

    let status = ConnectionStatus::activate(channel.clone());
    let sync_log = SyncActivityLog::activate(channel.clone());
    let health = HealthMonitor::activate(api.clone(), config.health_poll_interval());
    let controller = CollectionController::<R, _>::new(api, channel.clone());

    let mut connection_updates = status.subscribe();
    let mut sync_updates = sync_log.subscribe();
    let mut health_updates = health.subscribe();
    let mut revisions = controller.subscribe();

    channel.connect();
    controller.activate().await;
    print_snapshot(&controller, render);

    let mut retry_tick =
        tokio::time::interval_at(tokio::time::Instant::now() + RETRY_INTERVAL, RETRY_INTERVAL);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                print_snapshot(&controller, render);
            }
            changed = connection_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let connected = *connection_updates.borrow_and_update();
                println!("{}", connection_label(connected));
                if connected {
                    retry_failed_fetch(&controller).await;
                }
            }
            _ = retry_tick.tick() => {
                retry_failed_fetch(&controller).await;
            }
            changed = sync_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(latest) = sync_log.entries().first() {
                    println!("{}", format_sync_line(latest));
                }
            }
            changed = health_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = health_updates.borrow_and_update().clone();
                for line in format_health(&state) {
                    println!("{line}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.deactivate();
    health.deactivate();
    sync_log.clear();
    channel.disconnect();
    Ok(())
}

/// Re-issue the collection fetch if the last one failed; returns whether a
/// retry was made.
pub async fn retry_failed_fetch<R, G>(controller: &CollectionController<R, G>) -> bool
where
    R: Resource,
    G: RecordGateway<R>,
{
    if controller.last_error().is_none() {
        return false;
    }
    tracing::info!("Retrying {} fetch", R::KIND.collection());
    controller.retry().await;
    true
}

fn print_snapshot<R, G>(controller: &CollectionController<R, G>, render: fn(&[R]) -> Vec<String>)
where
    R: Resource,
    G: RecordGateway<R>,
{
    let snapshot = controller.snapshot();
    if snapshot.loading && snapshot.records.is_empty() {
        println!("Loading...");
        return;
    }
    if let Some(error) = &snapshot.error {
        println!("Failed to load {}: {error}", R::KIND.collection());
    }
    println!("--- {} ({}) ---", R::KIND.collection(), snapshot.records.len());
    for line in render(&snapshot.records) {
        println!("{line}");
    }
}
