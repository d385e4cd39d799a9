use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use posdash_core::api::{ApiError, ApiErrorKind, ApiResult, RecordGateway};
use posdash_core::channel::{PushChannel, ReconnectPolicy};
use posdash_core::collection::CollectionController;
use posdash_core::editor::{EditorError, OrderDraft};
use posdash_core::health::HealthState;
use posdash_core::models::{
    AtlasStatus, BackendStatus, DatabaseStatus, GuestPatch, GuestRef, LineItem, OrderStatus,
    SyncCollection, SyncDirection, SyncPhase, SyncStatusMessage,
};
use posdash_core::{Guest, Order, RecordId};
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use crate::cli::{Cli, Commands, ContactArgs, GuestCommand, OrderCommand, StatusArg};
use crate::commands::common::{
    connection_label, format_guest_lines, format_health, format_money, format_order_lines,
    format_status_lines, format_sync_line, normalize_record_id, push_item_arg, truncate,
};
use crate::commands::guests::merge_draft;
use crate::commands::sync::wait_connected;
use crate::commands::watch::retry_failed_fetch;
use crate::error::CliError;

fn backend_status(atlas_configured: bool) -> BackendStatus {
    BackendStatus {
        server: "running".to_string(),
        database: DatabaseStatus {
            status: "connected".to_string(),
            ready_state: Some(1),
            connected: true,
            error: None,
        },
        atlas: AtlasStatus {
            configured: atlas_configured,
            status: "not_connected".to_string(),
            ready_state: None,
            connected: false,
            error: Some("auth failed".to_string()),
        },
        timestamp: None,
    }
}

#[test]
fn record_id_is_trimmed_and_required() {
    assert_eq!(normalize_record_id("  abc123 ").unwrap(), RecordId::new("abc123"));
    assert!(matches!(normalize_record_id("   "), Err(CliError::EmptyId)));
}

#[test]
fn item_arg_appends_parsed_line_item() {
    let mut draft = OrderDraft::new_with_code(None);
    push_item_arg(&mut draft, "Tea:2:3.50").unwrap();
    push_item_arg(&mut draft, "Set menu: fish:1:12").unwrap();

    assert_eq!(
        draft.items,
        vec![
            LineItem {
                name: "Tea".to_string(),
                quantity: 2.0,
                price: 3.5,
            },
            LineItem {
                name: "Set menu: fish".to_string(),
                quantity: 1.0,
                price: 12.0,
            },
        ]
    );
    assert!((draft.compute_total() - 19.0).abs() < f64::EPSILON);
}

#[test]
fn item_arg_rejects_bad_input() {
    let mut draft = OrderDraft::new_with_code(None);
    assert!(matches!(
        push_item_arg(&mut draft, "Tea:2"),
        Err(CliError::InvalidItem(_))
    ));
    assert!(matches!(
        push_item_arg(&mut draft, ":2:3"),
        Err(CliError::InvalidItem(_))
    ));
    assert!(matches!(
        push_item_arg(&mut draft, "Tea:-2:3"),
        Err(CliError::Editor(EditorError::InvalidNumber { .. }))
    ));
    assert!(draft.items.is_empty());
}

#[test]
fn order_lines_fall_back_to_unknown_guest() {
    let order = Order {
        id: Some(RecordId::new("65a1f0c2e4b0a1b2c3d4e5f6")),
        order_code: "ORD-42".to_string(),
        guest: Some(GuestRef::Id(RecordId::new("g1"))),
        items: vec![],
        total_amount: 7.5,
        status: OrderStatus::Cancelled,
        created_at: None,
    };
    let lines = format_order_lines(&[order]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("65a1f0c2"));
    assert!(lines[0].contains("Unknown Guest"));
    assert!(lines[0].contains("$7.50"));
    assert!(lines[0].contains("CANCELLED"));
    assert!(lines[0].ends_with("0 items"));

    assert_eq!(format_order_lines(&[]), vec!["No orders found."]);
}

#[test]
fn guest_lines_show_placeholder_phone() {
    let guest = Guest {
        id: Some(RecordId::new("abcdef0123456789")),
        ..Guest::new("Ada", "ada@example.com")
    };
    let lines = format_guest_lines(&[guest]);
    assert!(lines[0].starts_with("abcdef01"));
    assert!(lines[0].ends_with('-'));

    let cleared = Guest {
        phone: Some(String::new()),
        ..Guest::new("Ada", "ada@example.com")
    };
    assert!(format_guest_lines(&[cleared])[0].ends_with('-'));
}

#[test]
fn money_and_truncation() {
    assert_eq!(format_money(25.0), "$25.00");
    assert_eq!(format_money(3.456), "$3.46");
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a rather long guest name", 10), "a rathe...");
}

#[test]
fn status_lines_hide_atlas_error_when_unconfigured() {
    let lines = format_status_lines(&backend_status(false));
    assert_eq!(
        lines,
        vec![
            "Server:   running",
            "Database: Connected",
            "Atlas:    Not Configured",
        ]
    );

    let lines = format_status_lines(&backend_status(true));
    assert_eq!(lines[2], "Atlas:    not connected");
    assert_eq!(lines[3], "          auth failed");
}

#[test]
fn health_lines_cover_loading_and_error() {
    assert_eq!(format_health(&HealthState::default()), vec!["Checking backend..."]);

    let failed = HealthState {
        status: None,
        error: Some(posdash_core::api::ApiError::new(
            posdash_core::api::ApiErrorKind::Timeout,
            "Request timeout - server is not responding",
        )),
        loading: false,
    };
    assert_eq!(
        format_health(&failed),
        vec!["Backend unavailable: Request timeout - server is not responding"]
    );
}

#[test]
fn connection_labels() {
    assert_eq!(connection_label(true), "● Live");
    assert_eq!(connection_label(false), "○ Offline");
}

#[test]
fn sync_line_includes_counts_and_error() {
    let message = SyncStatusMessage {
        direction: SyncDirection::Push,
        action: "sync".to_string(),
        collection: "orders".to_string(),
        status: SyncPhase::Error,
        message: "Push failed".to_string(),
        document_id: None,
        timestamp: None,
        synced_count: Some(2),
        total_count: Some(5),
        errors: Some(3),
        error: Some("replica offline".to_string()),
    };
    assert_eq!(
        format_sync_line(&message),
        "✗ [orders] Push failed (2/5): replica offline"
    );
}

#[test]
fn merge_draft_overlays_only_given_fields() {
    let guest = Guest {
        phone: Some("555".to_string()),
        ..Guest::new("Ada", "ada@example.com")
    };
    let draft = merge_draft(
        posdash_core::editor::GuestDraft::from_guest(&guest),
        None,
        Some("lovelace@example.com".to_string()),
        ContactArgs {
            phone: None,
            address: Some("12 Analytical Way".to_string()),
        },
    );
    assert_eq!(draft.name, "Ada");
    assert_eq!(draft.email, "lovelace@example.com");
    assert_eq!(draft.phone, "555");
    assert_eq!(draft.address, "12 Analytical Way");
}

#[test]
fn cli_parses_order_add_with_items() {
    let cli = Cli::try_parse_from([
        "posdash",
        "--api-url",
        "http://pos.local:5000",
        "orders",
        "add",
        "--guest",
        "g1",
        "--item",
        "Tea:2:3.5",
        "--item",
        "Cake:1:4",
        "--status",
        "completed",
    ])
    .unwrap();

    assert_eq!(cli.api_url.as_deref(), Some("http://pos.local:5000"));
    let Commands::Orders(OrderCommand::Add {
        guest,
        code,
        items,
        status,
    }) = cli.command
    else {
        panic!("expected orders add");
    };
    assert_eq!(guest, "g1");
    assert_eq!(code, None);
    assert_eq!(items, vec!["Tea:2:3.5", "Cake:1:4"]);
    assert_eq!(status, Some(StatusArg::Completed));
    assert_eq!(OrderStatus::from(StatusArg::Completed), OrderStatus::Completed);
}

#[test]
fn cli_parses_guest_edit_and_sync_default() {
    let cli = Cli::try_parse_from(["posdash", "guests", "edit", "g1", "--phone", "555"]).unwrap();
    let Commands::Guests(GuestCommand::Edit { id, name, contact, .. }) = cli.command else {
        panic!("expected guests edit");
    };
    assert_eq!(id, "g1");
    assert_eq!(name, None);
    assert_eq!(contact.phone.as_deref(), Some("555"));

    let cli = Cli::try_parse_from(["posdash", "sync"]).unwrap();
    let Commands::Sync { collection } = cli.command else {
        panic!("expected sync");
    };
    assert_eq!(SyncCollection::from(collection), SyncCollection::All);
}

#[tokio::test(start_paused = true)]
async fn wait_connected_times_out_or_succeeds() {
    let (state, receiver) = watch::channel(false);
    assert!(!wait_connected(receiver.clone(), Duration::from_secs(2)).await);

    let waiter = tokio::spawn(wait_connected(receiver, Duration::from_secs(2)));
    tokio::time::sleep(Duration::from_millis(100)).await;
    state.send_replace(true);
    assert!(waiter.await.unwrap());
}

/// Serves one guest, failing the first `failures` list calls.
#[derive(Default)]
struct FlakyGuests {
    failures: usize,
    list_calls: AtomicUsize,
}

impl FlakyGuests {
    fn unsupported<T>() -> ApiResult<T> {
        Err(ApiError::new(ApiErrorKind::Server, "unsupported"))
    }
}

impl RecordGateway<Guest> for FlakyGuests {
    async fn list_all(&self) -> ApiResult<Vec<Guest>> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ApiError::new(
                ApiErrorKind::Unreachable,
                "Network error - cannot reach server. Is the backend running?",
            ));
        }
        Ok(vec![Guest {
            id: Some(RecordId::new("g1")),
            ..Guest::new("Ada", "ada@example.com")
        }])
    }

    async fn get_one(&self, _id: &RecordId) -> ApiResult<Guest> {
        Self::unsupported()
    }

    async fn create(&self, _record: &Guest) -> ApiResult<Guest> {
        Self::unsupported()
    }

    async fn update(&self, _id: &RecordId, _patch: &GuestPatch) -> ApiResult<Guest> {
        Self::unsupported()
    }

    async fn delete(&self, _id: &RecordId) -> ApiResult<()> {
        Self::unsupported()
    }
}

#[tokio::test]
async fn failed_watch_fetch_is_retried_until_it_loads() {
    let gateway = Arc::new(FlakyGuests {
        failures: 1,
        ..FlakyGuests::default()
    });
    let channel = Arc::new(
        PushChannel::new("http://localhost:5000", ReconnectPolicy::default()).unwrap(),
    );
    let controller = CollectionController::new(Arc::clone(&gateway), channel);
    controller.activate().await;
    assert!(controller.records().is_empty());
    assert!(controller.last_error().is_some());

    assert!(retry_failed_fetch(&controller).await);
    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.last_error(), None);

    assert!(!retry_failed_fetch(&controller).await);
    assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 2);
}
