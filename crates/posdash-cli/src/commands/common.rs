use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use posdash_core::api::ApiClient;
use posdash_core::channel::PushChannel;
use posdash_core::config::ClientConfig;
use posdash_core::editor::{LineItemEdit, LineItemField, OrderDraft};
use posdash_core::health::HealthState;
use posdash_core::models::{BackendStatus, SyncPhase, SyncStatusMessage};
use posdash_core::{Guest, Order, RecordId};

use crate::error::CliError;

const UNKNOWN_GUEST: &str = "Unknown Guest";

pub fn api_client(config: &ClientConfig) -> Result<ApiClient, CliError> {
    Ok(ApiClient::from_config(config)?)
}

pub fn push_channel(config: &ClientConfig) -> Result<Arc<PushChannel>, CliError> {
    Ok(Arc::new(PushChannel::from_config(config)?))
}

pub fn normalize_record_id(id: &str) -> Result<RecordId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyId);
    }
    Ok(RecordId::new(trimmed))
}

/// Append a `NAME:QUANTITY:PRICE` line item; the name may itself contain `:`.
pub fn push_item_arg(draft: &mut OrderDraft, arg: &str) -> Result<(), CliError> {
    let invalid = || CliError::InvalidItem(arg.to_string());
    let mut parts = arg.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }

    let edits = [
        LineItemEdit::parse(LineItemField::Name, name)?,
        LineItemEdit::parse(LineItemField::Quantity, quantity)?,
        LineItemEdit::parse(LineItemField::Price, price)?,
    ];
    draft.add_item();
    let index = draft.items.len() - 1;
    for edit in edits {
        draft.update_item(index, edit)?;
    }
    Ok(())
}

pub fn format_money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "-".to_string(),
        |value| value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub fn format_guest_lines(guests: &[Guest]) -> Vec<String> {
    if guests.is_empty() {
        return vec!["No guests found.".to_string()];
    }
    guests
        .iter()
        .map(|guest| {
            let id = guest.id.as_ref().map_or("-", RecordId::short);
            let phone = or_placeholder(guest.phone.as_deref());
            format!(
                "{id:<8}  {:<24}  {:<28}  {phone}",
                truncate(&guest.name, 24),
                truncate(&guest.email, 28)
            )
        })
        .collect()
}

pub fn format_order_lines(orders: &[Order]) -> Vec<String> {
    if orders.is_empty() {
        return vec!["No orders found.".to_string()];
    }
    orders
        .iter()
        .map(|order| {
            let id = order.id.as_ref().map_or("-", RecordId::short);
            let guest = order.guest_name().unwrap_or(UNKNOWN_GUEST);
            format!(
                "{id:<8}  {:<10}  {:<20}  {:>10}  {:<9}  {} items",
                truncate(&order.order_code, 10),
                truncate(guest, 20),
                format_money(order.total_amount),
                order.status.as_str().to_uppercase(),
                order.items.len()
            )
        })
        .collect()
}

pub fn format_order_detail(order: &Order) -> Vec<String> {
    let mut lines = vec![
        format!("Order:   {}", order.order_code),
        format!(
            "Guest:   {}",
            order.guest_name().unwrap_or(UNKNOWN_GUEST)
        ),
        format!("Status:  {}", order.status.as_str().to_uppercase()),
        format!("Created: {}", format_timestamp(order.created_at)),
    ];
    for item in &order.items {
        lines.push(format!(
            "  {:<24} {:>4} x {:>9} = {:>10}",
            truncate(&item.name, 24),
            item.quantity,
            format_money(item.price),
            format_money(item.subtotal())
        ));
    }
    lines.push(format!("Total:   {}", format_money(order.total_amount)));
    lines
}

pub fn format_status_lines(status: &BackendStatus) -> Vec<String> {
    let mut lines = vec![
        format!("Server:   {}", status.server),
        format!(
            "Database: {}",
            if status.database.connected {
                "Connected".to_string()
            } else {
                status.database.status.clone()
            }
        ),
    ];
    if let Some(error) = &status.database.error {
        lines.push(format!("          {error}"));
    }
    lines.push(format!("Atlas:    {}", status.atlas.summary()));
    if let Some(error) = status.atlas.visible_error() {
        lines.push(format!("          {error}"));
    }
    lines
}

pub fn format_health(state: &HealthState) -> Vec<String> {
    if let Some(status) = &state.status {
        return format_status_lines(status);
    }
    match &state.error {
        Some(error) => vec![format!("Backend unavailable: {error}")],
        None => vec!["Checking backend...".to_string()],
    }
}

pub const fn connection_label(connected: bool) -> &'static str {
    if connected {
        "● Live"
    } else {
        "○ Offline"
    }
}

pub fn format_sync_line(message: &SyncStatusMessage) -> String {
    let marker = match message.status {
        SyncPhase::Processing => "…",
        SyncPhase::Success | SyncPhase::Completed => "✓",
        SyncPhase::Error => "✗",
    };
    let time = message.timestamp.map_or_else(String::new, |timestamp| {
        timestamp.with_timezone(&Local).format("%H:%M:%S ").to_string()
    });
    let mut line = format!("{time}{marker} [{}] {}", message.collection, message.message);
    if let (Some(synced), Some(total)) = (message.synced_count, message.total_count) {
        line.push_str(&format!(" ({synced}/{total})"));
    }
    if let Some(error) = &message.error {
        line.push_str(&format!(": {error}"));
    }
    line
}

/// Blank optional fields render as `-`.
pub fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|value| !value.trim().is_empty()).unwrap_or("-")
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut truncated = value
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
