//! Point-of-sale order model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelEvent, RecordChange};
use crate::models::{Guest, RecordId, Resource, ResourceKind};

/// Lifecycle state of an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Guest reference on an order.
///
/// The API returns the bare identity on writes and an expanded guest when the
/// reference is populated; both forms are accepted wherever an order is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuestRef {
    Id(RecordId),
    Expanded(Box<Guest>),
}

impl GuestRef {
    /// Identity of the referenced guest, whichever form was delivered.
    #[must_use]
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Expanded(guest) => guest.id.as_ref(),
        }
    }

    /// The expanded guest, if the server populated it.
    #[must_use]
    pub fn guest(&self) -> Option<&Guest> {
        match self {
            Self::Id(_) => None,
            Self::Expanded(guest) => Some(guest),
        }
    }

    /// Whether two references point at the same guest regardless of form.
    #[must_use]
    pub fn same_guest(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

impl From<RecordId> for GuestRef {
    fn from(value: RecordId) -> Self {
        Self::Id(value)
    }
}

/// One line on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Non-negative; fractional quantities are allowed
    pub quantity: f64,
    /// Unit price
    pub price: f64,
}

impl LineItem {
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Sum of quantity × price over all line items.
#[must_use]
pub fn line_items_total(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::subtotal).sum()
}

/// A point-of-sale order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Human-facing order code, e.g. `ORD-0042`
    #[serde(rename = "orderId")]
    pub order_code: String,
    #[serde(rename = "guestId", default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestRef>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Display name of the ordering guest when the reference is expanded.
    #[must_use]
    pub fn guest_name(&self) -> Option<&str> {
        self.guest
            .as_ref()
            .and_then(GuestRef::guest)
            .map(|guest| guest.name.as_str())
    }
}

/// Partial order update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(rename = "orderId", default, skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
    #[serde(rename = "guestId", default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl Resource for Order {
    const KIND: ResourceKind = ResourceKind::Order;
    type Patch = OrderPatch;

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn select_change(event: &ChannelEvent) -> Option<&RecordChange<Self>> {
        match event {
            ChannelEvent::Order(change) => Some(change),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn order_accepts_bare_guest_id() {
        let payload = r#"{
            "_id": "o1",
            "orderId": "ORD-1234",
            "guestId": "g1",
            "items": [{ "name": "Coffee", "quantity": 2, "price": 3.5 }],
            "totalAmount": 7,
            "status": "pending"
        }"#;
        let order: Order = serde_json::from_str(payload).unwrap();
        assert_eq!(order.guest, Some(GuestRef::Id(RecordId::new("g1"))));
        assert_eq!(order.guest_name(), None);
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn fractional_quantity_decodes() {
        let payload = r#"{
            "_id": "o2",
            "orderId": "ORD-2",
            "items": [{ "name": "Cheese (kg)", "quantity": 0.5, "price": 18 }],
            "totalAmount": 9,
            "status": "pending"
        }"#;
        let order: Order = serde_json::from_str(payload).unwrap();
        assert!((order.items[0].subtotal() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn order_accepts_expanded_guest() {
        let payload = r#"{
            "_id": "o1",
            "orderId": "ORD-1234",
            "guestId": { "_id": "g1", "name": "Ada", "email": "ada@example.com" },
            "items": [],
            "totalAmount": 0,
            "status": "completed"
        }"#;
        let order: Order = serde_json::from_str(payload).unwrap();
        let guest = order.guest.as_ref().unwrap();
        assert_eq!(guest.id(), Some(&RecordId::new("g1")));
        assert_eq!(order.guest_name(), Some("Ada"));
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(guest.same_guest(&GuestRef::Id(RecordId::new("g1"))));
    }

    #[test]
    fn order_tolerates_null_guest() {
        let payload = r#"{ "_id": "o1", "orderId": "ORD-1", "guestId": null, "status": "cancelled" }"#;
        let order: Order = serde_json::from_str(payload).unwrap();
        assert_eq!(order.guest, None);
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn line_items_total_sums_subtotals() {
        let items = vec![
            LineItem {
                name: "A".to_string(),
                quantity: 2.0,
                price: 10.0,
            },
            LineItem {
                name: "B".to_string(),
                quantity: 1.0,
                price: 5.0,
            },
        ];
        assert!((line_items_total(&items) - 25.0).abs() < f64::EPSILON);
        assert!(line_items_total(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn order_status_parses_case_insensitively() {
        assert_eq!("Completed".parse::<OrderStatus>(), Ok(OrderStatus::Completed));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn patch_uses_wire_field_names() {
        let patch = OrderPatch {
            order_code: Some("ORD-7".to_string()),
            guest: Some(RecordId::new("g9")),
            total_amount: Some(12.5),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "orderId": "ORD-7", "guestId": "g9", "totalAmount": 12.5 })
        );
    }
}
