//! Validated drafts for creating and editing guests and orders.
//!
//! Drafts hold raw form input. Validation happens when a draft is turned into
//! a record or a patch, and numeric line item fields are parsed at the edge
//! with [`LineItemEdit::parse`] so a draft never holds a malformed number.

use std::fmt;

use rand::Rng;
use thiserror::Error;

use crate::api::RecordGateway;
use crate::collection::CollectionController;
use crate::models::{
    line_items_total, Guest, GuestPatch, GuestRef, LineItem, Order, OrderPatch, OrderStatus,
    RecordId,
};
use crate::util::normalize_text_option;

const NEW_ITEM_NAME: &str = "New Item";
const NEW_ITEM_PRICE: f64 = 10.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("No line item at index {index}")]
    NoSuchItem { index: usize },

    #[error("Invalid {field}: {value:?}")]
    InvalidNumber { field: LineItemField, value: String },
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

fn required(value: &str, field: &'static str) -> EditorResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EditorError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn non_negative(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Guest form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl GuestDraft {
    #[must_use]
    pub fn from_guest(guest: &Guest) -> Self {
        Self {
            name: guest.name.clone(),
            email: guest.email.clone(),
            phone: guest.phone.clone().unwrap_or_default(),
            address: guest.address.clone().unwrap_or_default(),
        }
    }

    /// Check required fields; returns the draft with surrounding whitespace
    /// removed.
    pub fn validate(self) -> EditorResult<Self> {
        Ok(Self {
            name: required(&self.name, "name")?,
            email: required(&self.email, "email")?,
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        })
    }

    /// Validate into an unsaved guest.
    pub fn into_new_guest(self) -> EditorResult<Guest> {
        let draft = self.validate()?;
        Ok(Guest {
            phone: normalize_text_option(Some(draft.phone)),
            address: normalize_text_option(Some(draft.address)),
            ..Guest::new(draft.name, draft.email)
        })
    }

    /// Validate into a full-field update.
    ///
    /// Blank optional fields are sent as empty strings so the server clears
    /// them instead of keeping the stored value.
    pub fn into_patch(self) -> EditorResult<GuestPatch> {
        let draft = self.validate()?;
        Ok(GuestPatch {
            name: Some(draft.name),
            email: Some(draft.email),
            phone: Some(draft.phone),
            address: Some(draft.address),
        })
    }
}

/// Editable line item column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemField {
    Name,
    Quantity,
    Price,
}

impl fmt::Display for LineItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Price => "price",
        })
    }
}

/// A single already-parsed line item change.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemEdit {
    Name(String),
    Quantity(f64),
    Price(f64),
}

impl LineItemEdit {
    /// Parse raw input for `field`; quantities and prices must be
    /// non-negative numbers.
    pub fn parse(field: LineItemField, raw: &str) -> EditorResult<Self> {
        let invalid = || EditorError::InvalidNumber {
            field,
            value: raw.to_string(),
        };
        match field {
            LineItemField::Name => Ok(Self::Name(raw.to_string())),
            LineItemField::Quantity => non_negative(raw).map(Self::Quantity).ok_or_else(invalid),
            LineItemField::Price => non_negative(raw).map(Self::Price).ok_or_else(invalid),
        }
    }

    fn apply(self, item: &mut LineItem) {
        match self {
            Self::Name(name) => item.name = name,
            Self::Quantity(quantity) => item.quantity = quantity,
            Self::Price(price) => item.price = price,
        }
    }
}

/// Order form input with an editable line item list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub id: Option<RecordId>,
    pub order_code: String,
    pub guest: Option<RecordId>,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub total_amount: f64,
}

impl OrderDraft {
    /// Blank order with a random `ORD-<n>` code, preselecting `default_guest`.
    #[must_use]
    pub fn new_with_code(default_guest: Option<RecordId>) -> Self {
        let number = rand::rng().random_range(0..10_000);
        Self {
            id: None,
            order_code: format!("ORD-{number}"),
            guest: default_guest,
            items: Vec::new(),
            status: OrderStatus::Pending,
            total_amount: 0.0,
        }
    }

    /// Editable copy of an existing order; an expanded guest is flattened to
    /// its identity.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            order_code: order.order_code.clone(),
            guest: order.guest.as_ref().and_then(GuestRef::id).cloned(),
            items: order.items.clone(),
            status: order.status,
            total_amount: order.total_amount,
        }
    }

    pub fn add_item(&mut self) {
        self.items.push(LineItem {
            name: NEW_ITEM_NAME.to_string(),
            quantity: 1.0,
            price: NEW_ITEM_PRICE,
        });
    }

    pub fn update_item(&mut self, index: usize, edit: LineItemEdit) -> EditorResult<()> {
        let item = self
            .items
            .get_mut(index)
            .ok_or(EditorError::NoSuchItem { index })?;
        edit.apply(item);
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> EditorResult<LineItem> {
        if index >= self.items.len() {
            return Err(EditorError::NoSuchItem { index });
        }
        Ok(self.items.remove(index))
    }

    #[must_use]
    pub fn compute_total(&self) -> f64 {
        line_items_total(&self.items)
    }

    /// Check required fields and recompute the total from the line items.
    pub fn prepare(&mut self) -> EditorResult<()> {
        self.order_code = required(&self.order_code, "order code")?;
        if self.guest.is_none() {
            return Err(EditorError::MissingField("guest"));
        }
        self.total_amount = self.compute_total();
        Ok(())
    }

    /// Prepared order ready for `POST`.
    pub fn to_order(&mut self) -> EditorResult<Order> {
        self.prepare()?;
        Ok(Order {
            id: None,
            order_code: self.order_code.clone(),
            guest: self.guest.clone().map(GuestRef::from),
            items: self.items.clone(),
            total_amount: self.total_amount,
            status: self.status,
            created_at: None,
        })
    }

    /// Prepared patch ready for `PUT`.
    pub fn to_patch(&mut self) -> EditorResult<OrderPatch> {
        self.prepare()?;
        Ok(OrderPatch {
            order_code: Some(self.order_code.clone()),
            guest: self.guest.clone(),
            items: Some(self.items.clone()),
            total_amount: Some(self.total_amount),
            status: Some(self.status),
        })
    }
}

/// Create or update a guest depending on whether `id` is present.
pub async fn save_guest<G: RecordGateway<Guest>>(
    controller: &CollectionController<Guest, G>,
    id: Option<&RecordId>,
    draft: GuestDraft,
) -> crate::Result<Guest> {
    let saved = match id {
        Some(id) => controller.update(id, &draft.into_patch()?).await?,
        None => controller.create(&draft.into_new_guest()?).await?,
    };
    Ok(saved)
}

/// Create or update an order depending on whether the draft has an identity.
pub async fn save_order<G: RecordGateway<Order>>(
    controller: &CollectionController<Order, G>,
    mut draft: OrderDraft,
) -> crate::Result<Order> {
    let saved = match draft.id.clone() {
        Some(id) => controller.update(&id, &draft.to_patch()?).await?,
        None => controller.create(&draft.to_order()?).await?,
    };
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{PushChannel, ReconnectPolicy};
    use crate::testing::MemoryGateway;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn channel() -> Arc<PushChannel> {
        Arc::new(PushChannel::new("http://localhost:5000", ReconnectPolicy::default()).unwrap())
    }

    fn item(name: &str, quantity: f64, price: f64) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity,
            price,
        }
    }

    #[test]
    fn guest_draft_requires_name_and_email() {
        let draft = GuestDraft {
            name: "  ".to_string(),
            email: "ada@example.com".to_string(),
            ..GuestDraft::default()
        };
        assert_eq!(
            draft.into_new_guest().unwrap_err(),
            EditorError::MissingField("name")
        );

        let draft = GuestDraft {
            name: "Ada".to_string(),
            ..GuestDraft::default()
        };
        assert_eq!(
            draft.into_patch().unwrap_err(),
            EditorError::MissingField("email")
        );
    }

    #[test]
    fn guest_draft_drops_blank_optional_fields() {
        let draft = GuestDraft {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            phone: "   ".to_string(),
            address: "12 Analytical Way".to_string(),
        };
        let guest = draft.into_new_guest().unwrap();
        assert_eq!(guest.name, "Ada");
        assert_eq!(guest.phone, None);
        assert_eq!(guest.address.as_deref(), Some("12 Analytical Way"));
        assert_eq!(guest.id, None);
    }

    #[test]
    fn guest_patch_sends_cleared_optional_fields() {
        let draft = GuestDraft {
            name: "Ada".to_string(),
            email: "a@x".to_string(),
            phone: String::new(),
            address: "  ".to_string(),
        };
        let body = serde_json::to_value(draft.into_patch().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "Ada",
                "email": "a@x",
                "phone": "",
                "address": "",
            })
        );
    }

    #[test]
    fn new_order_has_generated_code_and_pending_status() {
        let draft = OrderDraft::new_with_code(Some(RecordId::new("g1")));
        let number: u32 = draft
            .order_code
            .strip_prefix("ORD-")
            .and_then(|digits| digits.parse().ok())
            .unwrap();
        assert!(number < 10_000);
        assert_eq!(draft.status, OrderStatus::Pending);
        assert!(draft.items.is_empty());
        assert_eq!(draft.guest, Some(RecordId::new("g1")));
    }

    #[test]
    fn from_order_flattens_expanded_guest() {
        let guest = Guest {
            id: Some(RecordId::new("g1")),
            ..Guest::new("Ada", "ada@example.com")
        };
        let order = Order {
            id: Some(RecordId::new("o1")),
            order_code: "ORD-7".to_string(),
            guest: Some(GuestRef::Expanded(Box::new(guest))),
            items: vec![item("Tea", 1.0, 3.0)],
            total_amount: 3.0,
            status: OrderStatus::Completed,
            created_at: None,
        };
        let draft = OrderDraft::from_order(&order);
        assert_eq!(draft.guest, Some(RecordId::new("g1")));
        assert_eq!(draft.id, Some(RecordId::new("o1")));
        assert_eq!(draft.status, OrderStatus::Completed);
    }

    #[test]
    fn line_items_can_be_added_edited_and_removed() {
        let mut draft = OrderDraft::new_with_code(None);
        draft.add_item();
        draft.add_item();
        assert_eq!(draft.items[0], item("New Item", 1.0, 10.0));

        draft
            .update_item(1, LineItemEdit::parse(LineItemField::Quantity, "3").unwrap())
            .unwrap();
        draft
            .update_item(1, LineItemEdit::parse(LineItemField::Name, "Coffee").unwrap())
            .unwrap();
        assert_eq!(draft.items[1], item("Coffee", 3.0, 10.0));

        assert_eq!(draft.remove_item(0).unwrap().name, "New Item");
        assert_eq!(draft.items.len(), 1);
        assert_eq!(
            draft.remove_item(5).unwrap_err(),
            EditorError::NoSuchItem { index: 5 }
        );
        assert_eq!(
            draft
                .update_item(2, LineItemEdit::Price(1.0))
                .unwrap_err(),
            EditorError::NoSuchItem { index: 2 }
        );
    }

    #[test]
    fn numeric_fields_are_validated_at_parse() {
        assert_eq!(
            LineItemEdit::parse(LineItemField::Price, "4.50").unwrap(),
            LineItemEdit::Price(4.5)
        );
        assert_eq!(
            LineItemEdit::parse(LineItemField::Quantity, " 1.5 ").unwrap(),
            LineItemEdit::Quantity(1.5)
        );
        for (field, raw) in [
            (LineItemField::Quantity, "-1"),
            (LineItemField::Quantity, "two"),
            (LineItemField::Price, "-0.5"),
            (LineItemField::Price, "NaN"),
            (LineItemField::Price, ""),
        ] {
            assert!(matches!(
                LineItemEdit::parse(field, raw),
                Err(EditorError::InvalidNumber { .. })
            ));
        }
    }

    #[test]
    fn prepare_overwrites_stale_total() {
        let mut draft = OrderDraft {
            guest: Some(RecordId::new("g1")),
            items: vec![item("Tea", 2.0, 10.0), item("Cake", 1.0, 5.0)],
            total_amount: 999.0,
            ..OrderDraft::new_with_code(None)
        };
        let order = draft.to_order().unwrap();
        assert!((order.total_amount - 25.0).abs() < f64::EPSILON);
        assert!((draft.total_amount - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn prepare_requires_code_and_guest() {
        let mut draft = OrderDraft::new_with_code(None);
        assert_eq!(draft.prepare().unwrap_err(), EditorError::MissingField("guest"));

        draft.guest = Some(RecordId::new("g1"));
        draft.order_code = " ".to_string();
        assert_eq!(
            draft.to_patch().unwrap_err(),
            EditorError::MissingField("order code")
        );
    }

    #[tokio::test]
    async fn save_order_creates_then_updates() {
        let gateway = Arc::new(MemoryGateway::<Order>::default());
        let controller = CollectionController::new(Arc::clone(&gateway), channel());
        controller.activate().await;

        let mut draft = OrderDraft::new_with_code(Some(RecordId::new("g1")));
        draft.add_item();
        let created = save_order(&controller, draft).await.unwrap();
        assert!(created.id.is_some());
        assert!((created.total_amount - 10.0).abs() < f64::EPSILON);

        let mut draft = OrderDraft::from_order(&created);
        draft.update_item(0, LineItemEdit::Quantity(4.0)).unwrap();
        draft.status = OrderStatus::Completed;
        let updated = save_order(&controller, draft).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, OrderStatus::Completed);
        assert!((updated.total_amount - 40.0).abs() < f64::EPSILON);
        assert_eq!(controller.records().len(), 1);
    }

    #[tokio::test]
    async fn save_guest_rejects_invalid_draft_without_request() {
        let gateway = Arc::new(MemoryGateway::<Guest>::default());
        let controller = CollectionController::new(Arc::clone(&gateway), channel());
        controller.activate().await;

        let error = save_guest(&controller, None, GuestDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            crate::Error::Editor(EditorError::MissingField("name"))
        ));
        assert!(gateway.stored().is_empty());

        let draft = GuestDraft {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            ..GuestDraft::default()
        };
        let created = save_guest(&controller, None, draft).await.unwrap();
        let id = created.id.clone().unwrap();
        let renamed = GuestDraft {
            name: "Ada Lovelace".to_string(),
            ..GuestDraft::from_guest(&created)
        };
        let updated = save_guest(&controller, Some(&id), renamed).await.unwrap();
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(gateway.stored().len(), 1);
    }

    #[tokio::test]
    async fn save_guest_clears_phone_on_the_server() {
        let mut stored = Guest::new("Ada", "ada@example.com");
        stored.id = Some(RecordId::new("g1"));
        stored.phone = Some("555".to_string());
        let gateway = Arc::new(MemoryGateway::with_records(vec![stored.clone()]));
        let controller = CollectionController::new(Arc::clone(&gateway), channel());

        let draft = GuestDraft {
            phone: String::new(),
            ..GuestDraft::from_guest(&stored)
        };
        let updated = save_guest(&controller, stored.id.as_ref(), draft)
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some(""));
        assert_eq!(gateway.stored()[0].phone.as_deref(), Some(""));
    }
}
