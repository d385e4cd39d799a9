//! Data models for posdash

mod backend;
mod guest;
mod order;
mod record;
mod sync_status;

pub use backend::{AtlasStatus, BackendStatus, DatabaseStatus};
pub use guest::{Guest, GuestPatch};
pub use order::{line_items_total, GuestRef, LineItem, Order, OrderPatch, OrderStatus};
pub use record::{RecordId, Resource, ResourceKind};
pub use sync_status::{SyncCollection, SyncDirection, SyncPhase, SyncStatusMessage};
