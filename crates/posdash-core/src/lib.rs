//! posdash-core - Core library for posdash
//!
//! This crate contains the guest/order models, the HTTP record gateway, the
//! push channel client, and the live collection controllers shared by every
//! posdash front end.

pub mod api;
pub mod channel;
pub mod collection;
pub mod config;
pub mod editor;
pub mod error;
pub mod health;
pub mod models;
pub mod status;
pub mod sync_log;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::{Guest, Order, RecordId};
