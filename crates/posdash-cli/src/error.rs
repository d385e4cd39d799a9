use std::io;

use posdash_core::api::ApiError;
use posdash_core::channel::ChannelError;
use posdash_core::config::ConfigError;
use posdash_core::editor::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] posdash_core::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyId,
    #[error("Invalid line item {0:?}; expected NAME:QUANTITY:PRICE")]
    InvalidItem(String),
    #[error("Failed to delete {0}")]
    DeleteFailed(String),
    #[error("Push channel did not connect to {0}")]
    NotConnected(String),
}
