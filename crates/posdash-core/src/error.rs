//! Error types for posdash-core

use thiserror::Error;

use crate::api::ApiError;
use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::editor::EditorError;

/// Result type alias using posdash-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in posdash-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote API request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Push channel could not be set up
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Invalid client configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Draft failed validation
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
