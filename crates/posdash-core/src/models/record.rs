//! Record identity and resource kinds

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelEvent, RecordChange};

/// Server-assigned opaque record identifier.
///
/// Identities are never minted on the client; a record without one has not
/// been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix used when listing records in narrow columns.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(8)
            .map_or(self.0.as_str(), |(end, _)| &self.0[..end])
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One of the two managed record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Guest,
    Order,
}

impl ResourceKind {
    /// REST collection path segment (`/guests`, `/orders`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Guest => "guests",
            Self::Order => "orders",
        }
    }

    /// Prefix of push event names (`guest:created`, ...).
    #[must_use]
    pub const fn event_prefix(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Order => "order",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_prefix())
    }
}

/// A record type served by the remote API and mirrored in live collections.
pub trait Resource:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Partial update payload sent with `PUT`.
    type Patch: Serialize + fmt::Debug + Send + Sync;

    fn id(&self) -> Option<&RecordId>;

    /// Extract the change for this resource kind from a push event.
    fn select_change(event: &ChannelEvent) -> Option<&RecordChange<Self>>;
}
