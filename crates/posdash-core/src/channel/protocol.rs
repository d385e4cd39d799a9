//! Engine.IO v4 / Socket.IO v4 text packet codec.
//!
//! Only the default namespace and text frames are supported. Packet layout:
//! one Engine.IO type digit, and for messages (`4`) one Socket.IO type digit,
//! an optional `/namespace,` prefix, optional ack id digits, then JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sent after the Engine.IO handshake to join the default namespace.
pub const CONNECT_PACKET: &str = "40";
/// Reply to a server heartbeat.
pub const PONG_PACKET: &str = "3";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet type: {0}")]
    UnknownPacketType(String),
    #[error("invalid packet payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

/// Engine.IO open handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

impl Handshake {
    /// Longest silence tolerated from the server: `pingInterval + pingTimeout`.
    /// `None` when the server did not announce a heartbeat.
    #[must_use]
    pub fn heartbeat_window(&self) -> Option<Duration> {
        if self.ping_interval == 0 {
            return None;
        }
        Some(Duration::from_millis(
            self.ping_interval.saturating_add(self.ping_timeout),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    /// Namespace joined
    Connect,
    /// Server left the namespace
    Disconnect,
    Event {
        name: String,
        data: Option<Value>,
    },
    ConnectError(String),
    /// Packets this client does not act on (noop, upgrade, acks, binary)
    Ignored,
}

pub fn decode(text: &str) -> Result<Packet, ProtocolError> {
    let mut chars = text.chars();
    let packet_type = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match packet_type {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '5' | '6' => Ok(Packet::Ignored),
        other => Err(ProtocolError::UnknownPacketType(other.to_string())),
    }
}

fn decode_message(text: &str) -> Result<Packet, ProtocolError> {
    let mut chars = text.chars();
    let message_type = chars.next().ok_or(ProtocolError::Empty)?;
    let payload = strip_ack_id(strip_namespace(chars.as_str()));

    match message_type {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(payload),
        '4' => Ok(Packet::ConnectError(connect_error_message(payload))),
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(ProtocolError::UnknownPacketType(format!("4{other}"))),
    }
}

fn strip_namespace(text: &str) -> &str {
    if text.starts_with('/') {
        text.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        text
    }
}

fn strip_ack_id(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(payload: &str) -> Result<Packet, ProtocolError> {
    let Value::Array(mut args) = serde_json::from_str::<Value>(payload)? else {
        return Err(ProtocolError::MalformedEvent(
            "event payload is not an array".to_string(),
        ));
    };
    if args.is_empty() {
        return Err(ProtocolError::MalformedEvent(
            "event payload has no name".to_string(),
        ));
    }
    let Value::String(name) = args.remove(0) else {
        return Err(ProtocolError::MalformedEvent(
            "event name is not a string".to_string(),
        ));
    };
    let data = if args.is_empty() {
        None
    } else {
        Some(args.remove(0))
    };
    Ok(Packet::Event { name, data })
}

fn connect_error_message(payload: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(fields)) => fields
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("connection refused")
            .to_string(),
        Ok(Value::String(message)) => message,
        _ => "connection refused".to_string(),
    }
}

/// Encode an outbound event for the default namespace.
pub fn encode_event(name: &str, data: &impl Serialize) -> Result<String, ProtocolError> {
    let body = serde_json::to_string(&(name, data))?;
    Ok(format!("42{body}"))
}
