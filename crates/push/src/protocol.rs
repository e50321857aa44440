//! Pusher-protocol frame types and parser.
//!
//! The push service speaks the Pusher wire protocol: every frame is JSON
//! of the shape `{"event": "<name>", "channel": "...", "data": ...}`,
//! where `data` for server-sent frames is a *string* containing JSON
//! (double-encoded).  This module decodes the frames the listener cares
//! about into a typed [`PushFrame`] and builds the client-sent frames.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use propgen_core::proposal::ProposalUpdate;

/// Event name the backend broadcasts when a job's fields change.
pub const EVENT_PROPOSAL_GENERATED: &str = "ProposalGenerated";

/// Name of the per-user private channel.
pub fn user_channel(user_id: i64) -> String {
    format!("private-user.{user_id}")
}

/// Raw envelope of every Pusher frame.
#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Frames the listener reacts to.
#[derive(Debug)]
pub enum PushFrame {
    /// Handshake acknowledgement carrying the connection's socket id.
    ConnectionEstablished { socket_id: String },
    /// The private-channel subscription was accepted.
    SubscriptionSucceeded { channel: Option<String> },
    /// Server keepalive; must be answered with a pong.
    Ping,
    /// Protocol-level error from the server.
    Error { message: String },
    /// A proposal job update for this user.
    ProposalGenerated {
        channel: Option<String>,
        update: ProposalUpdate,
    },
    /// Any event the listener does not handle.
    Other { event: String },
}

/// Errors from frame parsing.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Frame `{event}` has an invalid payload: {reason}")]
    BadPayload { event: String, reason: String },
}

/// Payload of `pusher:connection_established`.
#[derive(Debug, Deserialize)]
struct ConnectionEstablishedData {
    socket_id: String,
}

/// Payload of `pusher:error`.
#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: String,
}

/// Decode a frame's `data`, which may be double-encoded as a string.
fn decode_data<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    let result = match data {
        Value::String(inner) => serde_json::from_str(&inner),
        other => serde_json::from_value(other),
    };
    result.map_err(|e| ProtocolError::BadPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

/// Parse one WebSocket text frame into a [`PushFrame`].
pub fn parse_frame(text: &str) -> Result<PushFrame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)?;

    let frame = match raw.event.as_str() {
        "pusher:connection_established" => {
            let data: ConnectionEstablishedData = decode_data(&raw.event, raw.data)?;
            PushFrame::ConnectionEstablished {
                socket_id: data.socket_id,
            }
        }
        "pusher_internal:subscription_succeeded" => PushFrame::SubscriptionSucceeded {
            channel: raw.channel,
        },
        "pusher:ping" => PushFrame::Ping,
        "pusher:error" => {
            let data: ErrorData = decode_data(&raw.event, raw.data)?;
            PushFrame::Error {
                message: data.message,
            }
        }
        EVENT_PROPOSAL_GENERATED => {
            let update: ProposalUpdate = decode_data(&raw.event, raw.data)?;
            PushFrame::ProposalGenerated {
                channel: raw.channel,
                update,
            }
        }
        _ => PushFrame::Other { event: raw.event },
    };

    Ok(frame)
}

/// Build a `pusher:subscribe` frame for a signed private channel.
pub fn subscribe_frame(channel: &str, auth: &str) -> String {
    serde_json::json!({
        "event": "pusher:subscribe",
        "data": { "channel": channel, "auth": auth },
    })
    .to_string()
}

/// Build a `pusher:unsubscribe` frame.
pub fn unsubscribe_frame(channel: &str) -> String {
    serde_json::json!({
        "event": "pusher:unsubscribe",
        "data": { "channel": channel },
    })
    .to_string()
}

/// Build the answer to a `pusher:ping`.
pub fn pong_frame() -> String {
    serde_json::json!({ "event": "pusher:pong", "data": {} }).to_string()
}
