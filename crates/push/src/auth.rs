//! Private-channel authorization.
//!
//! Before subscribing to `private-user.{id}` the client must obtain a
//! signature from the backend's broadcasting-auth endpoint, proving the
//! bearer credential is allowed on that channel.

use serde::Deserialize;

/// Errors from the push transport layer.
///
/// These never surface to the tracking caller; the listener logs them
/// and degrades to polling-only mode.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The WebSocket connection could not be established.
    #[error("Push connection failed: {0}")]
    Connect(String),

    /// Channel authorization was rejected or unreachable.
    #[error("Channel authorization failed: {0}")]
    Auth(String),

    /// A malformed or unexpected frame on an established connection.
    #[error("Push protocol error: {0}")]
    Protocol(String),
}

/// Response of the authorization endpoint.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: String,
}

/// Request a subscription signature for a private channel.
///
/// POSTs `{socket_id, channel_name}` with the bearer token and returns
/// the opaque `auth` signature to include in the subscribe frame.
pub async fn authorize_channel(
    http: &reqwest::Client,
    auth_endpoint: &str,
    token: &str,
    socket_id: &str,
    channel: &str,
) -> Result<String, PushError> {
    let response = http
        .post(auth_endpoint)
        .bearer_auth(token)
        .json(&serde_json::json!({
            "socket_id": socket_id,
            "channel_name": channel,
        }))
        .send()
        .await
        .map_err(|e| PushError::Auth(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PushError::Auth(format!(
            "auth endpoint returned {status} for {channel}"
        )));
    }

    let body: AuthResponse = response
        .json()
        .await
        .map_err(|e| PushError::Auth(e.to_string()))?;

    Ok(body.auth)
}
