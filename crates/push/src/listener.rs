//! Push listener: connect, authorize, subscribe, forward updates.
//!
//! One listener instance serves one tracking session.  It establishes
//! the WebSocket connection, completes the Pusher handshake, authorizes
//! and joins the per-user private channel, then forwards every
//! `ProposalGenerated` event for the tracked job onto the session's
//! snapshot channel.  The subscription is torn down deterministically
//! when the cancellation token fires.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use propgen_core::proposal::ProposalSnapshot;
use propgen_core::ProposalId;

use crate::auth::{authorize_channel, PushError};
use crate::config::PushConfig;
use crate::protocol::{
    parse_frame, pong_frame, subscribe_frame, unsubscribe_frame, user_channel, PushFrame,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Listens for push updates to one tracked proposal job.
pub struct PushListener {
    config: PushConfig,
    http: reqwest::Client,
}

impl PushListener {
    pub fn new(config: PushConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create a listener reusing an existing [`reqwest::Client`] for the
    /// authorization call.
    pub fn with_http_client(config: PushConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Run the listener until cancellation or connection loss.
    ///
    /// Forwards snapshots for `proposal_id` onto `tx`.  Every failure --
    /// connect, authorize, protocol -- is logged at warn level and ends
    /// the listener without raising: the poll fallback keeps the session
    /// converging.  No reconnection is attempted here.
    pub async fn run(
        self,
        user_id: i64,
        proposal_id: ProposalId,
        token: &str,
        tx: mpsc::Sender<ProposalSnapshot>,
        cancel: CancellationToken,
    ) {
        if let Err(e) = self.run_inner(user_id, proposal_id, token, tx, cancel).await {
            tracing::warn!(
                user_id,
                proposal_id,
                error = %e,
                "Push listener degraded, relying on poll fallback",
            );
        }
    }

    async fn run_inner(
        self,
        user_id: i64,
        proposal_id: ProposalId,
        token: &str,
        tx: mpsc::Sender<ProposalSnapshot>,
        cancel: CancellationToken,
    ) -> Result<(), PushError> {
        let url = self.config.ws_url();

        let (mut ws_stream, _response) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = connect_async(&url) => {
                result.map_err(|e| PushError::Connect(e.to_string()))?
            }
        };

        tracing::info!(user_id, "Connected to push transport");

        // Handshake: the first useful frame carries our socket id.
        let socket_id = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = wait_for_socket_id(&mut ws_stream) => result?,
        };

        // Authorize and join the per-user private channel.
        let channel = user_channel(user_id);
        let auth = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = authorize_channel(
                &self.http,
                &self.config.auth_endpoint,
                token,
                &socket_id,
                &channel,
            ) => result?,
        };

        ws_stream
            .send(Message::Text(subscribe_frame(&channel, &auth).into()))
            .await
            .map_err(|e| PushError::Protocol(e.to_string()))?;

        tracing::info!(user_id, channel = %channel, "Subscribed to private channel");

        // Forward updates until cancellation or connection loss.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Deterministic teardown: leave the channel before
                    // dropping the connection.
                    let _ = ws_stream
                        .send(Message::Text(unsubscribe_frame(&channel).into()))
                        .await;
                    let _ = ws_stream.close(None).await;
                    tracing::debug!(user_id, "Push listener cancelled");
                    return Ok(());
                }
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !handle_frame(&text, proposal_id, &mut ws_stream, &tx).await {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // Handled automatically by tungstenite.
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(user_id, ?frame, "Push connection closed by server");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(PushError::Protocol(e.to_string()));
                        }
                        None => {
                            tracing::info!(user_id, "Push connection ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Read frames until `pusher:connection_established` arrives.
async fn wait_for_socket_id(ws_stream: &mut WsStream) -> Result<String, PushError> {
    while let Some(msg) = ws_stream.next().await {
        let msg = msg.map_err(|e| PushError::Connect(e.to_string()))?;
        if let Message::Text(text) = msg {
            match parse_frame(&text) {
                Ok(PushFrame::ConnectionEstablished { socket_id }) => return Ok(socket_id),
                Ok(PushFrame::Error { message }) => return Err(PushError::Connect(message)),
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unparseable handshake frame");
                }
            }
        }
    }
    Err(PushError::Connect(
        "connection closed during handshake".into(),
    ))
}

/// React to one text frame.  Returns `false` when the session's snapshot
/// channel is gone and the listener should stop.
async fn handle_frame(
    text: &str,
    proposal_id: ProposalId,
    ws_stream: &mut WsStream,
    tx: &mpsc::Sender<ProposalSnapshot>,
) -> bool {
    match parse_frame(text) {
        Ok(PushFrame::ProposalGenerated { update, .. }) => {
            if update.proposal_id != proposal_id {
                tracing::debug!(
                    got = update.proposal_id,
                    tracked = proposal_id,
                    "Ignoring update for a different job",
                );
                return true;
            }
            let snapshot = ProposalSnapshot::from(update);
            tracing::debug!(
                proposal_id,
                status = snapshot.status.label(),
                "Push update received",
            );
            // A closed receiver means the session is gone.
            tx.send(snapshot).await.is_ok()
        }
        Ok(PushFrame::Ping) => {
            if let Err(e) = ws_stream.send(Message::Text(pong_frame().into())).await {
                tracing::warn!(error = %e, "Failed to answer push ping");
                return false;
            }
            true
        }
        Ok(PushFrame::SubscriptionSucceeded { channel }) => {
            tracing::debug!(?channel, "Push subscription confirmed");
            true
        }
        Ok(PushFrame::Error { message }) => {
            tracing::warn!(%message, "Push transport reported an error");
            true
        }
        Ok(PushFrame::ConnectionEstablished { .. } | PushFrame::Other { .. }) => true,
        Err(e) => {
            tracing::warn!(error = %e, raw_frame = %text, "Failed to parse push frame");
            true
        }
    }
}
