//! WebSocket connection lifecycle: registration, frame parsing, and teardown.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::session_service,
    state::SharedState,
};

/// Handle the full lifecycle of one client WebSocket connection.
///
/// The connection is registered and handed its identifier immediately; it must
/// then bind within the identification timeout (by joining as a participant,
/// or by the host presenting the id over the REST bind endpoint) or it is
/// dropped as idle.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = state.connections().register(outbound_tx.clone());
    info!(connection_id = %connection_id, "client connected");

    send_message(
        &outbound_tx,
        &ServerMessage::ClientId { connection_id },
    );

    let ident_timeout = state.config().ident_timeout();
    let mut bound = false;

    loop {
        let frame = if bound {
            receiver.next().await
        } else {
            match tokio::time::timeout(ident_timeout, receiver.next()).await {
                Ok(frame) => frame,
                Err(_) => {
                    // The host binds out of band; only close connections that
                    // are still anonymous when the timer fires.
                    let still_anonymous = state
                        .connections()
                        .resolve(connection_id)
                        .is_some_and(|connection| connection.binding.is_none());
                    if still_anonymous {
                        warn!(connection_id = %connection_id, "connection stayed anonymous; closing");
                        let _ = outbound_tx.send(Message::Close(None));
                        break;
                    }
                    bound = true;
                    continue;
                }
            }
        };

        let Some(message) = frame else {
            break;
        };

        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text, "received client message");
                match ClientMessage::from_json_str(&text) {
                    Ok(parsed) => {
                        session_service::dispatch(&state, connection_id, parsed).await;
                        if !bound {
                            bound = state
                                .connections()
                                .resolve(connection_id)
                                .is_some_and(|connection| connection.binding.is_some());
                        }
                    }
                    Err(err) => {
                        // Malformed frames are dropped without a reply.
                        warn!(connection_id = %connection_id, error = %err, "failed to parse client message");
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::handle_disconnect(&state, connection_id).await;
    info!(connection_id = %connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a server message and push it onto a connection's writer channel.
///
/// Delivery failures mean the socket is going away; the reader loop observes
/// that separately, so they are only logged here.
pub fn send_message(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            return;
        }
    };

    if tx.send(Message::Text(payload.into())).is_err() {
        debug!("writer channel closed; dropping outbound message");
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
