//! WebSocket handler
//!
//! Drives one socket through its lifecycle: handshake, registration,
//! subscription loading, the read loop, and a single teardown.

use crate::connection::Connection;
use crate::handlers::{ConnectParams, HandshakeError, MessageDispatcher};
use crate::protocol::{ClientFrame, Frame};
use crate::server::GatewayState;
use aeon_core::UserId;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, params, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, params: ConnectParams, socket: WebSocket) {
    let user_id = match state.handshake().resolve(&params).await {
        Ok(user_id) => user_id,
        Err(e) => {
            reject(socket, &e).await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Frame>(state.settings().outbound_buffer.max(1));
    let connection = Connection::new(user_id, tx);

    let came_online = state.registry().connect(connection.clone());
    load_subscriptions(&state, user_id).await;
    if came_online {
        state.router().notify_presence(user_id, true).await;
    }

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection.id(),
        "WebSocket connection established"
    );

    // Frames queued so far (the greeting included) wait in the channel until
    // the writer starts.
    let (mut ws_sink, mut ws_stream) = socket.split();

    let connection_send = connection.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sink.send(Message::Text(frame.to_string())).await.is_err() {
                tracing::debug!(
                    connection_id = %connection_send.id(),
                    "Failed to write to WebSocket"
                );
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_message(&state_recv, &connection_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        "Binary frame ignored"
                    );
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Control frames are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        connection_id = %connection_recv.id(),
                        "Client closed connection"
                    );
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection.id(), "Receive task ended");
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection.id(), "Send task ended");
        }
        () = connection.closed() => {
            tracing::debug!(connection_id = %connection.id(), "Connection closed by registry");
        }
    }
    stop_tasks([recv_task, send_task]).await;

    cleanup_connection(&state, &connection).await;
}

/// Abort the socket tasks and wait until neither can run again
///
/// An aborted task keeps running until its next yield, so a frame handler in
/// the middle of a poll could still subscribe the user after `disconnect`.
async fn stop_tasks(tasks: [JoinHandle<()>; 2]) {
    for task in &tasks {
        task.abort();
    }
    for task in tasks {
        // The task that ended the select has already been polled to completion
        if !task.is_finished() {
            let _ = task.await;
        }
    }
}

/// Close a socket whose handshake failed
async fn reject(mut socket: WebSocket, error: &HandshakeError) {
    let code = error.close_code();
    tracing::warn!(close_code = code.as_u16(), error = %error, "Handshake rejected");

    let close = CloseFrame {
        code: code.as_u16(),
        reason: error.reason().into(),
    };
    if socket.send(Message::Close(Some(close))).await.is_err() {
        tracing::debug!("Client went away before the close frame");
    }
}

/// Subscribe the user to every chat they durably belong to
async fn load_subscriptions(state: &GatewayState, user_id: UserId) {
    match state.memberships().chat_ids_for_user(user_id).await {
        Ok(chats) => {
            for chat_id in &chats {
                state.registry().join_chat(user_id, *chat_id);
            }
            tracing::debug!(user_id = %user_id, chats = chats.len(), "Subscriptions loaded");
        }
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to load chat memberships"
            );
        }
    }
}

/// Handle a text message from the client
async fn handle_text_message(state: &GatewayState, connection: &Arc<Connection>, text: &str) {
    let Some(frame) = ClientFrame::parse(text) else {
        tracing::debug!(connection_id = %connection.id(), "Dropping malformed frame");
        return;
    };

    if let Err(e) = MessageDispatcher::dispatch(state, connection, frame).await {
        if e.is_client_error() {
            tracing::debug!(connection_id = %connection.id(), error = %e, "Frame refused");
        } else {
            tracing::warn!(connection_id = %connection.id(), error = %e, "Handler error");
        }
    }
}

/// Tear down a connection exactly once
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    connection.close();
    let outcome = state.router().disconnect(connection).await;

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = %connection.id(),
        age = ?connection.age(),
        outcome = ?outcome,
        "WebSocket connection closed"
    );
}
