//! WebSocket transport.
//!
//! Each socket runs in its own task. Frames are handled one at a time in
//! arrival order, and replies go through a channel to a writer task so a
//! slow client cannot block the reader.

use crate::app::AppState;
use crate::connection::Connection;
use crate::protocol::ServerEvent;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const OUTBOUND_BUFFER: usize = 32;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(event.encode().into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let (connection, greeting) = Connection::open(state).await;
    for event in greeting {
        send(&outbound_tx, event).await;
    }

    while let Some(result) = ws_rx.next().await {
        let frame = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(connection_id = %connection.id(), error = %e, "WebSocket error");
                break;
            }
        };

        let reply = connection.handle_frame(frame.as_str()).await;
        send(&outbound_tx, reply).await;
    }

    connection.close().await;

    // Let queued replies flush before the writer goes away.
    drop(outbound_tx);
    if let Err(e) = send_task.await {
        debug!(error = %e, "WebSocket writer task ended abnormally");
    }
}

async fn send(tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if tx.send(event).await.is_err() {
        debug!("outbound channel closed, dropping event");
    }
}
