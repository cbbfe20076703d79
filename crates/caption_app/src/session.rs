use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use caption_engine::ChannelSink;
use caption_logging::{caption_debug, caption_info, caption_warn};
use futures_util::{SinkExt, StreamExt};

use crate::server::AppState;

/// Lifecycle of one viewer socket: register, forward hub frames, feed inbound
/// frames to the controller, unregister on close.
pub async fn run(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut outbound) = ChannelSink::channel();

    // Register before announcing so the first image reaches this viewer.
    let session_id = state.hub.register(Arc::new(sink));
    caption_info!(
        "Viewer {} connected. Total viewers: {}",
        session_id,
        state.hub.len()
    );
    state.controller.viewer_connected();

    let forward = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(incoming) = receiver.next().await {
        match incoming {
            Ok(Message::Text(text)) => state.controller.viewer_message(&text),
            Ok(Message::Close(_)) => break,
            Ok(other) => caption_debug!("Viewer {} sent non-text frame: {:?}", session_id, other),
            Err(err) => {
                caption_warn!("Viewer {} socket error: {}", session_id, err);
                break;
            }
        }
    }

    state.hub.unregister(session_id);
    forward.abort();
    caption_info!(
        "Viewer {} disconnected. Total viewers: {}",
        session_id,
        state.hub.len()
    );
}
