use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use parlor_types::protocol::{ClientFrame, ServerFrame};

use crate::coordinator::RoomHandle;
use crate::events::RoomEvent;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle one WebSocket connection for its whole lifetime.
///
/// The reader and writer halves run as independent tasks so a slow or
/// dead peer never blocks the coordinator or the other connections: the
/// reader only parses frames and forwards them as events, and the writer
/// drains this connection's outbox at whatever pace the socket allows.
pub async fn handle_socket(socket: WebSocket, room: RoomHandle) {
    let conn_id = Uuid::new_v4();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ServerFrame>();

    room.send(RoomEvent::Connected {
        conn_id,
        outbox: outbox_tx,
    });
    debug!(%conn_id, "websocket connected");

    let (mut sender, mut receiver) = socket.split();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Writer: outbox frames in coordinator order, plus heartbeat pings.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                frame = outbox_rx.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(%conn_id, "frame serialization failed: {err}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(%conn_id, "heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader: parse inbound frames and forward them to the coordinator.
    let room_recv = room.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => room_recv.send(RoomEvent::Frame { conn_id, frame }),
                    Err(err) => {
                        // Validation error: logged, never broadcast, and no
                        // error frame back (only rate-limit and policy
                        // rejections are user-visible).
                        let preview: String = text.chars().take(200).collect();
                        warn!(%conn_id, "bad frame: {} -- raw: {}", err, preview);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever half finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    room.send(RoomEvent::Disconnected { conn_id });
    debug!(%conn_id, "websocket disconnected");
}
