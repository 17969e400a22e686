use tokio::sync::mpsc;
use uuid::Uuid;

use parlor_types::protocol::{ClientFrame, ServerFrame};

/// Every external stimulus the room reacts to, funneled through one
/// channel so the coordinator processes exactly one at a time. Timer
/// firings and admin calls go through here too — nothing touches room
/// state from outside the coordinator task.
#[derive(Debug)]
pub enum RoomEvent {
    /// A WebSocket finished its upgrade; `outbox` is the per-connection
    /// ordered delivery channel drained by that connection's writer task.
    Connected {
        conn_id: Uuid,
        outbox: mpsc::UnboundedSender<ServerFrame>,
    },

    /// Connection closed, errored, or failed its heartbeat.
    Disconnected { conn_id: Uuid },

    /// A parsed inbound frame from a live connection.
    Frame { conn_id: Uuid, frame: ClientFrame },

    /// A typing-indicator TTL ran out. Stale if the epoch no longer
    /// matches (the user typed again in the meantime).
    TypingExpired { name: String, epoch: u64 },

    /// Coalesced presence-count broadcast after disconnects.
    PresenceFlush,

    /// The moderation config file changed on disk.
    ReloadModeration,

    /// Privileged action from the HTTP control plane.
    Admin(AdminAction),
}

/// Host-privileged commands the admin control plane can inject without a
/// WebSocket session.
#[derive(Debug)]
pub enum AdminAction {
    SetMode { slow: i64, emoji_only: bool },
    SetPinned { text: String },
    Reset,
    Delete { id: String },
    /// Re-broadcast the current presence count to every session.
    BroadcastCount,
}
