use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use parlor_db::Database;
use parlor_db::models::MessageRow;
use parlor_db::queries::HISTORY_CAP;
use parlor_types::models::{ChatMessage, ReplySnapshot};
use parlor_types::protocol::{ClientFrame, ServerFrame};

use crate::error::RoomError;
use crate::events::{AdminAction, RoomEvent};
use crate::moderation::{self, MAX_NAME_LEN, ModerationConfig, Rejection};
use crate::policy::RoomPolicy;
use crate::registry::{ConnectionRegistry, Session};
use crate::typing::{TYPING_TTL, TypingAggregator};

/// Presence broadcasts after a disconnect are coalesced for this long so
/// rapid reconnect cycles don't make the count flicker.
const PRESENCE_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Cheap cloneable handle for feeding events into the coordinator.
/// Connections, timers, the file watcher, and the admin plane all hold
/// one of these.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn send(&self, event: RoomEvent) {
        if self.tx.send(event).is_err() {
            warn!("room coordinator has shut down; event dropped");
        }
    }
}

/// The orchestrating core of the room. Owns every piece of shared
/// mutable state (registry, policy, typing set, moderation config, store
/// handle) and processes exactly one [`RoomEvent`] to completion at a
/// time, so no locking is needed beyond the store's own connection mutex.
pub struct RoomCoordinator {
    registry: ConnectionRegistry,
    policy: RoomPolicy,
    typing: TypingAggregator,
    moderation: ModerationConfig,
    moderation_path: Option<PathBuf>,
    store: Arc<Database>,
    /// Per-process message sequence; paired with the wall-clock timestamp
    /// it makes ids collision-free within a millisecond.
    seq: i64,
    presence_flush_pending: bool,
    events: mpsc::UnboundedReceiver<RoomEvent>,
    handle: RoomHandle,
}

impl RoomCoordinator {
    pub fn new(store: Arc<Database>, moderation_path: Option<PathBuf>) -> (Self, RoomHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RoomHandle { tx };

        let moderation = match &moderation_path {
            Some(path) => match ModerationConfig::load(path) {
                Ok(config) => config,
                Err(err) => {
                    error!("initial moderation load failed, starting empty: {err:#}");
                    ModerationConfig::default()
                }
            },
            None => ModerationConfig::default(),
        };

        let coordinator = Self {
            registry: ConnectionRegistry::default(),
            policy: RoomPolicy::default(),
            typing: TypingAggregator::default(),
            moderation,
            moderation_path,
            store,
            seq: 0,
            presence_flush_pending: false,
            events: rx,
            handle: handle.clone(),
        };
        (coordinator, handle)
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }
        info!("room coordinator stopped");
    }

    async fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connected { conn_id, outbox } => self.on_connected(conn_id, outbox),
            RoomEvent::Disconnected { conn_id } => self.on_disconnected(conn_id),
            RoomEvent::Frame { conn_id, frame } => self.on_frame(conn_id, frame).await,
            RoomEvent::TypingExpired { name, epoch } => {
                if self.typing.expire(&name, epoch) {
                    self.broadcast_typing();
                }
            }
            RoomEvent::PresenceFlush => {
                self.presence_flush_pending = false;
                self.broadcast_user_count();
            }
            RoomEvent::ReloadModeration => self.reload_moderation(),
            RoomEvent::Admin(action) => self.on_admin(action).await,
        }
    }

    // -- Session lifecycle --

    fn on_connected(&mut self, conn_id: Uuid, outbox: mpsc::UnboundedSender<ServerFrame>) {
        self.registry.register(Session::new(conn_id, outbox));
        debug!(%conn_id, "connection registered");
        self.broadcast_user_count();
    }

    fn on_disconnected(&mut self, conn_id: Uuid) {
        let Some(session) = self.registry.unregister(conn_id) else {
            return;
        };
        info!(%conn_id, name = %session.name, "connection closed");

        if self.typing.stop(&session.name) {
            self.broadcast_typing();
        }
        self.schedule_presence_flush();
    }

    // -- Inbound frames --

    async fn on_frame(&mut self, conn_id: Uuid, frame: ClientFrame) {
        match frame {
            ClientFrame::Hello { name, host } => self.on_hello(conn_id, &name, host).await,
            ClientFrame::Msg { text, reply_to } => self.on_msg(conn_id, &text, reply_to).await,
            ClientFrame::Typing { is_typing } => self.on_typing(conn_id, is_typing),
            ClientFrame::SetMode { slow, emoji_only } => {
                if self.require_host(conn_id, "setMode") {
                    self.apply_set_mode(slow, emoji_only);
                }
            }
            ClientFrame::Pin { text } => {
                if self.require_host(conn_id, "pin") {
                    self.apply_pin(&text);
                }
            }
            ClientFrame::Reset => {
                if self.require_host(conn_id, "reset") {
                    self.apply_reset().await;
                }
            }
            ClientFrame::Delete { id } => {
                if self.require_host(conn_id, "delete") {
                    self.apply_delete(&id).await;
                }
            }
        }
    }

    async fn on_hello(&mut self, conn_id: Uuid, raw_name: &str, host: bool) {
        let mut name = moderation::sanitize_text(raw_name, MAX_NAME_LEN);
        if name.is_empty() {
            name = "Guest".to_string();
        }
        info!(%conn_id, name = %name, host, "session identified");
        self.registry.set_identity(conn_id, name, host);

        let store = self.store.clone();
        let messages: Vec<ChatMessage> =
            match tokio::task::spawn_blocking(move || store.recent_messages(HISTORY_CAP)).await {
                Ok(Ok(rows)) => rows.into_iter().map(ChatMessage::from).collect(),
                Ok(Err(err)) => {
                    error!("history load failed: {err:#}");
                    Vec::new()
                }
                Err(err) => {
                    error!("history load task panicked: {err}");
                    Vec::new()
                }
            };

        self.unicast(
            conn_id,
            ServerFrame::System {
                mode: self.policy.mode(),
                pinned: Some(self.policy.pinned().to_string()),
                messages: Some(messages),
                user_count: Some(self.registry.live_count()),
            },
        );
    }

    async fn on_msg(&mut self, conn_id: Uuid, raw: &str, reply_to: Option<ReplySnapshot>) {
        let Some(session) = self.registry.find(conn_id) else {
            return;
        };
        let name = session.name.clone();
        let now_ms = now_ms();

        match moderation::evaluate(
            &self.policy,
            &self.moderation,
            session.last_sent_at_ms,
            now_ms,
            raw,
        ) {
            Ok(text) => {
                self.seq += 1;
                if let Some(session) = self.registry.find_mut(conn_id) {
                    session.last_sent_at_ms = now_ms;
                }
                let message = ChatMessage {
                    id: format!("{now_ms}-{}", self.seq),
                    name,
                    text,
                    ts: now_ms,
                    // Attached exactly as supplied; never resolved against
                    // history (it is a snapshot, not a reference).
                    reply_to,
                };

                // Fan out before persisting: a slow disk write must not
                // delay delivery, and a failed write does not cancel it.
                self.broadcast(&ServerFrame::Msg(message.clone()), None);
                self.persist(MessageRow::from_message(&message, self.seq)).await;
            }
            Err(Rejection::Suppressed) => {
                // Deliberately silent to the sender; log is the only trace.
                info!(%conn_id, name = %name, "message suppressed by moderation rules");
            }
            Err(Rejection::Empty) => {}
            Err(rejection) => {
                if let Some(message) = rejection.user_message() {
                    self.unicast(conn_id, ServerFrame::Error { message });
                }
            }
        }
    }

    fn on_typing(&mut self, conn_id: Uuid, is_typing: bool) {
        let Some(session) = self.registry.find(conn_id) else {
            return;
        };
        let name = session.name.clone();

        if is_typing {
            let epoch = self.typing.start(&name);
            let handle = self.handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(TYPING_TTL).await;
                handle.send(RoomEvent::TypingExpired { name, epoch });
            });
        } else {
            self.typing.stop(&name);
        }
        // Published unconditionally on every mutation, even when the set
        // did not change. Known inefficiency under churn, kept as-is.
        self.broadcast_typing();
    }

    // -- Privileged commands --

    fn require_host(&self, conn_id: Uuid, command: &str) -> bool {
        match self.registry.find(conn_id) {
            Some(session) if session.is_host => true,
            Some(session) => {
                // No response frame: the privileged surface is not
                // discoverable by probing.
                debug!(%conn_id, name = %session.name, command, "ignoring privileged command from guest");
                false
            }
            None => false,
        }
    }

    async fn on_admin(&mut self, action: AdminAction) {
        match action {
            AdminAction::SetMode { slow, emoji_only } => self.apply_set_mode(slow, emoji_only),
            AdminAction::SetPinned { text } => self.apply_pin(&text),
            AdminAction::Reset => self.apply_reset().await,
            AdminAction::Delete { id } => self.apply_delete(&id).await,
            AdminAction::BroadcastCount => self.broadcast_user_count(),
        }
    }

    fn apply_set_mode(&mut self, slow: i64, emoji_only: bool) {
        self.policy.set_mode(slow, emoji_only);
        info!(slow = self.policy.slow(), emoji_only = self.policy.emoji_only(), "room mode changed");
        self.broadcast(
            &ServerFrame::System {
                mode: self.policy.mode(),
                pinned: None,
                messages: None,
                user_count: None,
            },
            None,
        );
    }

    fn apply_pin(&mut self, text: &str) {
        self.policy.set_pinned(text);
        self.broadcast(
            &ServerFrame::Pin {
                text: self.policy.pinned().to_string(),
            },
            None,
        );
    }

    async fn apply_reset(&mut self) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.clear_messages()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("{}", RoomError::Persistence(err)),
            Err(err) => error!("store task panicked: {err}"),
        }
        self.broadcast(&ServerFrame::Reset, None);
    }

    async fn apply_delete(&mut self, id: &str) {
        let store = self.store.clone();
        let owned_id = id.to_string();
        match tokio::task::spawn_blocking(move || store.delete_message(&owned_id)).await {
            // Only an actual removal is announced; deleting an absent id
            // stays a silent no-op.
            Ok(Ok(true)) => self.broadcast(&ServerFrame::Delete { id: id.to_string() }, None),
            Ok(Ok(false)) => {}
            Ok(Err(err)) => error!("{}", RoomError::Persistence(err)),
            Err(err) => error!("store task panicked: {err}"),
        }
    }

    // -- Moderation reload --

    fn reload_moderation(&mut self) {
        let Some(path) = self.moderation_path.as_ref() else {
            return;
        };
        match ModerationConfig::load(path) {
            Ok(config) => {
                self.moderation = config;
                info!("moderation config reloaded from {}", path.display());
            }
            // All-or-nothing: the previous config stays active verbatim.
            Err(err) => error!("{}", RoomError::ConfigReload(err)),
        }
    }

    // -- Fan-out --

    fn broadcast(&self, frame: &ServerFrame, exclude: Option<Uuid>) {
        for session in self.registry.iter() {
            if exclude == Some(session.conn_id) {
                continue;
            }
            if session.outbox.send(frame.clone()).is_err() {
                warn!("{}", RoomError::Transport(session.conn_id));
            }
        }
    }

    fn unicast(&self, conn_id: Uuid, frame: ServerFrame) {
        if let Some(session) = self.registry.find(conn_id) {
            if session.outbox.send(frame).is_err() {
                warn!("{}", RoomError::Transport(conn_id));
            }
        }
    }

    fn broadcast_typing(&self) {
        self.broadcast(
            &ServerFrame::Typing {
                users: self.typing.names(),
            },
            None,
        );
    }

    fn broadcast_user_count(&self) {
        self.broadcast(
            &ServerFrame::UserCount {
                count: self.registry.live_count(),
            },
            None,
        );
    }

    fn schedule_presence_flush(&mut self) {
        if self.presence_flush_pending {
            return;
        }
        self.presence_flush_pending = true;
        let handle = self.handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PRESENCE_FLUSH_DELAY).await;
            handle.send(RoomEvent::PresenceFlush);
        });
    }

    async fn persist(&self, row: MessageRow) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.append_message(&row)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("{}", RoomError::Persistence(err)),
            Err(err) => error!("store task panicked: {err}"),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
