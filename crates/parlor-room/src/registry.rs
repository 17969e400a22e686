use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use parlor_types::protocol::ServerFrame;

/// One live connection's identity and transient state. Privilege is
/// caller-asserted — there is no external authentication; this trust
/// model is deliberate for a small trusted deployment.
#[derive(Debug)]
pub struct Session {
    pub conn_id: Uuid,
    pub name: String,
    pub is_host: bool,
    /// Unix millis of the last *accepted* message; 0 = never. Read by the
    /// slow-mode check via wall-clock comparison, so no timer is involved.
    pub last_sent_at_ms: i64,
    pub outbox: mpsc::UnboundedSender<ServerFrame>,
}

impl Session {
    pub fn new(conn_id: Uuid, outbox: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self {
            conn_id,
            name: "Guest".to_string(),
            is_host: false,
            last_sent_at_ms: 0,
            outbox,
        }
    }
}

/// Tracks live connections. Mutated only by the coordinator.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<Uuid, Session>,
}

impl ConnectionRegistry {
    pub fn register(&mut self, session: Session) {
        self.sessions.insert(session.conn_id, session);
    }

    pub fn unregister(&mut self, conn_id: Uuid) -> Option<Session> {
        self.sessions.remove(&conn_id)
    }

    pub fn set_identity(&mut self, conn_id: Uuid, name: String, is_host: bool) {
        if let Some(session) = self.sessions.get_mut(&conn_id) {
            session.name = name;
            session.is_host = is_host;
        }
    }

    pub fn find(&self, conn_id: Uuid) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    pub fn find_mut(&mut self, conn_id: Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(&conn_id)
    }

    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
