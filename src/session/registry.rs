use super::token::Token;
use crate::table::TableId;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    InvalidToken,
}

/// Validates a display name against spec §4.4: 1-20 characters drawn from
/// {alphanumeric, space, dash, underscore}. Returns the trimmed name on
/// success.
pub fn validate_name(raw: &str) -> Result<String, crate::error::ErrorKind> {
    let name = raw.trim().to_string();
    let ok_len = !name.is_empty() && name.chars().count() <= 20;
    let ok_chars = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_');
    if ok_len && ok_chars {
        Ok(name)
    } else {
        Err(crate::error::ErrorKind::InvalidName)
    }
}

#[cfg(test)]
mod validate_name_tests {
    use super::validate_name;

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_name("alice").is_ok());
        assert!(validate_name("al_ice-2").is_ok());
        assert!(validate_name("al ice").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(21)).is_err());
        assert!(validate_name(&"a".repeat(20)).is_ok());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(validate_name("alice!").is_err());
        assert!(validate_name("<script>").is_err());
    }
}

/// The live connection attached to a session, if any. A session can exist
/// with no attachment (its owning socket dropped without closing cleanly);
/// `Broadcast` skips those silently (spec §4.6: "a session with no attached
/// connection is simply not delivered to").
struct Attachment {
    outbound: mpsc::Sender<ServerMessage>,
    kill: std::sync::Arc<Notify>,
}

struct SessionEntry {
    token: Token,
    name: String,
    table: Option<TableId>,
    attachment: Option<Attachment>,
}

/// The one shared-mutable structure in the process (spec §4.6). Every
/// critical section here is short and does no I/O under the lock, the same
/// discipline the teacher's `Casino` applies to its `RwLock<HashMap<RoomId,
/// RoomHandle>>`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    by_token: RwLock<HashMap<Token, SessionId>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            by_token: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Mints a brand new session with a generated name and no table seat.
    pub fn create_session(&self, name: String) -> (SessionId, Token) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = Token::generate();
        let entry = SessionEntry {
            token: token.clone(),
            name,
            table: None,
            attachment: None,
        };
        self.sessions.write().expect("poisoned").insert(id, entry);
        self.by_token
            .write()
            .expect("poisoned")
            .insert(token.clone(), id);
        (id, token)
    }

    /// Looks up the session owning `token`, for a reconnecting client
    /// (spec §4.6's `session_restored` path). Does not attach anything.
    pub fn restore(&self, token: &str) -> Result<SessionId, SessionError> {
        let token = Token::decode(token).ok_or(SessionError::InvalidToken)?;
        self.by_token
            .read()
            .expect("poisoned")
            .get(&token)
            .copied()
            .ok_or(SessionError::InvalidToken)
    }

    pub fn rename(&self, id: SessionId, name: String) {
        if let Some(entry) = self.sessions.write().expect("poisoned").get_mut(&id) {
            entry.name = name;
        }
    }

    pub fn name(&self, id: SessionId) -> Option<String> {
        self.sessions
            .read()
            .expect("poisoned")
            .get(&id)
            .map(|e| e.name.clone())
    }

    pub fn table_of(&self, id: SessionId) -> Option<TableId> {
        self.sessions
            .read()
            .expect("poisoned")
            .get(&id)
            .and_then(|e| e.table)
    }

    pub fn set_table(&self, id: SessionId, table: TableId) {
        if let Some(entry) = self.sessions.write().expect("poisoned").get_mut(&id) {
            entry.table = Some(table);
        }
    }

    pub fn clear_table(&self, id: SessionId) {
        if let Some(entry) = self.sessions.write().expect("poisoned").get_mut(&id) {
            entry.table = None;
        }
    }

    /// Binds a live outbound queue and kill handle to `id`, replacing
    /// whatever was previously attached (an old connection losing its
    /// session to a newer reconnect, spec §4.6's single-writer-per-session
    /// rule: "latest wins — the previous socket is closed with a
    /// displacement notice"). The displaced connection is notified and
    /// killed only after the lock is released — no I/O under lock.
    pub fn attach(
        &self,
        id: SessionId,
        outbound: mpsc::Sender<ServerMessage>,
        kill: std::sync::Arc<Notify>,
    ) {
        let displaced = {
            let mut sessions = self.sessions.write().expect("poisoned");
            sessions.get_mut(&id).and_then(|entry| {
                let previous = entry.attachment.take();
                entry.attachment = Some(Attachment { outbound, kill });
                previous
            })
        };
        if let Some(previous) = displaced {
            let _ = previous.outbound.try_send(ServerMessage::Error {
                message: "connected from another location".to_string(),
            });
            previous.kill.notify_one();
        }
    }

    /// Detaches `id`'s connection, but only if `kill` is still the current
    /// attachment's kill handle. A no-op otherwise, so an out-of-order
    /// close from a connection that has already been displaced by a newer
    /// reconnect can't tear down the new one (spec §4.6/§4.6 Connection:
    /// "no-op if the current attachment is a different connection").
    pub fn detach(&self, id: SessionId, kill: &std::sync::Arc<Notify>) {
        if let Some(entry) = self.sessions.write().expect("poisoned").get_mut(&id) {
            let is_current = entry
                .attachment
                .as_ref()
                .is_some_and(|a| std::sync::Arc::ptr_eq(&a.kill, kill));
            if is_current {
                entry.attachment = None;
            }
        }
    }

    pub fn sender_of(&self, id: SessionId) -> Option<mpsc::Sender<ServerMessage>> {
        self.sessions
            .read()
            .expect("poisoned")
            .get(&id)
            .and_then(|e| e.attachment.as_ref())
            .map(|a| a.outbound.clone())
    }

    pub fn kill_of(&self, id: SessionId) -> Option<std::sync::Arc<Notify>> {
        self.sessions
            .read()
            .expect("poisoned")
            .get(&id)
            .and_then(|e| e.attachment.as_ref())
            .map(|a| a.kill.clone())
    }

    /// Sessions with a live outbound queue right now, for the lobby
    /// broadcast loop (spec §4.4: dispatch a fresh snapshot to anyone
    /// currently browsing, not seated anywhere).
    pub fn attached_without_table(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .expect("poisoned")
            .iter()
            .filter(|(_, e)| e.attachment.is_some() && e.table.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_attached(&self, id: SessionId) -> bool {
        self.sessions
            .read()
            .expect("poisoned")
            .get(&id)
            .is_some_and(|e| e.attachment.is_some())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn restore_round_trips_a_freshly_created_session() {
        let registry = SessionRegistry::new();
        let (id, token) = registry.create_session("anon".to_string());
        let restored = registry.restore(&token.encode()).unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn restore_rejects_unknown_token() {
        let registry = SessionRegistry::new();
        registry.create_session("anon".to_string());
        assert_eq!(
            registry.restore("AAAAAAAAAAAAAAAAAAAAAA").unwrap_err(),
            SessionError::InvalidToken
        );
    }

    #[test]
    fn attach_then_detach_clears_sender() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create_session("anon".to_string());
        let (tx, _rx) = mpsc::channel(4);
        let kill = std::sync::Arc::new(Notify::new());
        registry.attach(id, tx, kill.clone());
        assert!(registry.is_attached(id));
        registry.detach(id, &kill);
        assert!(!registry.is_attached(id));
    }

    #[test]
    fn detach_is_a_noop_for_a_displaced_connection() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create_session("anon".to_string());
        let (tx1, _rx1) = mpsc::channel(4);
        let kill1 = std::sync::Arc::new(Notify::new());
        registry.attach(id, tx1, kill1.clone());
        let (tx2, _rx2) = mpsc::channel(4);
        let kill2 = std::sync::Arc::new(Notify::new());
        registry.attach(id, tx2, kill2.clone());
        assert!(kill1.notified().now_or_never().is_some());
        registry.detach(id, &kill1);
        assert!(registry.is_attached(id));
        registry.detach(id, &kill2);
        assert!(!registry.is_attached(id));
    }

    #[test]
    fn table_association_round_trips() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create_session("anon".to_string());
        assert_eq!(registry.table_of(id), None);
        let table_id = TableId::from_index(0);
        registry.set_table(id, table_id);
        assert_eq!(registry.table_of(id), Some(table_id));
        registry.clear_table(id);
        assert_eq!(registry.table_of(id), None);
    }
}
