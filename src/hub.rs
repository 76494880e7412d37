//! The process root: the full table registry plus the one `SessionRegistry`,
//! and the routing from inbound `ClientMessage`s to whichever table a
//! session currently occupies. Grounded on the teacher's `hosting::Casino`,
//! generalized from a single `rooms` map to a fixed table roster sized at
//! startup (spec §4.4 treats the table count as static configuration, not
//! something players create or destroy).

use crate::broadcast::Broadcast;
use crate::config::Config;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{SessionId, SessionRegistry};
use crate::table::{self, TableHandle, TableId};
use std::sync::Arc;
use std::time::Duration;

pub struct Hub {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    tables: Vec<TableHandle>,
}

impl Hub {
    pub fn new(config: Config) -> Arc<Self> {
        let config = Arc::new(config);
        let sessions = Arc::new(SessionRegistry::new());
        let tables = (0..config.num_tables)
            .map(|i| {
                let id = TableId::from_index(i as u32);
                table::spawn(id, format!("Table {}", i + 1), config.clone(), sessions.clone())
            })
            .collect();
        Arc::new(Self {
            config,
            sessions,
            tables,
        })
    }

    pub fn table(&self, id: TableId) -> Option<&TableHandle> {
        self.tables.iter().find(|t| t.id() == id)
    }

    pub fn tables(&self) -> &[TableHandle] {
        &self.tables
    }

    pub fn lobby_snapshot(&self) -> Vec<crate::protocol::LobbyRow> {
        self.tables.iter().map(|t| t.lobby_row()).collect()
    }

    /// Periodically refreshes the lobby view for every session currently
    /// browsing (not seated at a table). Table-local state changes (seat
    /// taken, hand started) are pushed immediately by the table itself;
    /// this loop is only for the aggregate "who's sitting where" picture.
    pub fn spawn_lobby_task(self: &Arc<Self>) {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(2));
            loop {
                interval.tick().await;
                let snapshot = hub.lobby_snapshot();
                let bus = Broadcast::new(&hub.sessions);
                for session in hub.sessions.attached_without_table() {
                    bus.unicast(session, ServerMessage::LobbyState(snapshot.clone()));
                }
            }
        });
    }

    /// Routes one decoded inbound message for `session`, replying directly
    /// to that session's own queue (spec §4.4: a table's own broadcasts are
    /// handled inside the table actor; this is only for the request/response
    /// half of the protocol).
    pub async fn dispatch(&self, session: SessionId, message: ClientMessage) {
        let bus = Broadcast::new(&self.sessions);
        match message {
            ClientMessage::SetName { name } => {
                match crate::session::validate_name(&name) {
                    Ok(name) => {
                        self.sessions.rename(session, name.clone());
                        bus.unicast(session, ServerMessage::SessionRestored { name });
                    }
                    Err(kind) => bus.unicast(session, ServerMessage::Error { message: kind.to_string() }),
                }
            }
            ClientMessage::JoinTable { table_id } => {
                let Some(table) = self.table(table_id) else {
                    bus.unicast(
                        session,
                        ServerMessage::Error {
                            message: crate::error::ErrorKind::InvalidAction.to_string(),
                        },
                    );
                    return;
                };
                match table.join(session).await {
                    Ok(seat_index) => {
                        // The table itself broadcasts a fresh `table_state`
                        // to every seated session (including this joiner,
                        // spec §4.3); only the private seat assignment is
                        // this hub's to send.
                        bus.unicast(
                            session,
                            ServerMessage::SeatAssigned {
                                table_id,
                                seat_index,
                            },
                        );
                    }
                    Err(err) => bus.unicast(session, error_message(err)),
                }
            }
            ClientMessage::LeaveTable {} => {
                if let Some(table_id) = self.sessions.table_of(session) {
                    if let Some(table) = self.table(table_id) {
                        let _ = table.leave(session).await;
                    }
                }
            }
            ClientMessage::StartHand {} => {
                if let Some(table) = self.table_of_session(session) {
                    if let Err(err) = table.start_hand(session).await {
                        bus.unicast(session, error_message(err));
                    }
                } else {
                    bus.unicast(session, error_message(table::TableError::NotYourTurn));
                }
            }
            ClientMessage::PlayerAction {
                action, amount, ..
            } => {
                if let Some(table) = self.table_of_session(session) {
                    if let Err(err) = table.player_action(session, action, amount).await {
                        bus.unicast(session, error_message(err));
                    }
                } else {
                    bus.unicast(session, error_message(table::TableError::NotYourTurn));
                }
            }
        }
    }

    fn table_of_session(&self, session: SessionId) -> Option<&TableHandle> {
        self.sessions
            .table_of(session)
            .and_then(|id| self.table(id))
    }

    /// Replays the single snapshot a reconnecting client needs (spec §4.5):
    /// its own lobby view if unseated, or its table's state if seated.
    pub async fn replay_snapshot(&self, session: SessionId) {
        let bus = Broadcast::new(&self.sessions);
        match self.table_of_session(session) {
            Some(table) => {
                if let Some(view) = table.snapshot(session).await {
                    bus.unicast(session, ServerMessage::TableState(view));
                }
            }
            None => bus.unicast(session, ServerMessage::LobbyState(self.lobby_snapshot())),
        }
    }

    pub async fn shutdown(&self) {
        for table in &self.tables {
            table.shutdown().await;
        }
    }
}

fn error_message(err: table::TableError) -> ServerMessage {
    let kind: crate::error::ErrorKind = err.into();
    ServerMessage::Error {
        message: kind.to_string(),
    }
}

