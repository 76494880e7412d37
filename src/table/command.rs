use crate::Chips;
use crate::protocol::{TableStateView, WireAction};
use crate::session::SessionId;
use tokio::sync::oneshot;

/// The four verbs spec §4.3 has the Hub route to a Table, plus the
/// internal `Snapshot` query used for reconnect replay (spec §4.5's
/// "replay a single table_state/lobby_state snapshot"). All are enqueued
/// on the table's command channel and drained by its single consumer task
/// — no other code path mutates table-owned state (spec §5).
pub enum TableCommand {
    Join {
        session: SessionId,
        reply: oneshot::Sender<Result<usize, TableError>>,
    },
    Leave {
        session: SessionId,
        reply: oneshot::Sender<Result<(), TableError>>,
    },
    StartHand {
        session: SessionId,
        reply: oneshot::Sender<Result<(), TableError>>,
    },
    PlayerAction {
        session: SessionId,
        action: WireAction,
        amount: Option<Chips>,
        reply: oneshot::Sender<Result<(), TableError>>,
    },
    Snapshot {
        session: SessionId,
        reply: oneshot::Sender<Option<TableStateView>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl std::fmt::Debug for TableCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TableCommand::Join { session, .. } => write!(f, "Join({session:?})"),
            TableCommand::Leave { session, .. } => write!(f, "Leave({session:?})"),
            TableCommand::StartHand { session, .. } => write!(f, "StartHand({session:?})"),
            TableCommand::PlayerAction { session, .. } => write!(f, "PlayerAction({session:?})"),
            TableCommand::Snapshot { session, .. } => write!(f, "Snapshot({session:?})"),
            TableCommand::Shutdown { .. } => write!(f, "Shutdown"),
        }
    }
}

/// The table-level error vocabulary from spec §7, a subset of the global
/// `ErrorKind` (Leave is always permitted and never errors; a session not
/// seated anywhere simply gets a no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    TableFull,
    AlreadySeated,
    HandInProgress,
    NotEnoughPlayers,
    NotYourTurn,
    InvalidAction,
    InvalidAmount,
    /// The table's command loop is gone (process shutdown race). Never
    /// produced by the table itself; only `TableHandle` synthesizes this
    /// when a send or reply channel comes back closed.
    Unavailable,
}

impl From<crate::hand::ActionError> for TableError {
    fn from(e: crate::hand::ActionError) -> Self {
        match e {
            crate::hand::ActionError::NotYourTurn => TableError::NotYourTurn,
            crate::hand::ActionError::InvalidAction => TableError::InvalidAction,
            crate::hand::ActionError::InvalidAmount => TableError::InvalidAmount,
        }
    }
}

impl From<TableError> for crate::error::ErrorKind {
    fn from(e: TableError) -> Self {
        match e {
            TableError::TableFull => crate::error::ErrorKind::TableFull,
            TableError::AlreadySeated => crate::error::ErrorKind::AlreadySeated,
            TableError::HandInProgress => crate::error::ErrorKind::HandInProgress,
            TableError::NotEnoughPlayers => crate::error::ErrorKind::NotEnoughPlayers,
            TableError::NotYourTurn => crate::error::ErrorKind::NotYourTurn,
            TableError::InvalidAction => crate::error::ErrorKind::InvalidAction,
            TableError::InvalidAmount => crate::error::ErrorKind::InvalidAmount,
            TableError::Unavailable => crate::error::ErrorKind::Internal,
        }
    }
}
