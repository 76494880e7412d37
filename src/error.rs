/// The client-facing error vocabulary from spec, reported only as
/// `error{message}` to the originating connection. Never broadcast, never
/// terminates a connection, never mutates table state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidName,
    InvalidToken,
    TableFull,
    AlreadySeated,
    HandInProgress,
    NotEnoughPlayers,
    NotYourTurn,
    InvalidAction,
    InvalidAmount,
    MalformedMessage,
    /// Internal invariant violation. Not named in spec's client-facing
    /// vocabulary; surfaces only inside a `hand_complete{message:"internal
    /// error"}`, never as a standalone `error{}` envelope.
    Internal,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidName => "invalid name",
            ErrorKind::InvalidToken => "Invalid or expired token",
            ErrorKind::TableFull => "table is full",
            ErrorKind::AlreadySeated => "already seated at a table",
            ErrorKind::HandInProgress => "a hand is already in progress",
            ErrorKind::NotEnoughPlayers => "not enough players to start a hand",
            ErrorKind::NotYourTurn => "it is not your turn",
            ErrorKind::InvalidAction => "that action is not currently valid",
            ErrorKind::InvalidAmount => "that amount is not currently valid",
            ErrorKind::MalformedMessage => "malformed message",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_message() {
        let kinds = [
            ErrorKind::InvalidName,
            ErrorKind::InvalidToken,
            ErrorKind::TableFull,
            ErrorKind::AlreadySeated,
            ErrorKind::HandInProgress,
            ErrorKind::NotEnoughPlayers,
            ErrorKind::NotYourTurn,
            ErrorKind::InvalidAction,
            ErrorKind::InvalidAmount,
            ErrorKind::MalformedMessage,
            ErrorKind::Internal,
        ];
        let messages: std::collections::HashSet<&str> = kinds.iter().map(|k| k.message()).collect();
        assert_eq!(messages.len(), kinds.len());
    }
}
