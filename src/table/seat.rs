use crate::Chips;
use crate::session::SessionId;

/// A table-level occupant: who sits here and what they own between hands.
/// Per-hand derived state (hole cards, folded, all-in) lives in `HandSeat`
/// for the duration of one `HandState` only.
#[derive(Debug, Clone)]
pub struct TableSeat {
    pub session: SessionId,
    pub name: String,
    pub stack: Chips,
    /// Set by a voluntary `Leave` received mid-hand; the seat stays
    /// occupied (so the in-flight `HandState` still has somewhere to
    /// settle its final stack) until the hand completes, at which point
    /// the table consumer vacates it without crediting a bust.
    pub leaving: bool,
}

impl TableSeat {
    pub fn new(session: SessionId, name: String, stack: Chips) -> Self {
        Self {
            session,
            name,
            stack,
            leaving: false,
        }
    }
}
