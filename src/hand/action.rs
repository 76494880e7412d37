use crate::Chips;

/// An action applied to `HandState` by the seat on turn.
///
/// `Raise` and `AllIn` carry the *absolute* total a seat will have committed
/// this street after the action (matching `minRaise`/`maxRaise`, which are
/// themselves absolute in the valid-actions table), not an incremental
/// top-up. `AllIn` always commits the seat's entire remaining stack; the
/// engine computes the exact amount, callers need not supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fold,
    Check,
    Call,
    Raise(Chips),
    AllIn,
}

/// Which `Action` variants a seat may currently choose from, and the chip
/// amounts that parameterize them. Mirrors spec's valid-actions table
/// exactly: an empty `kinds` means the seat cannot act (folded or Stack=0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidActions {
    pub kinds: Vec<ActionKind>,
    pub call_amount: Chips,
    pub min_raise: Option<Chips>,
    pub max_raise: Option<Chips>,
}

impl ValidActions {
    pub fn none() -> Self {
        Self {
            kinds: Vec::new(),
            call_amount: 0,
            min_raise: None,
            max_raise: None,
        }
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.kinds.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ActionKind::Fold => "fold",
                ActionKind::Check => "check",
                ActionKind::Call => "call",
                ActionKind::Raise => "raise",
                ActionKind::AllIn => "all_in",
            }
        )
    }
}
