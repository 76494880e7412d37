use super::action::{Action, ValidActions};
use super::street::Street;
use crate::cards::card::Card;
use crate::cards::hole::Hole;
use crate::Chips;

/// One fact produced by a `HandState` transition. `Table` forwards these,
/// unchanged in meaning, to `Broadcast` for fan-out; `protocol` renders them
/// onto the wire envelopes named in spec.md §6.
#[derive(Debug, Clone)]
pub enum Event {
    HandStarted {
        dealer_seat: usize,
        small_blind_seat: usize,
        big_blind_seat: usize,
    },
    BlindPosted {
        seat: usize,
        amount: Chips,
        new_stack: Chips,
    },
    CardsDealt {
        seat: usize,
        hole: Hole,
    },
    ActionRequest {
        seat: usize,
        valid: ValidActions,
    },
    ActionResult {
        seat: usize,
        action: Action,
        amount: Chips,
        new_stack: Chips,
        pot: Chips,
        next_actor: Option<usize>,
        round_over: bool,
    },
    BoardDealt {
        cards: Vec<Card>,
        street: Street,
    },
    ShowdownResult {
        winners: Vec<usize>,
        winning_hand: Option<String>,
        revealed: Vec<(usize, Hole)>,
        pots: Vec<super::pot::Pot>,
        amounts_won: std::collections::HashMap<usize, Chips>,
    },
    HandComplete {
        message: String,
    },
}
