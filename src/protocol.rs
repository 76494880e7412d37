//! The wire envelope: `{ "type": <string>, "payload": <object> }` per
//! spec §6, decoded/encoded by `Connection` and produced by `Table`.
//! Map-keyed integer fields (amountsWon, per-seat hole cards) travel with
//! string keys since JSON object keys are always strings (spec §9).

use crate::Chips;
use crate::table::TableId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireAction {
    Fold,
    Check,
    Call,
    Raise,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    SetName {
        name: String,
    },
    JoinTable {
        #[serde(rename = "tableId")]
        table_id: TableId,
    },
    LeaveTable {},
    StartHand {},
    PlayerAction {
        #[serde(rename = "seatIndex")]
        seat_index: usize,
        action: WireAction,
        amount: Option<Chips>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyRow {
    pub id: TableId,
    pub name: String,
    pub seats_occupied: usize,
    pub max_seats: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub index: usize,
    pub player_name: Option<String>,
    pub status: String,
    pub stack: Chips,
    pub card_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStateView {
    pub table_id: TableId,
    pub seats: Vec<SeatView>,
    pub hand_in_progress: bool,
    pub dealer_seat: Option<usize>,
    pub small_blind_seat: Option<usize>,
    pub big_blind_seat: Option<usize>,
    pub pot: Option<Chips>,
    /// Populated only with the recipient's own seat, never a shared
    /// structure broadcast to everyone (spec §9 anti-cheat boundary).
    pub hole_cards: Option<HashMap<String, [String; 2]>>,
    /// Resolves the open question in spec §9: folding the would-be
    /// `action_request` replay into the snapshot so a reconnecting client
    /// doesn't need a second message to learn whose turn it is.
    pub current_actor: Option<usize>,
    pub valid_actions: Option<Vec<String>>,
    pub call_amount: Option<Chips>,
    pub min_raise: Option<Chips>,
    pub max_raise: Option<Chips>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionCreated {
        token: String,
        name: String,
    },
    SessionRestored {
        name: String,
    },
    Error {
        message: String,
    },
    LobbyState(Vec<LobbyRow>),
    SeatAssigned {
        table_id: TableId,
        seat_index: usize,
    },
    SeatCleared {},
    TableState(TableStateView),
    HandStarted {
        dealer_seat: usize,
        small_blind_seat: usize,
        big_blind_seat: usize,
    },
    BlindPosted {
        seat_index: usize,
        amount: Chips,
        new_stack: Chips,
    },
    CardsDealt {
        hole_cards: [String; 2],
    },
    ActionRequest {
        seat_index: usize,
        valid_actions: Vec<String>,
        call_amount: Chips,
        min_raise: Option<Chips>,
        max_raise: Option<Chips>,
    },
    ActionResult {
        seat_index: usize,
        action: String,
        amount: Chips,
        new_stack: Chips,
        pot: Chips,
        next_actor: Option<usize>,
        round_over: bool,
    },
    BoardDealt {
        board_cards: Vec<String>,
        street: String,
    },
    ShowdownResult {
        winner_seats: Vec<usize>,
        winning_hand: Option<String>,
        pot_amount: Chips,
        amounts_won: HashMap<String, Chips>,
        revealed: HashMap<String, [String; 2]>,
    },
    HandComplete {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_decodes_envelope_shape() {
        let json = r#"{"type":"player_action","payload":{"seatIndex":2,"action":"raise","amount":50}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::PlayerAction { seat_index, action, amount } => {
                assert_eq!(seat_index, 2);
                assert_eq!(action, WireAction::Raise);
                assert_eq!(amount, Some(50));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn server_message_amounts_won_uses_string_keys() {
        let mut amounts_won = HashMap::new();
        amounts_won.insert("2".to_string(), 51);
        amounts_won.insert("5".to_string(), 50);
        let msg = ServerMessage::ShowdownResult {
            winner_seats: vec![2, 5],
            winning_hand: Some("Pair".to_string()),
            pot_amount: 101,
            amounts_won,
            revealed: HashMap::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"2\":51"));
        assert!(json.contains("\"type\":\"showdown_result\""));
    }
}
