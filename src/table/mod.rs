//! A table is a single-writer actor (spec §4.3): one command loop owns a
//! `[Option<TableSeat>; MAX_SEATS]` and an `Option<HandState>`, consumes
//! `TableCommand`s off an `mpsc` channel one at a time, and is the only
//! code path that ever calls into `HandState`. Grounded on the teacher's
//! `gameroom::Room::run`, which does the same single-consumer loop over a
//! fixed two-seat `gameplay::Game` instead of a variable `HandState`.

mod command;
mod seat;

pub use command::{TableCommand, TableError};
pub use seat::TableSeat;

use crate::MAX_SEATS;
use crate::broadcast::Broadcast;
use crate::config::Config;
use crate::hand::{Action, ActionKind, Event as HandEvent, HandState, ValidActions};
use crate::protocol::{LobbyRow, SeatView, ServerMessage, TableStateView, WireAction};
use crate::session::{SessionId, SessionRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock as StdRwLock;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep_until;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(u32);

impl TableId {
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "table-{}", self.0)
    }
}

/// A cloneable front for a running table's command loop. The only way any
/// other part of the process touches table state (spec §4.3).
#[derive(Clone)]
pub struct TableHandle {
    id: TableId,
    tx: mpsc::Sender<TableCommand>,
    lobby: Arc<StdRwLock<LobbyRow>>,
}

impl TableHandle {
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn lobby_row(&self) -> LobbyRow {
        self.lobby.read().expect("poisoned").clone()
    }

    pub async fn join(&self, session: SessionId) -> Result<usize, TableError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Join { session, reply }, rx).await
    }

    pub async fn leave(&self, session: SessionId) -> Result<(), TableError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Leave { session, reply }, rx).await
    }

    pub async fn start_hand(&self, session: SessionId) -> Result<(), TableError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::StartHand { session, reply }, rx)
            .await
    }

    pub async fn player_action(
        &self,
        session: SessionId,
        action: WireAction,
        amount: Option<crate::Chips>,
    ) -> Result<(), TableError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            TableCommand::PlayerAction {
                session,
                action,
                amount,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn snapshot(&self, session: SessionId) -> Option<TableStateView> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(TableCommand::Snapshot { session, reply })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(TableCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send<T>(
        &self,
        command: TableCommand,
        rx: oneshot::Receiver<Result<T, TableError>>,
    ) -> Result<T, TableError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TableError::Unavailable)?;
        rx.await.map_err(|_| TableError::Unavailable)?
    }
}

/// Spawns a table's command loop and returns a handle to it. `capacity`
/// bounds the command channel, mirroring the bound the same config puts on
/// each connection's outbound queue.
pub fn spawn(
    id: TableId,
    name: String,
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
) -> TableHandle {
    let (tx, rx) = mpsc::channel(256);
    let lobby = Arc::new(StdRwLock::new(LobbyRow {
        id,
        name: name.clone(),
        seats_occupied: 0,
        max_seats: MAX_SEATS,
    }));
    let table = Table {
        id,
        name,
        seats: std::array::from_fn(|_| None),
        dealer_seat: None,
        hand: None,
        rx,
        registry,
        small_blind: config.small_blind,
        big_blind: config.big_blind,
        starting_stack: config.starting_stack,
        action_timeout: config.action_timeout(),
        lobby: lobby.clone(),
        deadline: None,
    };
    tokio::spawn(table.run());
    TableHandle { id, tx, lobby }
}

struct Table {
    id: TableId,
    name: String,
    seats: [Option<TableSeat>; MAX_SEATS],
    dealer_seat: Option<usize>,
    hand: Option<HandState>,
    rx: mpsc::Receiver<TableCommand>,
    registry: Arc<SessionRegistry>,
    small_blind: crate::Chips,
    big_blind: crate::Chips,
    starting_stack: crate::Chips,
    action_timeout: Option<Duration>,
    lobby: Arc<StdRwLock<LobbyRow>>,
    deadline: Option<Instant>,
}

impl Table {
    async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(TableCommand::Shutdown { reply }) => {
                            let _ = reply.send(());
                            break;
                        }
                        Some(command) => self.handle(command),
                        None => break,
                    }
                }
                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at.into()).await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.auto_fold();
                }
            }
        }
    }

    fn handle(&mut self, command: TableCommand) {
        match command {
            TableCommand::Join { session, reply } => {
                let _ = reply.send(self.handle_join(session));
            }
            TableCommand::Leave { session, reply } => {
                let _ = reply.send(self.handle_leave(session));
            }
            TableCommand::StartHand { session, reply } => {
                let _ = reply.send(self.handle_start_hand(session));
            }
            TableCommand::PlayerAction {
                session,
                action,
                amount,
                reply,
            } => {
                let _ = reply.send(self.handle_player_action(session, action, amount));
            }
            TableCommand::Snapshot { session, reply } => {
                let seat = self.seat_index_of(session);
                let _ = reply.send(Some(self.view_for_seat(seat)));
            }
            TableCommand::Shutdown { .. } => unreachable!("handled in run()"),
        }
    }

    fn seat_index_of(&self, session: SessionId) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.session == session))
    }

    fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    fn handle_join(&mut self, session: SessionId) -> Result<usize, TableError> {
        if self.seat_index_of(session).is_some() {
            return Err(TableError::AlreadySeated);
        }
        let index = self
            .seats
            .iter()
            .position(|s| s.is_none())
            .ok_or(TableError::TableFull)?;
        let name = self
            .registry
            .name(session)
            .unwrap_or_else(|| "player".to_string());
        self.seats[index] = Some(TableSeat::new(session, name, self.starting_stack));
        self.registry.set_table(session, self.id);
        self.refresh_lobby();
        self.broadcast_table_state();
        Ok(index)
    }

    /// Voluntary leave (spec §4.3). Mid-hand, the seat is force-folded and
    /// kept occupied so the hand can settle its stack; it's vacated only
    /// once the hand finishes. Between hands it's vacated immediately.
    fn handle_leave(&mut self, session: SessionId) -> Result<(), TableError> {
        let Some(index) = self.seat_index_of(session) else {
            return Ok(());
        };
        self.registry.clear_table(session);
        if let Some(hand) = self.hand.as_ref() {
            if hand.seat(index).is_some_and(|s| s.is_active()) {
                let (next, events) = hand.force_fold(index);
                self.hand = Some(next);
                self.render_and_broadcast(events);
            }
            self.seats[index].as_mut().expect("checked above").leaving = true;
            if self.hand.as_ref().is_some_and(|h| h.is_complete()) {
                self.finish_hand();
            } else {
                self.refresh_lobby();
                self.broadcast_table_state();
            }
        } else {
            self.seats[index] = None;
            let registry = self.registry.as_ref();
            Broadcast::new(registry).unicast(session, ServerMessage::SeatCleared {});
            self.refresh_lobby();
            self.broadcast_table_state();
        }
        Ok(())
    }

    fn handle_start_hand(&mut self, session: SessionId) -> Result<(), TableError> {
        if self.seat_index_of(session).is_none() {
            return Err(TableError::NotYourTurn);
        }
        if self.hand.is_some() {
            return Err(TableError::HandInProgress);
        }
        let stacked: Vec<usize> = (0..MAX_SEATS)
            .filter(|&i| {
                self.seats[i]
                    .as_ref()
                    .is_some_and(|s| s.stack > 0 && !s.leaving)
            })
            .collect();
        if stacked.len() < 2 {
            return Err(TableError::NotEnoughPlayers);
        }
        let dealer = self.next_dealer(&stacked);
        self.dealer_seat = Some(dealer);
        let mut stacks: [Option<crate::Chips>; MAX_SEATS] = [None; MAX_SEATS];
        for &i in &stacked {
            stacks[i] = Some(self.seats[i].as_ref().expect("stacked").stack);
        }
        let (hand, events) = HandState::begin(dealer, stacks, self.small_blind, self.big_blind);
        self.hand = Some(hand);
        self.render_and_broadcast(events);
        if self.hand.as_ref().is_some_and(|h| h.is_complete()) {
            self.finish_hand();
        }
        Ok(())
    }

    fn next_dealer(&self, stacked: &[usize]) -> usize {
        match self.dealer_seat {
            Some(prev) => (1..=MAX_SEATS)
                .map(|k| (prev + k) % MAX_SEATS)
                .find(|i| stacked.contains(i))
                .unwrap_or(stacked[0]),
            None => stacked[0],
        }
    }

    fn handle_player_action(
        &mut self,
        session: SessionId,
        wire: WireAction,
        amount: Option<crate::Chips>,
    ) -> Result<(), TableError> {
        let Some(index) = self.seat_index_of(session) else {
            return Err(TableError::NotYourTurn);
        };
        let hand = self.hand.as_ref().ok_or(TableError::NotYourTurn)?;
        if hand.cursor() != Some(index) {
            return Err(TableError::NotYourTurn);
        }
        let valid = hand.valid_actions(index);
        let action = translate(&valid, wire, amount)?;
        let (next, events) = hand.apply(index, action).map_err(TableError::from)?;
        self.hand = Some(next);
        self.render_and_broadcast(events);
        if self.hand.as_ref().is_some_and(|h| h.is_complete()) {
            self.finish_hand();
        } else {
            self.refresh_deadline();
        }
        Ok(())
    }

    fn refresh_deadline(&mut self) {
        self.deadline = self
            .action_timeout
            .map(|timeout| Instant::now() + timeout);
    }

    fn auto_fold(&mut self) {
        self.deadline = None;
        let Some(hand) = self.hand.as_ref() else {
            return;
        };
        let Some(index) = hand.cursor() else {
            return;
        };
        let (next, events) = hand.force_fold(index);
        self.hand = Some(next);
        self.render_and_broadcast(events);
        if self.hand.as_ref().is_some_and(|h| h.is_complete()) {
            self.finish_hand();
        } else {
            self.refresh_deadline();
        }
    }

    /// Writes a finished hand's settled stacks back to the table seats,
    /// vacates any seat that left mid-hand or busted, and clears the
    /// timer. The `HandState` itself is then dropped — nothing outlives
    /// one hand except its final stacks (spec §4.2).
    fn finish_hand(&mut self) {
        let Some(hand) = self.hand.take() else { return };
        self.deadline = None;
        let finals = hand.final_stacks();
        for index in 0..MAX_SEATS {
            let Some(stack) = finals[index] else { continue };
            if let Some(seat) = self.seats[index].as_mut() {
                seat.stack = stack;
            }
        }
        for index in 0..MAX_SEATS {
            let vacate = match &self.seats[index] {
                Some(seat) => seat.leaving || seat.stack == 0,
                None => false,
            };
            if vacate {
                if let Some(seat) = &self.seats[index] {
                    self.registry.clear_table(seat.session);
                    let registry = self.registry.as_ref();
                    Broadcast::new(registry).unicast(seat.session, ServerMessage::SeatCleared {});
                }
                self.seats[index] = None;
            }
        }
        self.refresh_lobby();
        // spec §4.3 event sequence item 8: hand_complete is followed by a
        // fresh table_state snapshot to every seated player.
        self.broadcast_table_state();
    }

    /// Sends every seated session its own `table_state` snapshot (spec
    /// §4.3: Join/Leave/hand-end all broadcast `table_state` "to all
    /// seated"). Hole-card rendering is per-recipient (spec §9), so this
    /// builds one `TableStateView` per seat rather than sharing a single
    /// broadcast payload.
    fn broadcast_table_state(&self) {
        let registry = self.registry.as_ref();
        let bus = Broadcast::new(registry);
        for index in 0..MAX_SEATS {
            if let Some(seat) = &self.seats[index] {
                let view = self.view_for_seat(Some(index));
                bus.unicast(seat.session, ServerMessage::TableState(view));
            }
        }
    }

    fn render_and_broadcast(&mut self, events: Vec<HandEvent>) {
        for event in events {
            self.render_event(event);
        }
    }

    fn render_event(&mut self, event: HandEvent) {
        let sessions: Vec<Option<SessionId>> = self
            .seats
            .iter()
            .map(|s| s.as_ref().map(|s| s.session))
            .collect();
        let all: Vec<SessionId> = sessions.iter().filter_map(|s| *s).collect();
        let registry = self.registry.as_ref();
        let bus = Broadcast::new(registry);
        match event {
            HandEvent::HandStarted {
                dealer_seat,
                small_blind_seat,
                big_blind_seat,
            } => bus.broadcast(
                all,
                ServerMessage::HandStarted {
                    dealer_seat,
                    small_blind_seat,
                    big_blind_seat,
                },
            ),
            HandEvent::BlindPosted {
                seat,
                amount,
                new_stack,
            } => bus.broadcast(
                all,
                ServerMessage::BlindPosted {
                    seat_index: seat,
                    amount,
                    new_stack,
                },
            ),
            HandEvent::CardsDealt { seat, hole } => {
                if let Some(session) = sessions[seat] {
                    let cards = hole.cards();
                    bus.unicast(
                        session,
                        ServerMessage::CardsDealt {
                            hole_cards: [cards[0].to_string(), cards[1].to_string()],
                        },
                    );
                }
            }
            HandEvent::ActionRequest { seat, valid } => {
                if let Some(session) = sessions[seat] {
                    bus.unicast(
                        session,
                        ServerMessage::ActionRequest {
                            seat_index: seat,
                            valid_actions: valid.kinds.iter().map(|k| k.to_string()).collect(),
                            call_amount: valid.call_amount,
                            min_raise: valid.min_raise,
                            max_raise: valid.max_raise,
                        },
                    );
                }
            }
            HandEvent::ActionResult {
                seat,
                action,
                amount,
                new_stack,
                pot,
                next_actor,
                round_over,
            } => bus.broadcast(
                all,
                ServerMessage::ActionResult {
                    seat_index: seat,
                    action: action_label(action).to_string(),
                    amount,
                    new_stack,
                    pot,
                    next_actor,
                    round_over,
                },
            ),
            HandEvent::BoardDealt { cards, street } => bus.broadcast(
                all,
                ServerMessage::BoardDealt {
                    board_cards: cards.iter().map(|c| c.to_string()).collect(),
                    street: street.to_string(),
                },
            ),
            HandEvent::ShowdownResult {
                winners,
                winning_hand,
                revealed,
                pots,
                amounts_won,
            } => {
                let pot_amount = pots.iter().map(|p| p.amount).sum();
                let amounts_won = amounts_won
                    .into_iter()
                    .map(|(seat, chips)| (seat.to_string(), chips))
                    .collect();
                let revealed = revealed
                    .into_iter()
                    .map(|(seat, hole)| {
                        let cards = hole.cards();
                        (seat.to_string(), [cards[0].to_string(), cards[1].to_string()])
                    })
                    .collect();
                bus.broadcast(
                    all,
                    ServerMessage::ShowdownResult {
                        winner_seats: winners,
                        winning_hand,
                        pot_amount,
                        amounts_won,
                        revealed,
                    },
                );
            }
            HandEvent::HandComplete { message } => {
                bus.broadcast(all, ServerMessage::HandComplete { message });
            }
        }
    }

    fn refresh_lobby(&self) {
        let mut row = self.lobby.write().expect("poisoned");
        row.seats_occupied = self.occupied_count();
    }

    /// Builds the full reconnect snapshot for `viewer` (spec §4.5/§9):
    /// public table shape plus, if a hand is live, the viewer's own hole
    /// cards and whose-turn state folded in rather than replayed as a
    /// separate `action_request`.
    fn view_for_seat(&self, viewer: Option<usize>) -> TableStateView {
        let hand_in_progress = self.hand.is_some();
        let seats = (0..MAX_SEATS).map(|i| self.seat_view(i)).collect();
        let pot = self.hand.as_ref().map(|h| h.pot());
        let mut hole_cards = None;
        let mut current_actor = None;
        let mut valid_actions = None;
        let mut call_amount = None;
        let mut min_raise = None;
        let mut max_raise = None;
        if let (Some(hand), Some(index)) = (self.hand.as_ref(), viewer) {
            if let Some(seat) = hand.seat(index) {
                let mut map = HashMap::new();
                let cards = seat.hole.cards();
                map.insert(
                    index.to_string(),
                    [cards[0].to_string(), cards[1].to_string()],
                );
                hole_cards = Some(map);
            }
            current_actor = hand.cursor();
            if hand.cursor() == Some(index) {
                let valid = hand.valid_actions(index);
                call_amount = Some(valid.call_amount);
                min_raise = valid.min_raise;
                max_raise = valid.max_raise;
                valid_actions = Some(valid.kinds.iter().map(|k| k.to_string()).collect());
            }
        }
        TableStateView {
            table_id: self.id,
            seats,
            hand_in_progress,
            dealer_seat: self.dealer_seat,
            small_blind_seat: self.hand.as_ref().map(|h| h.small_blind_seat()),
            big_blind_seat: self.hand.as_ref().map(|h| h.big_blind_seat()),
            pot,
            hole_cards,
            current_actor,
            valid_actions,
            call_amount,
            min_raise,
            max_raise,
        }
    }

    fn seat_view(&self, index: usize) -> SeatView {
        let Some(table_seat) = &self.seats[index] else {
            return SeatView {
                index,
                player_name: None,
                status: "empty".to_string(),
                stack: 0,
                card_count: None,
            };
        };
        let (status, card_count) = match self.hand.as_ref().and_then(|h| h.seat(index)) {
            Some(hand_seat) if hand_seat.folded => ("folded".to_string(), Some(2)),
            Some(hand_seat) if hand_seat.is_all_in() => ("all_in".to_string(), Some(2)),
            Some(_) => ("active".to_string(), Some(2)),
            None if self.hand.is_some() => ("sitting_out".to_string(), None),
            None => ("waiting".to_string(), None),
        };
        SeatView {
            index,
            player_name: Some(table_seat.name.clone()),
            status,
            stack: table_seat.stack,
            card_count,
        }
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Fold => "fold",
        Action::Check => "check",
        Action::Call => "call",
        Action::Raise(_) => "raise",
        Action::AllIn => "all_in",
    }
}

/// Maps the inbound wire vocabulary (4 verbs) onto the internal `Action`
/// enum (5 verbs). A wire `call` or `raise` becomes `AllIn` when that's the
/// only thing a short stack can legally do — the engine computes the exact
/// amount itself, so the client never needs to say "all in" explicitly for
/// a forced shove (spec is silent here; documented as an open-question
/// resolution in DESIGN.md).
fn translate(
    valid: &ValidActions,
    wire: WireAction,
    amount: Option<crate::Chips>,
) -> Result<Action, TableError> {
    match wire {
        WireAction::Fold => Ok(Action::Fold),
        WireAction::Check => Ok(Action::Check),
        WireAction::Call => {
            if valid.contains(ActionKind::Call) {
                Ok(Action::Call)
            } else if valid.contains(ActionKind::AllIn) {
                Ok(Action::AllIn)
            } else {
                Err(TableError::InvalidAction)
            }
        }
        WireAction::Raise => {
            let total = amount.ok_or(TableError::InvalidAmount)?;
            if valid.contains(ActionKind::Raise) {
                Ok(Action::Raise(total))
            } else if valid.contains(ActionKind::AllIn) {
                Ok(Action::AllIn)
            } else {
                Err(TableError::InvalidAction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_and_config() -> (Arc<SessionRegistry>, Arc<Config>) {
        let registry = Arc::new(SessionRegistry::new());
        let config = Arc::new(Config {
            bind_addr: "127.0.0.1:0".to_string(),
            log_level: "info".to_string(),
            num_tables: 1,
            small_blind: 5,
            big_blind: 10,
            starting_stack: 1000,
            action_timeout_secs: 0,
            connection_queue_bound: 64,
        });
        (registry, config)
    }

    #[tokio::test]
    async fn join_then_start_hand_deals_two_players_in() {
        let (registry, config) = registry_and_config();
        let handle = spawn(TableId::from_index(0), "t".to_string(), config, registry.clone());
        let (s1, _) = registry.create_session("alice".to_string());
        let (s2, _) = registry.create_session("bob".to_string());
        assert_eq!(handle.join(s1).await.unwrap(), 0);
        assert_eq!(handle.join(s2).await.unwrap(), 1);
        assert!(handle.start_hand(s1).await.is_ok());
        let view = handle.snapshot(s1).await.unwrap();
        assert!(view.hand_in_progress);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn cannot_start_hand_with_one_player() {
        let (registry, config) = registry_and_config();
        let handle = spawn(TableId::from_index(0), "t".to_string(), config, registry.clone());
        let (s1, _) = registry.create_session("alice".to_string());
        handle.join(s1).await.unwrap();
        assert_eq!(
            handle.start_hand(s1).await.unwrap_err(),
            TableError::NotEnoughPlayers
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn leave_mid_hand_force_folds_without_error() {
        let (registry, config) = registry_and_config();
        let handle = spawn(TableId::from_index(0), "t".to_string(), config, registry.clone());
        let (s1, _) = registry.create_session("alice".to_string());
        let (s2, _) = registry.create_session("bob".to_string());
        handle.join(s1).await.unwrap();
        handle.join(s2).await.unwrap();
        handle.start_hand(s1).await.unwrap();
        assert!(handle.leave(s1).await.is_ok());
        handle.shutdown().await;
    }
}
