use super::action::{Action, ActionKind, ValidActions};
use super::event::Event;
use super::pot::{distribute, layer_pots, Pot};
use super::seat::HandSeat;
use super::street::Street;
use crate::cards::board::Board;
use crate::cards::deck::Deck;
use crate::cards::hand::Hand;
use crate::cards::hole::Hole;
use crate::cards::strength::Strength;
use crate::Chips;
use crate::MAX_SEATS;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    NotYourTurn,
    InvalidAction,
    InvalidAmount,
}

/// The pure per-hand state machine described by spec: dealer/blind seats,
/// deck, board, street, and per-seat betting state. `begin`/`apply` return a
/// new `HandState` plus the ordered events that transition produced; no
/// method mutates external state or performs I/O. `Table` is the only
/// caller, and owns sequencing it into the authoritative event stream.
#[derive(Debug, Clone)]
pub struct HandState {
    dealer: usize,
    small_blind_seat: usize,
    big_blind_seat: usize,
    small_blind: Chips,
    big_blind: Chips,
    board: Board,
    deck: Deck,
    street: Street,
    seats: [Option<HandSeat>; MAX_SEATS],
    current_bet: Chips,
    last_full_raise: Chips,
    cursor: Option<usize>,
}

impl HandState {
    /// Starts a new hand. `stacks[i]` is `Some(stack)` for every seat
    /// participating this hand (stack already known to be > 0); `None` for
    /// empty seats. Posts blinds, deals hole cards, and resolves forward to
    /// the first real decision (or straight to showdown, if blinds already
    /// put every seat all-in).
    pub fn begin(
        dealer: usize,
        stacks: [Option<Chips>; MAX_SEATS],
        small_blind: Chips,
        big_blind: Chips,
    ) -> (Self, Vec<Event>) {
        let occupied: Vec<usize> = (0..MAX_SEATS)
            .filter(|&i| stacks[i].is_some_and(|c| c > 0))
            .collect();
        assert!(occupied.len() >= 2, "a hand needs at least two stacked seats");

        let next_occupied = |from: usize| -> usize {
            (1..=MAX_SEATS)
                .map(|k| (from + k) % MAX_SEATS)
                .find(|i| occupied.contains(i))
                .expect("at least two occupied seats")
        };

        let (small_blind_seat, big_blind_seat) = if occupied.len() == 2 {
            (dealer, next_occupied(dealer))
        } else {
            let sb = next_occupied(dealer);
            let bb = next_occupied(sb);
            (sb, bb)
        };

        let mut deck = Deck::shuffled();
        let mut seats: [Option<HandSeat>; MAX_SEATS] = [None; MAX_SEATS];
        for &i in &occupied {
            let hole = Hole::new(deck.deal(), deck.deal());
            seats[i] = Some(HandSeat::new(stacks[i].expect("occupied"), hole));
        }

        let mut state = Self {
            dealer,
            small_blind_seat,
            big_blind_seat,
            small_blind,
            big_blind,
            board: Board::empty(),
            deck,
            street: Street::PreFlop,
            seats,
            current_bet: 0,
            last_full_raise: big_blind,
            cursor: None,
        };

        let mut events = vec![Event::HandStarted {
            dealer_seat: dealer,
            small_blind_seat,
            big_blind_seat,
        }];
        events.push(state.post_blind(small_blind_seat, small_blind));
        events.push(state.post_blind(big_blind_seat, big_blind));
        state.current_bet = state
            .seats
            .iter()
            .flatten()
            .map(|s| s.bet_street)
            .max()
            .unwrap_or(0);

        for &i in &occupied {
            let hole = state.seats[i].expect("just dealt").hole;
            events.push(Event::CardsDealt { seat: i, hole });
        }

        state.cursor = Some(big_blind_seat);
        let (drive_events, _, _) = state.drive();
        events.extend(drive_events);
        (state, events)
    }

    /// Applies `action` on behalf of `seat`, the seat currently on turn.
    pub fn apply(&self, seat: usize, action: Action) -> Result<(Self, Vec<Event>), ActionError> {
        if self.cursor != Some(seat) {
            return Err(ActionError::NotYourTurn);
        }
        let mut state = self.clone();
        let valid = state.valid_actions(seat);
        let amount = match action {
            Action::Fold => {
                if !valid.contains(ActionKind::Fold) {
                    return Err(ActionError::InvalidAction);
                }
                let s = state.seats[seat].as_mut().expect("cursor seat occupied");
                s.folded = true;
                s.acted = true;
                0
            }
            Action::Check => {
                if !valid.contains(ActionKind::Check) {
                    return Err(ActionError::InvalidAction);
                }
                state.seats[seat].as_mut().expect("cursor seat occupied").acted = true;
                0
            }
            Action::Call => {
                if !valid.contains(ActionKind::Call) {
                    return Err(ActionError::InvalidAction);
                }
                let amount = valid.call_amount;
                let s = state.seats[seat].as_mut().expect("cursor seat occupied");
                s.commit(amount);
                s.acted = true;
                amount
            }
            Action::Raise(to) => {
                if !valid.contains(ActionKind::Raise) {
                    return Err(ActionError::InvalidAction);
                }
                let (min_raise, max_raise) = (
                    valid.min_raise.expect("raise implies min_raise"),
                    valid.max_raise.expect("raise implies max_raise"),
                );
                if to < min_raise || to > max_raise {
                    return Err(ActionError::InvalidAmount);
                }
                let s = state.seats[seat].as_mut().expect("cursor seat occupied");
                let delta = to - s.bet_street;
                s.commit(delta);
                s.acted = true;
                state.last_full_raise = to - state.current_bet;
                state.current_bet = to;
                state.reopen_action_for_others(seat);
                delta
            }
            Action::AllIn => {
                if !valid.contains(ActionKind::AllIn) {
                    return Err(ActionError::InvalidAction);
                }
                let s = state.seats[seat].as_mut().expect("cursor seat occupied");
                let delta = s.stack;
                let to = s.bet_street + delta;
                s.commit(delta);
                s.acted = true;
                if to > state.current_bet {
                    let increment = to - state.current_bet;
                    let required = state.last_full_raise.max(state.big_blind);
                    state.current_bet = to;
                    if increment >= required {
                        state.last_full_raise = increment;
                        state.reopen_action_for_others(seat);
                    } else {
                        // short all-in: doesn't reopen full raising rights, but
                        // seats below the new amount still owe the difference.
                        // A seat that had already acted this street may only
                        // call or fold the new amount, not raise, until some
                        // other seat makes a full raise (spec §8 scenario 4).
                        for (i, other) in state.seats.iter_mut().enumerate() {
                            if i == seat {
                                continue;
                            }
                            if let Some(o) = other {
                                if o.is_active() && o.bet_street < to {
                                    if o.acted {
                                        o.raise_capped = true;
                                    }
                                    o.acted = false;
                                }
                            }
                        }
                    }
                }
                delta
            }
        };

        let pot_total: Chips = state.seats.iter().flatten().map(|s| s.committed).sum();
        let new_stack = state.seats[seat].expect("cursor seat occupied").stack;
        let (more_events, round_over, next_actor) = state.drive();
        let mut events = vec![Event::ActionResult {
            seat,
            action,
            amount,
            new_stack,
            pot: pot_total,
            next_actor,
            round_over,
        }];
        events.extend(more_events);
        Ok((state, events))
    }

    /// Folds `seat` regardless of whose turn it is, for a table-level Leave
    /// mid-hand (spec §4.3: "their seat is marked folded for the remainder
    /// of that hand"). No-op (empty event list) if the seat is already
    /// folded, all-in, or unoccupied — there is nothing to surrender.
    pub fn force_fold(&self, seat: usize) -> (Self, Vec<Event>) {
        let mut state = self.clone();
        if !state.seats[seat].is_some_and(|s| s.is_active()) {
            return (state, Vec::new());
        }
        let s = state.seats[seat].as_mut().expect("checked active above");
        s.folded = true;
        s.acted = true;
        let pot_total: Chips = state.seats.iter().flatten().map(|s| s.committed).sum();
        let new_stack = state.seats[seat].expect("checked active above").stack;
        let (more_events, round_over, next_actor) = state.drive();
        let mut events = vec![Event::ActionResult {
            seat,
            action: Action::Fold,
            amount: 0,
            new_stack,
            pot: pot_total,
            next_actor,
            round_over,
        }];
        events.extend(more_events);
        (state, events)
    }

    fn reopen_action_for_others(&mut self, raiser: usize) {
        for (i, other) in self.seats.iter_mut().enumerate() {
            if i == raiser {
                continue;
            }
            if let Some(o) = other {
                if o.is_active() {
                    o.acted = false;
                    o.raise_capped = false;
                }
            }
        }
    }

    fn post_blind(&mut self, seat: usize, amount: Chips) -> Event {
        let s = self.seats[seat].as_mut().expect("blind seat occupied");
        let posted = amount.min(s.stack);
        s.commit(posted);
        Event::BlindPosted {
            seat,
            amount: posted,
            new_stack: s.stack,
        }
    }

    /// Resolves forward from the current state: to the next action request,
    /// through any number of street advances (when no active seat remains
    /// able to act), to a fold-out win, or to full showdown. Returns
    /// (events, round_over, next_actor) describing what followed the last
    /// state-changing command.
    fn drive(&mut self) -> (Vec<Event>, bool, Option<usize>) {
        if self.is_fold_out() {
            return (self.conclude_fold_win(), true, None);
        }
        if !self.is_round_complete() {
            let base = self.cursor.unwrap_or(self.dealer);
            let next = self
                .next_active_seat(base)
                .expect("round incomplete implies an active seat remains");
            self.cursor = Some(next);
            let valid = self.valid_actions(next);
            return (
                vec![Event::ActionRequest { seat: next, valid }],
                false,
                Some(next),
            );
        }
        let (events, next_actor) = self.finish_street_or_showdown();
        (events, true, next_actor)
    }

    fn finish_street_or_showdown(&mut self) -> (Vec<Event>, Option<usize>) {
        let mut events = Vec::new();
        loop {
            if self.street == Street::River {
                events.extend(self.run_showdown());
                return (events, None);
            }
            events.extend(self.deal_next_street());
            if self.is_fold_out() {
                events.extend(self.conclude_fold_win());
                return (events, None);
            }
            if !self.is_round_complete() {
                let next = self
                    .next_active_seat(self.dealer)
                    .expect("round incomplete implies an active seat remains");
                self.cursor = Some(next);
                let valid = self.valid_actions(next);
                events.push(Event::ActionRequest { seat: next, valid });
                return (events, Some(next));
            }
        }
    }

    fn deal_next_street(&mut self) -> Vec<Event> {
        self.street = self.street.next();
        self.deck.burn();
        let n = self.street.n_revealed();
        let mut dealt = Vec::with_capacity(n);
        for _ in 0..n {
            let card = self.deck.deal();
            self.board.push(card);
            dealt.push(card);
        }
        for seat in self.seats.iter_mut().flatten() {
            seat.reset_street();
        }
        self.current_bet = 0;
        self.last_full_raise = self.big_blind;
        vec![Event::BoardDealt {
            cards: dealt,
            street: self.street,
        }]
    }

    fn conclude_fold_win(&mut self) -> Vec<Event> {
        let winner = self
            .seats
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.as_ref().filter(|s| !s.folded).map(|_| i))
            .expect("fold-out implies exactly one live seat");
        let pot_total: Chips = self.seats.iter().flatten().map(|s| s.committed).sum();
        let mut amounts_won = HashMap::new();
        amounts_won.insert(winner, pot_total);
        self.seats[winner].as_mut().expect("winner occupied").stack += pot_total;
        self.street = Street::Complete;
        self.cursor = None;
        vec![
            Event::ShowdownResult {
                winners: vec![winner],
                winning_hand: None,
                revealed: Vec::new(),
                pots: vec![Pot {
                    amount: pot_total,
                    eligible: vec![winner],
                }],
                amounts_won,
            },
            Event::HandComplete {
                message: format!("seat {winner} wins uncontested"),
            },
        ]
    }

    fn run_showdown(&mut self) -> Vec<Event> {
        let entries: Vec<(usize, Chips, bool)> = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s.committed, s.folded)))
            .collect();
        let pots = layer_pots(&entries);

        let mut strengths = HashMap::new();
        for (i, seat) in self.seats.iter().enumerate() {
            if let Some(seat) = seat {
                if !seat.folded {
                    let hole_hand: Hand = seat.hole.cards().into_iter().collect();
                    let board_hand: Hand = self.board.cards().into_iter().collect();
                    strengths.insert(i, Strength::from(hole_hand.merge(board_hand)));
                }
            }
        }

        let mut amounts_won: HashMap<usize, Chips> = HashMap::new();
        for pot in &pots {
            let payouts = distribute(pot, &strengths, self.dealer, MAX_SEATS);
            for (seat, amount) in payouts {
                *amounts_won.entry(seat).or_insert(0) += amount;
                self.seats[seat].as_mut().expect("payout seat occupied").stack += amount;
            }
        }

        let mut winners: Vec<usize> = amounts_won.keys().copied().collect();
        winners.sort_unstable();
        let winning_hand = winners
            .first()
            .and_then(|s| strengths.get(s))
            .map(|s| s.ranking().label().to_string());
        let revealed: Vec<(usize, Hole)> = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().filter(|s| !s.folded).map(|s| (i, s.hole)))
            .collect();

        self.street = Street::Complete;
        self.cursor = None;
        vec![
            Event::ShowdownResult {
                winners,
                winning_hand,
                revealed,
                pots,
                amounts_won,
            },
            Event::HandComplete {
                message: "hand complete".to_string(),
            },
        ]
    }

    fn is_fold_out(&self) -> bool {
        self.seats.iter().flatten().filter(|s| !s.folded).count() == 1
    }

    /// The betting-round-complete predicate from spec: every non-folded,
    /// non-all-in seat must have acted this round and matched the current
    /// bet. Vacuously true once only folded/all-in seats remain.
    fn is_round_complete(&self) -> bool {
        self.seats
            .iter()
            .flatten()
            .filter(|s| !s.folded && s.stack > 0)
            .all(|s| s.acted && s.bet_street == self.current_bet)
    }

    /// Scans clockwise from `after + 1`, skipping empty, folded, and
    /// all-in seats.
    fn next_active_seat(&self, after: usize) -> Option<usize> {
        (1..=MAX_SEATS)
            .map(|k| (after + k) % MAX_SEATS)
            .find(|&i| self.seats[i].is_some_and(|s| s.is_active()))
    }

    pub fn valid_actions(&self, seat: usize) -> ValidActions {
        let s = match self.seats.get(seat).and_then(|s| s.as_ref()) {
            Some(s) if s.is_active() => s,
            _ => return ValidActions::none(),
        };
        let stack = s.stack;
        let call = self.current_bet - s.bet_street;
        let min_raise_abs = self.current_bet + self.last_full_raise.max(self.big_blind);
        let max_raise_abs = s.bet_street + stack;
        let can_afford_min_raise = stack >= min_raise_abs - s.bet_street;

        let (mut kinds, call_amount, mut min_raise, max_raise) = if call == 0 {
            if can_afford_min_raise {
                (
                    vec![ActionKind::Fold, ActionKind::Check, ActionKind::Raise],
                    0,
                    Some(min_raise_abs),
                    Some(max_raise_abs),
                )
            } else {
                (
                    vec![ActionKind::Fold, ActionKind::Check, ActionKind::AllIn],
                    0,
                    None,
                    Some(max_raise_abs),
                )
            }
        } else if stack >= call {
            if can_afford_min_raise {
                (
                    vec![ActionKind::Fold, ActionKind::Call, ActionKind::Raise],
                    call,
                    Some(min_raise_abs),
                    Some(max_raise_abs),
                )
            } else {
                (
                    vec![ActionKind::Fold, ActionKind::Call, ActionKind::AllIn],
                    call,
                    None,
                    Some(max_raise_abs),
                )
            }
        } else {
            (
                vec![ActionKind::Fold, ActionKind::AllIn],
                call,
                None,
                Some(max_raise_abs),
            )
        };

        // A short all-in earlier this street doesn't reopen full raising
        // rights to a seat that had already acted (spec §8 scenario 4):
        // it may still call or fold the new amount, but not raise.
        if s.raise_capped {
            kinds.retain(|k| *k != ActionKind::Raise);
            min_raise = None;
        }

        ValidActions {
            kinds,
            call_amount,
            min_raise,
            max_raise,
        }
    }

    pub fn dealer(&self) -> usize {
        self.dealer
    }
    pub fn small_blind_seat(&self) -> usize {
        self.small_blind_seat
    }
    pub fn big_blind_seat(&self) -> usize {
        self.big_blind_seat
    }
    pub fn street(&self) -> Street {
        self.street
    }
    pub fn board(&self) -> Board {
        self.board
    }
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }
    pub fn is_complete(&self) -> bool {
        self.street == Street::Complete
    }
    pub fn pot(&self) -> Chips {
        self.seats.iter().flatten().map(|s| s.committed).sum()
    }
    pub fn seat(&self, index: usize) -> Option<&HandSeat> {
        self.seats.get(index).and_then(|s| s.as_ref())
    }
    /// Final stacks to write back onto the owning `Table`'s seats.
    pub fn final_stacks(&self) -> [Option<Chips>; MAX_SEATS] {
        let mut out = [None; MAX_SEATS];
        for (i, s) in self.seats.iter().enumerate() {
            out[i] = s.map(|s| s.stack);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacks(values: [Option<Chips>; MAX_SEATS]) -> [Option<Chips>; MAX_SEATS] {
        values
    }

    #[test]
    fn heads_up_blinds_and_first_action_request() {
        let (state, events) = HandState::begin(
            0,
            stacks([Some(1000), Some(1000), None, None, None, None]),
            5,
            10,
        );
        assert_eq!(state.dealer(), 0);
        assert_eq!(state.small_blind_seat(), 0);
        assert_eq!(state.big_blind_seat(), 1);
        assert_eq!(state.pot(), 15);
        assert!(matches!(events[0], Event::HandStarted { dealer_seat: 0, small_blind_seat: 0, big_blind_seat: 1 }));
        assert!(matches!(events[1], Event::BlindPosted { seat: 0, amount: 5, new_stack: 995 }));
        assert!(matches!(events[2], Event::BlindPosted { seat: 1, amount: 10, new_stack: 990 }));
        match events.last().unwrap() {
            Event::ActionRequest { seat, valid } => {
                assert_eq!(*seat, 0);
                assert_eq!(valid.call_amount, 5);
                assert!(valid.contains(ActionKind::Fold));
                assert!(valid.contains(ActionKind::Call));
                assert!(valid.contains(ActionKind::Raise));
            }
            other => panic!("expected ActionRequest, got {other:?}"),
        }
    }

    #[test]
    fn fold_out_awards_pot_without_showdown() {
        let (state, _) = HandState::begin(
            0,
            stacks([Some(1000), Some(1000), None, None, None, None]),
            5,
            10,
        );
        let (state, events) = state.apply(0, Action::Fold).unwrap();
        assert!(state.is_complete());
        assert_eq!(state.seat(1).unwrap().stack, 1005);
        assert_eq!(state.seat(0).unwrap().stack, 995);
        let showdown = events
            .iter()
            .find_map(|e| match e {
                Event::ShowdownResult { winners, amounts_won, .. } => Some((winners, amounts_won)),
                _ => None,
            })
            .unwrap();
        assert_eq!(showdown.0, &vec![1]);
        assert_eq!(showdown.1.get(&1), Some(&15));
    }

    #[test]
    fn unequal_all_in_builds_side_pot_and_skips_all_in_seat() {
        let (mut state, _) = HandState::begin(
            0,
            stacks([Some(200), Some(500), Some(1000), None, None, None]),
            5,
            10,
        );
        // seat 0 posts sb=5, seat1 bb=10 would be wrong for 3-handed: sb=1,bb=2 by rotation.
        // Determine actual sb/bb from state rather than assuming seat numbers.
        let sb = state.small_blind_seat();
        let bb = state.big_blind_seat();
        let mut events_all = Vec::new();
        // seat 0 (first to act preflop 3-handed) shoves its entire 200-chip
        // stack; its stack can cover the min-raise, so it goes all-in via a
        // maximal Raise rather than the AllIn action (reserved for seats too
        // short to make a legal raise).
        let actor = state.cursor().unwrap();
        let valid = state.valid_actions(actor);
        let all_in_amount = valid.max_raise.unwrap();
        let (next_state, events) = state.apply(actor, Action::Raise(all_in_amount)).unwrap();
        state = next_state;
        events_all.extend(events);
        // remaining two seats call
        loop {
            if state.is_complete() {
                break;
            }
            let actor = match state.cursor() {
                Some(a) => a,
                None => break,
            };
            let valid = state.valid_actions(actor);
            let action = if valid.contains(ActionKind::Call) {
                Action::Call
            } else if valid.contains(ActionKind::Check) {
                Action::Check
            } else {
                break;
            };
            let (next_state, events) = state.apply(actor, action).unwrap();
            state = next_state;
            events_all.extend(events);
        }
        assert!(state.is_complete());
        assert!(!events_all.iter().any(|e| matches!(
            e,
            Event::ActionRequest { seat, .. } if *seat == 0
        )));
        let _ = (sb, bb);
    }

    #[test]
    fn min_raise_reopen_rejects_below_and_accepts_exact_minimum() {
        // spec §8 scenario 4: SB=5, BB=10, three seats. Seat after BB
        // (the dealer, 3-handed) raises to 30; the next seat's min-raise
        // becomes 50, not 45.
        let (state, _) = HandState::begin(
            0,
            stacks([Some(1000), Some(1000), Some(45), None, None, None]),
            5,
            10,
        );
        assert_eq!(state.small_blind_seat(), 1);
        assert_eq!(state.big_blind_seat(), 2);
        assert_eq!(state.cursor(), Some(0));

        let (state, _) = state.apply(0, Action::Raise(30)).unwrap();
        let valid = state.valid_actions(1);
        assert_eq!(valid.min_raise, Some(50));

        assert_eq!(
            state.apply(1, Action::Raise(45)).unwrap_err(),
            ActionError::InvalidAmount
        );
        assert!(state.apply(1, Action::Raise(50)).is_ok());
    }

    #[test]
    fn short_all_in_does_not_reopen_raise_to_previously_acted_seats() {
        // Continuing scenario 4: seat 1 just calls 30, and seat 2 (big
        // blind, short-stacked) can only reach 45 — below the 50 min-raise
        // — so it goes all-in instead of calling. That all-in must not
        // hand seats 0 or 1 a Raise option; they already acted this street
        // and only a full raise can reopen it for them.
        let (state, _) = HandState::begin(
            0,
            stacks([Some(1000), Some(1000), Some(45), None, None, None]),
            5,
            10,
        );
        let (state, _) = state.apply(0, Action::Raise(30)).unwrap();
        let (state, _) = state.apply(1, Action::Call).unwrap();

        let valid = state.valid_actions(2);
        assert!(!valid.contains(ActionKind::Raise));
        assert!(valid.contains(ActionKind::AllIn));

        let (state, events) = state.apply(2, Action::AllIn).unwrap();
        assert_eq!(state.seat(2).unwrap().stack, 0);
        assert_eq!(state.current_bet(), 45);

        let next = events
            .iter()
            .find_map(|e| match e {
                Event::ActionRequest { seat, valid } => Some((*seat, valid.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(next.0, 0);
        assert!(next.1.contains(ActionKind::Call));
        assert!(!next.1.contains(ActionKind::Raise));
        assert_eq!(next.1.min_raise, None);

        let valid0 = state.valid_actions(0);
        assert!(!valid0.contains(ActionKind::Raise));
        let valid1 = state.valid_actions(1);
        assert!(!valid1.contains(ActionKind::Raise));
    }
}
