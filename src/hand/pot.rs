use crate::cards::strength::Strength;
use crate::Chips;
use std::collections::HashMap;

/// A chip amount plus the seats eligible to win it. Side pots arise when one
/// or more seats are all-in for less than another seat's total commitment.
#[derive(Debug, Clone)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: Vec<usize>,
}

/// Layers every occupied seat's hand-long commitment into a main pot plus
/// zero or more side pots, per spec's "sort all-in amounts ascending; each
/// layer becomes a pot" rule. `entries` is (seat index, committed, folded)
/// for every seat that played a hand (folded seats still contributed chips,
/// they're simply excluded from `eligible`).
pub fn layer_pots(entries: &[(usize, Chips, bool)]) -> Vec<Pot> {
    let mut boundaries: Vec<Chips> = entries
        .iter()
        .map(|(_, committed, _)| *committed)
        .filter(|&c| c > 0)
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut pots = Vec::new();
    let mut prev = 0;
    for boundary in boundaries {
        let amount: Chips = entries
            .iter()
            .map(|(_, committed, _)| committed.min(&boundary) - committed.min(&prev))
            .sum();
        let eligible: Vec<usize> = entries
            .iter()
            .filter(|(_, committed, folded)| *committed >= boundary && !folded)
            .map(|(seat, _, _)| *seat)
            .collect();
        if amount > 0 && !eligible.is_empty() {
            pots.push(Pot { amount, eligible });
        }
        prev = boundary;
    }
    pots
}

/// Splits one pot among its best-hand eligible seats. Ties share the pot
/// evenly; any remainder (pot not evenly divisible) goes one chip at a time
/// to the tied winners in order starting from the seat immediately left of
/// the dealer.
pub fn distribute(
    pot: &Pot,
    strengths: &HashMap<usize, Strength>,
    dealer: usize,
    table_size: usize,
) -> HashMap<usize, Chips> {
    let best = pot
        .eligible
        .iter()
        .filter_map(|seat| strengths.get(seat))
        .max()
        .copied()
        .expect("pot has at least one eligible seat with a known strength");

    let mut winners: Vec<usize> = pot
        .eligible
        .iter()
        .copied()
        .filter(|seat| strengths.get(seat) == Some(&best))
        .collect();
    winners.sort_by_key(|&seat| (seat + table_size - dealer - 1) % table_size);

    let share = pot.amount / winners.len() as Chips;
    let remainder = (pot.amount % winners.len() as Chips) as usize;

    let mut payouts = HashMap::new();
    for (i, &seat) in winners.iter().enumerate() {
        let bonus = if i < remainder { 1 } else { 0 };
        *payouts.entry(seat).or_insert(0) += share + bonus;
    }
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::Card;
    use crate::cards::hand::Hand;
    use crate::cards::rank::Rank;
    use crate::cards::suit::Suit;

    #[test]
    fn main_and_side_pot_from_unequal_all_in() {
        // Seat 0 all-in for 200, seats 1 and 2 call 200 then bet to 500 each.
        let entries = vec![(0, 200, false), (1, 500, false), (2, 500, false)];
        let pots = layer_pots(&entries);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 600);
        assert_eq!(pots[0].eligible, vec![0, 1, 2]);
        assert_eq!(pots[1].amount, 600);
        assert_eq!(pots[1].eligible, vec![1, 2]);
    }

    #[test]
    fn odd_chip_goes_to_earliest_seat_left_of_dealer() {
        let pot = Pot {
            amount: 101,
            eligible: vec![2, 5],
        };
        let hand: Hand = vec![
            Card::from((Rank::Ace, Suit::Spade)),
            Card::from((Rank::Ace, Suit::Heart)),
            Card::from((Rank::King, Suit::Diamond)),
            Card::from((Rank::Queen, Suit::Club)),
            Card::from((Rank::Jack, Suit::Spade)),
        ]
        .into();
        let strength = Strength::from(hand);
        let mut strengths = HashMap::new();
        strengths.insert(2, strength);
        strengths.insert(5, strength);
        let payouts = distribute(&pot, &strengths, 7, 8);
        assert_eq!(payouts.get(&2), Some(&51));
        assert_eq!(payouts.get(&5), Some(&50));
        assert_eq!(payouts.values().sum::<Chips>(), 101);
    }
}
