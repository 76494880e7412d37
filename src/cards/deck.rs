use super::card::Card;
use rand::seq::SliceRandom;

/// A shuffled, 52-card deck. Dealing always consumes from the head; the
/// deck never reshuffles mid-hand.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a fresh 52-card deck and shuffles it with a CSPRNG.
    pub fn shuffled() -> Self {
        let mut cards: Vec<Card> = (0..52u8).map(Card::from).collect();
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Deals a single card from the head of the deck.
    pub fn deal(&mut self) -> Card {
        self.cards.remove(0)
    }

    /// Discards the head card without surfacing it.
    pub fn burn(&mut self) {
        self.cards.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = Deck::shuffled();
        assert_eq!(deck.len(), 52);
        let unique: HashSet<u8> = deck.cards.iter().map(|c| u8::from(*c)).collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn deal_consumes_from_head() {
        let mut deck = Deck::shuffled();
        let head = deck.cards[0];
        let dealt = deck.deal();
        assert_eq!(head, dealt);
        assert_eq!(deck.len(), 51);
    }
}
