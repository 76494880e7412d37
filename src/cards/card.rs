use super::rank::Rank;
use super::suit::Suit;
use std::fmt::{Display, Formatter, Result};
use std::str::FromStr;

/// A single playing card, stored as rank + suit.
/// The u8 isomorphism (`rank * 4 + suit`) is what `Hand`'s bitset indexes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    rank: Rank,
    suit: Suit,
}

impl Card {
    pub fn rank(&self) -> Rank {
        self.rank
    }
    pub fn suit(&self) -> Suit {
        self.suit
    }
}

impl From<(Rank, Suit)> for Card {
    fn from((rank, suit): (Rank, Suit)) -> Self {
        Self { rank, suit }
    }
}

impl From<u8> for Card {
    fn from(n: u8) -> Self {
        Self {
            rank: Rank::from(n / 4),
            suit: Suit::from(n % 4),
        }
    }
}

impl From<Card> for u8 {
    fn from(c: Card) -> u8 {
        (c.rank as u8) * 4 + (c.suit as u8)
    }
}

impl FromStr for Card {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        let rank = chars.next().ok_or(())?;
        let suit = chars.next().ok_or(())?;
        if chars.next().is_some() {
            return Err(());
        }
        Ok(Self {
            rank: Rank::try_from(rank)?,
            suit: Suit::try_from(suit)?,
        })
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for n in 0..52u8 {
            let card = Card::from(n);
            let text = card.to_string();
            let parsed = text.parse::<Card>().unwrap();
            assert_eq!(u8::from(parsed), n);
        }
    }

    #[test]
    fn parses_ace_of_spades() {
        let card = "As".parse::<Card>().unwrap();
        assert_eq!(card.rank(), Rank::Ace);
        assert_eq!(card.suit(), Suit::Spade);
    }

    #[test]
    fn rejects_garbage() {
        assert!("Zz".parse::<Card>().is_err());
        assert!("A".parse::<Card>().is_err());
        assert!("Ass".parse::<Card>().is_err());
    }
}
