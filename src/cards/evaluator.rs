use super::card::Card;
use super::hand::Hand;
use super::kicks::Kickers;
use super::rank::Rank;
use super::ranking::Ranking;
use super::suit::Suit;

/// Evaluates the best 5-card ranking obtainable from an unordered 5–7 card
/// `Hand`, using bitwise scans over the 13-bit rank mask and the 4 per-suit
/// rank masks rather than an explicit combinatorial search over C(7,5).
pub struct Evaluator(Hand);

impl From<Hand> for Evaluator {
    fn from(h: Hand) -> Self {
        Self(h)
    }
}

impl Evaluator {
    pub fn find_ranking(&self) -> Ranking {
        None.or_else(|| self.find_flush())
            .or_else(|| self.find_4_oak())
            .or_else(|| self.find_3_oak_2_oak())
            .or_else(|| self.find_straight())
            .or_else(|| self.find_3_oak())
            .or_else(|| self.find_2_oak_2_oak())
            .or_else(|| self.find_2_oak())
            .or_else(|| self.find_1_oak())
            .expect("at least one card in hand")
    }

    pub fn find_kickers(&self, value: Ranking) -> Kickers {
        let n = value.n_kickers();
        if n == 0 {
            return Kickers::from(0u16);
        }
        let mask = match value {
            Ranking::TwoPair(hi, lo) => u16::from(hi) | u16::from(lo),
            Ranking::HighCard(hi)
            | Ranking::OnePair(hi)
            | Ranking::ThreeOAK(hi)
            | Ranking::FourOAK(hi) => u16::from(hi),
            _ => unreachable!("categories with 0 kickers already returned above"),
        };
        let mut bits = !mask & self.rank_masks();
        while bits.count_ones() as usize > n {
            bits &= !(1 << bits.trailing_zeros());
        }
        Kickers::from(bits)
    }

    fn find_1_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(1).map(Ranking::HighCard)
    }
    fn find_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(2).map(Ranking::OnePair)
    }
    fn find_3_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(3).map(Ranking::ThreeOAK)
    }
    fn find_4_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(4).map(Ranking::FourOAK)
    }
    fn find_2_oak_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(2).and_then(|hi| {
            self.find_rank_of_n_oak_excluding(2, Some(hi))
                .map(|lo| Ranking::TwoPair(hi, lo))
                .or(Some(Ranking::OnePair(hi)))
        })
    }
    fn find_3_oak_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(3).and_then(|trips| {
            self.find_rank_of_n_oak_excluding(2, Some(trips))
                .map(|pairs| Ranking::FullHouse(trips, pairs))
        })
    }
    fn find_straight(&self) -> Option<Ranking> {
        self.find_rank_of_straight(self.rank_masks())
            .map(Ranking::Straight)
    }
    fn find_flush(&self) -> Option<Ranking> {
        self.find_suit_of_flush().map(|suit| {
            let bits = self.suit_masks()[suit as usize];
            self.find_rank_of_straight(bits)
                .map(Ranking::StraightFlush)
                .unwrap_or_else(|| Ranking::Flush(Rank::from(bits)))
        })
    }

    /// The highest rank that begins a run of 5 consecutive set bits, with
    /// the wheel (A-2-3-4-5) special-cased since it isn't 5 consecutive bits.
    fn find_rank_of_straight(&self, mask: u16) -> Option<Rank> {
        const WHEEL: u16 = 0b_1_0000_0000_1111;
        let mut bits = mask;
        bits &= bits << 1;
        bits &= bits << 1;
        bits &= bits << 1;
        bits &= bits << 1;
        if bits > 0 {
            Some(Rank::from(bits))
        } else if mask & WHEEL == WHEEL {
            Some(Rank::Five)
        } else {
            None
        }
    }

    fn find_suit_of_flush(&self) -> Option<Suit> {
        self.suit_count()
            .iter()
            .position(|&n| n >= 5)
            .map(|i| Suit::from(i as u8))
    }

    /// Highest rank with at least `oak` cards, ignoring `exclude` itself
    /// (not merely ranks above or below it) when given, else unrestricted.
    /// A pair outranking an already-found trips still counts here — full
    /// house pairs can sit on either side of the trips rank.
    fn find_rank_of_n_oak_excluding(&self, oak: usize, exclude: Option<Rank>) -> Option<Rank> {
        let counts = self.rank_counts();
        (0..13u8)
            .rev()
            .filter(|&i| exclude.map(u8::from) != Some(i))
            .find(|&i| counts[i as usize] as usize >= oak)
            .map(Rank::from)
    }
    fn find_rank_of_n_oak(&self, n: usize) -> Option<Rank> {
        self.find_rank_of_n_oak_excluding(n, None)
    }

    /// Which ranks are present in the hand, ignoring suit.
    fn rank_masks(&self) -> u16 {
        Vec::<Card>::from(self.0)
            .iter()
            .map(|c| u16::from(c.rank()))
            .fold(0, |acc, r| acc | r)
    }
    /// How many cards of each rank are present, ignoring suit.
    fn rank_counts(&self) -> [u8; 13] {
        Vec::<Card>::from(self.0)
            .iter()
            .map(|c| u8::from(c.rank()))
            .fold([0u8; 13], |mut counts, r| {
                counts[r as usize] += 1;
                counts
            })
    }
    /// How many cards of each suit are present, ignoring rank.
    fn suit_count(&self) -> [u8; 4] {
        Vec::<Card>::from(self.0)
            .iter()
            .map(|c| u8::from(c.suit()))
            .fold([0; 4], |mut counts, s| {
                counts[s as usize] += 1;
                counts
            })
    }
    /// Which ranks are present in the hand, grouped by suit.
    fn suit_masks(&self) -> [u16; 4] {
        Vec::<Card>::from(self.0)
            .iter()
            .map(|c| (u8::from(c.suit()), u16::from(c.rank())))
            .fold([0; 4], |mut suits, (s, r)| {
                suits[s as usize] |= r;
                suits
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::rank::Rank;
    use crate::cards::strength::Strength;
    use crate::cards::suit::Suit;

    fn evaluate(cards: Vec<(Rank, Suit)>) -> Ranking {
        let hand: Hand = cards.into_iter().map(Card::from).collect();
        Evaluator::from(hand).find_ranking()
    }

    #[test]
    fn high_card() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::King, Suit::Heart),
            (Rank::Queen, Suit::Diamond),
            (Rank::Jack, Suit::Club),
            (Rank::Nine, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::HighCard(Rank::Ace));
    }

    #[test]
    fn one_pair() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::King, Suit::Diamond),
            (Rank::Queen, Suit::Club),
            (Rank::Jack, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::OnePair(Rank::Ace));
    }

    #[test]
    fn two_pair() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::King, Suit::Diamond),
            (Rank::King, Suit::Club),
            (Rank::Queen, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::TwoPair(Rank::Ace, Rank::King));
    }

    #[test]
    fn three_of_a_kind() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::Ace, Suit::Diamond),
            (Rank::King, Suit::Club),
            (Rank::Queen, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::ThreeOAK(Rank::Ace));
    }

    #[test]
    fn straight() {
        let hand = vec![
            (Rank::Ten, Suit::Spade),
            (Rank::Jack, Suit::Heart),
            (Rank::Queen, Suit::Diamond),
            (Rank::King, Suit::Club),
            (Rank::Ace, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::Straight(Rank::Ace));
    }

    #[test]
    fn wheel_straight_is_five_high() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Two, Suit::Heart),
            (Rank::Three, Suit::Diamond),
            (Rank::Four, Suit::Club),
            (Rank::Five, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::Straight(Rank::Five));
    }

    #[test]
    fn flush() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::King, Suit::Spade),
            (Rank::Queen, Suit::Spade),
            (Rank::Jack, Suit::Spade),
            (Rank::Nine, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::Flush(Rank::Ace));
    }

    #[test]
    fn full_house() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::Ace, Suit::Diamond),
            (Rank::King, Suit::Club),
            (Rank::King, Suit::Spade),
        ];
        assert_eq!(
            evaluate(hand),
            Ranking::FullHouse(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn four_of_a_kind() {
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::Ace, Suit::Diamond),
            (Rank::Ace, Suit::Club),
            (Rank::King, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::FourOAK(Rank::Ace));
    }

    #[test]
    fn straight_flush() {
        let hand = vec![
            (Rank::Nine, Suit::Spade),
            (Rank::Ten, Suit::Spade),
            (Rank::Jack, Suit::Spade),
            (Rank::Queen, Suit::Spade),
            (Rank::King, Suit::Spade),
        ];
        assert_eq!(evaluate(hand), Ranking::StraightFlush(Rank::King));
    }

    #[test]
    fn royal_flush_label() {
        let hand = vec![
            (Rank::Ten, Suit::Spade),
            (Rank::Jack, Suit::Spade),
            (Rank::Queen, Suit::Spade),
            (Rank::King, Suit::Spade),
            (Rank::Ace, Suit::Spade),
        ];
        assert_eq!(
            evaluate(hand),
            Ranking::StraightFlush(Rank::Ace)
        );
        assert_eq!(Ranking::StraightFlush(Rank::Ace).label(), "Royal Flush");
    }

    #[test]
    fn best_five_of_seven_ignores_weaker_combination() {
        // Board + hole combine to a flush draw that misses, but a pair of aces
        // on top of trip kings -- full house should win over the made pair.
        let hand = vec![
            (Rank::Ace, Suit::Spade),
            (Rank::Ace, Suit::Heart),
            (Rank::King, Suit::Diamond),
            (Rank::King, Suit::Club),
            (Rank::King, Suit::Spade),
            (Rank::Two, Suit::Heart),
            (Rank::Seven, Suit::Diamond),
        ];
        assert_eq!(evaluate(hand), Ranking::FullHouse(Rank::King, Rank::Ace));
    }

    #[test]
    fn compare_is_trichotomous_and_antisymmetric() {
        let pair: Strength = Hand::from(vec![
            Card::from((Rank::Ace, Suit::Spade)),
            Card::from((Rank::Ace, Suit::Heart)),
            Card::from((Rank::King, Suit::Diamond)),
            Card::from((Rank::Queen, Suit::Club)),
            Card::from((Rank::Jack, Suit::Spade)),
        ])
        .into();
        let trips: Strength = Hand::from(vec![
            Card::from((Rank::Two, Suit::Spade)),
            Card::from((Rank::Two, Suit::Heart)),
            Card::from((Rank::Two, Suit::Diamond)),
            Card::from((Rank::Four, Suit::Club)),
            Card::from((Rank::Five, Suit::Spade)),
        ])
        .into();
        assert!(trips > pair);
        assert!(pair < trips);
        assert_eq!(pair.cmp(&pair), std::cmp::Ordering::Equal);
    }
}
