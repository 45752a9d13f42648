/// searches a set of 5 to 7 cards for its best 5-card hand.
///
/// the card set is a 52-bit mask, so rank and suit structure
/// fall out of bitwise folds. class searches run strongest to
/// weakest and stop at the first hit; with at most 7 cards a
/// flush can never coexist with quads or a full house, so the
/// flush-first order is sound.
pub struct Evaluator(u64);

impl From<u64> for Evaluator {
    fn from(mask: u64) -> Self {
        assert!(mask.count_ones() >= 5);
        assert!(mask.count_ones() <= 7);
        Self(mask)
    }
}
impl From<(&Hand, &Board)> for Evaluator {
    fn from((hand, board): (&Hand, &Board)) -> Self {
        assert!(hand.mask() & board.mask() == 0);
        Self::from(hand.mask() | board.mask())
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
            .expect("at least five cards")
    }
    pub fn find_kickers(&self, ranking: Ranking) -> Kickers {
        let n = ranking.n_kickers();
        if n == 0 {
            return Kickers::default();
        }
        let made = match ranking {
            Ranking::TwoPair(hi, lo) => u16::from(hi) | u16::from(lo),
            Ranking::HighCard(hi)
            | Ranking::OnePair(hi)
            | Ranking::ThreeOAK(hi)
            | Ranking::FourOAK(hi) => u16::from(hi),
            _ => unreachable!("no kickers for {:?}", ranking),
        };
        let mut bits = self.rank_mask() & !made;
        while bits.count_ones() as usize > n {
            bits &= !(1 << bits.trailing_zeros());
        }
        Kickers::from(bits)
    }

    //

    fn find_1_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(1, None).map(Ranking::HighCard)
    }
    fn find_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(2, None).map(Ranking::OnePair)
    }
    fn find_3_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(3, None).map(Ranking::ThreeOAK)
    }
    fn find_4_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(4, None).map(Ranking::FourOAK)
    }
    fn find_2_oak_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(2, None).and_then(|hi| {
            self.find_rank_of_n_oak(2, Some(hi))
                .map(|lo| Ranking::TwoPair(hi, lo))
        })
    }
    fn find_3_oak_2_oak(&self) -> Option<Ranking> {
        self.find_rank_of_n_oak(3, None).and_then(|trips| {
            self.find_rank_of_pair_under(trips)
                .map(|pairs| Ranking::FullHouse(trips, pairs))
        })
    }
    fn find_straight(&self) -> Option<Ranking> {
        Self::find_rank_of_straight(self.rank_mask()).map(Ranking::Straight)
    }
    fn find_flush(&self) -> Option<Ranking> {
        self.find_suit_of_flush().map(|suit| {
            let bits = self.suit_mask(suit);
            match Self::find_rank_of_straight(bits) {
                Some(rank) => Ranking::StraightFlush(rank),
                None => Ranking::Flush(Rank::from(bits)),
            }
        })
    }

    //

    fn find_rank_of_straight(bits: u16) -> Option<Rank> {
        const WHEEL: u16 = 0b_1_0000_0000_1111;
        let mut runs = bits;
        runs &= runs << 1;
        runs &= runs << 1;
        runs &= runs << 1;
        runs &= runs << 1;
        if runs > 0 {
            Some(Rank::from(runs))
        } else if WHEEL == WHEEL & bits {
            Some(Rank::Five)
        } else {
            None
        }
    }
    fn find_suit_of_flush(&self) -> Option<Suit> {
        Suit::all()
            .into_iter()
            .find(|s| self.suit_mask(*s).count_ones() >= 5)
    }
    /// highest rank held at least n times, strictly below the given rank
    fn find_rank_of_n_oak(&self, n: u32, below: Option<Rank>) -> Option<Rank> {
        let top = below.map(|r| r as i8).unwrap_or(13);
        (0..top)
            .rev()
            .map(|r| Rank::from(r as u8))
            .find(|r| self.count_of_rank(*r) >= n)
    }
    /// highest rank held at least twice, excluding the trips rank.
    /// a second set of trips counts as the pair of a full house.
    fn find_rank_of_pair_under(&self, trips: Rank) -> Option<Rank> {
        (0..13)
            .rev()
            .map(|r| Rank::from(r as u8))
            .filter(|r| *r != trips)
            .find(|r| self.count_of_rank(*r) >= 2)
    }

    //

    fn count_of_rank(&self, rank: Rank) -> u32 {
        (self.0 >> (4 * rank as u64) & 0b1111).count_ones()
    }
    fn rank_mask(&self) -> u16 {
        let mut bits = self.0;
        let mut mask = 0u16;
        while bits != 0 {
            mask |= 1 << (bits.trailing_zeros() / 4);
            bits &= bits - 1;
        }
        mask
    }
    fn suit_mask(&self, suit: Suit) -> u16 {
        let mut bits = self.0;
        let mut mask = 0u16;
        while bits != 0 {
            let i = bits.trailing_zeros();
            if i % 4 == suit as u32 {
                mask |= 1 << (i / 4);
            }
            bits &= bits - 1;
        }
        mask
    }
}

use super::kicks::Kickers;
use super::ranking::Ranking;
use crate::cards::board::Board;
use crate::cards::hand::Hand;
use crate::cards::rank::Rank;
use crate::cards::suit::Suit;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::Card;

    fn ranking(cards: &[&str]) -> Ranking {
        let mask = cards
            .iter()
            .map(|s| Card::try_from(*s).unwrap())
            .map(|c| c.mask())
            .fold(0, |m, c| m | c);
        Evaluator::from(mask).find_ranking()
    }

    #[test]
    fn high_card() {
        let r = ranking(&["As", "Kh", "Qd", "Jc", "9s"]);
        assert!(r == Ranking::HighCard(Rank::Ace));
    }

    #[test]
    fn one_pair() {
        let r = ranking(&["As", "Ah", "Kd", "Qc", "Js"]);
        assert!(r == Ranking::OnePair(Rank::Ace));
    }

    #[test]
    fn two_pair() {
        let r = ranking(&["As", "Ah", "Kd", "Kc", "Qs"]);
        assert!(r == Ranking::TwoPair(Rank::Ace, Rank::King));
    }

    #[test]
    fn three_pair_takes_best_two() {
        let r = ranking(&["As", "Ah", "Kd", "Kc", "Qs", "Qh", "Jd"]);
        assert!(r == Ranking::TwoPair(Rank::Ace, Rank::King));
    }

    #[test]
    fn straight() {
        let r = ranking(&["Ts", "Jh", "Qd", "Kc", "As"]);
        assert!(r == Ranking::Straight(Rank::Ace));
    }

    #[test]
    fn wheel_straight() {
        let r = ranking(&["As", "2h", "3d", "4c", "5s"]);
        assert!(r == Ranking::Straight(Rank::Five));
    }

    #[test]
    fn flush_beats_straight() {
        let r = ranking(&["4h", "6h", "7h", "8h", "9h", "Ts"]);
        assert!(r == Ranking::Flush(Rank::Nine));
    }

    #[test]
    fn full_house_from_two_trips() {
        let r = ranking(&["As", "Ah", "Ad", "Kc", "Ks", "Kh", "Qd"]);
        assert!(r == Ranking::FullHouse(Rank::Ace, Rank::King));
    }

    #[test]
    fn four_oak_over_full_house() {
        let r = ranking(&["As", "Ah", "Ad", "Ac", "Ks", "Kh", "Qd"]);
        assert!(r == Ranking::FourOAK(Rank::Ace));
    }

    #[test]
    fn straight_flush_over_four_oak() {
        let r = ranking(&["Ts", "Js", "Qs", "Ks", "As", "Ah", "Ad"]);
        assert!(r == Ranking::StraightFlush(Rank::Ace));
    }

    #[test]
    fn kickers_break_ties() {
        let e1 = Evaluator::from(
            ["As", "Ah", "Kd", "Qc", "Js"]
                .iter()
                .map(|s| Card::try_from(*s).unwrap().mask())
                .fold(0, |m, c| m | c),
        );
        let r1 = e1.find_ranking();
        let k1 = e1.find_kickers(r1);
        assert!(u16::from(k1).count_ones() == 3);
    }
}
