/// total showdown strength of a hand against a board.
///
/// stands in for an external `rank(hand, board)` evaluator. this
/// is always constructed from an unordered card set; the class is
/// found first and kickers break ties within it. `Ord` follows
/// hand strength, stronger compares greater.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Strength {
    ranking: Ranking,
    kicks: Kickers,
}

impl Strength {
    pub fn ranking(&self) -> Ranking {
        self.ranking
    }
}

impl From<Evaluator> for Strength {
    fn from(evaluator: Evaluator) -> Self {
        let ranking = evaluator.find_ranking();
        let kicks = evaluator.find_kickers(ranking);
        Self { ranking, kicks }
    }
}
impl From<(&Hand, &Board)> for Strength {
    fn from((hand, board): (&Hand, &Board)) -> Self {
        Self::from(Evaluator::from((hand, board)))
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.ranking, self.kicks)
    }
}

use super::evaluator::Evaluator;
use super::kicks::Kickers;
use super::ranking::Ranking;
use crate::cards::board::Board;
use crate::cards::hand::Hand;

#[cfg(test)]
mod tests {
    use super::*;

    fn strength(hand: &str, board: &str) -> Strength {
        let hand = Hand::try_from(hand).unwrap();
        let board = Board::try_from(board).unwrap();
        Strength::from((&hand, &board))
    }

    #[test]
    fn aces_beat_kings_on_blanks() {
        let aces = strength("AcAd", "2h3h4c5d9s");
        let kings = strength("KsKh", "2h3h4c5d9s");
        assert!(aces > kings);
    }

    #[test]
    fn board_plays_for_both() {
        let s1 = strength("2c3c", "AhKhQdJsTs");
        let s2 = strength("4d5d", "AhKhQdJsTs");
        assert!(s1 == s2);
    }

    #[test]
    fn kicker_decides() {
        let ak = strength("AcKd", "As7h4c2d9s");
        let aq = strength("AdQh", "As7h4c2d9s");
        assert!(ak > aq);
    }
}
