/// canonical hand indexing per street.
///
/// stands in for an external suit-isomorphism indexer: hole cards
/// rank into 0..1326 by colex, board cards rank by colex over the
/// street's card count, and the pair combines into a fixed
/// per-street codomain. canonically equal inputs always index
/// equal, so cluster tables key off these values directly.
pub struct Indexer;

impl Indexer {
    pub fn codomain(street: Street) -> u64 {
        crate::N_COMBOS as u64 * binomial(crate::N_CARDS as u64, street.n_board_cards() as u64)
    }

    pub fn index(hand: &Hand, board: &Board, street: Street) -> u64 {
        let hole = hole_index(hand) as u64;
        let k = street.n_board_cards();
        let boards = binomial(crate::N_CARDS as u64, k as u64);
        hole * boards + board_colex(board.street_cards(street))
    }
}

/// colex rank of a card subset among all subsets of its size
fn board_colex(cards: &[Card]) -> u64 {
    let mut sorted = cards.iter().map(|c| u8::from(*c) as u64).collect::<Vec<u64>>();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .map(|(i, c)| binomial(*c, i as u64 + 1))
        .sum()
}

fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

/// memoizes one seat's indices street by street, so re-indexing
/// the same hole cards as the board grows is incremental.
#[derive(Debug, Clone, Default)]
pub struct CachedIndexer {
    cache: [Option<u64>; crate::N_STREETS],
}

impl CachedIndexer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn index(&mut self, hand: &Hand, board: &Board, street: Street) -> u64 {
        let slot = street as usize;
        match self.cache[slot] {
            Some(index) => index,
            None => {
                let index = Indexer::index(hand, board, street);
                self.cache[slot] = Some(index);
                index
            }
        }
    }
}

use crate::cards::board::Board;
use crate::cards::card::Card;
use crate::cards::hand::Hand;
use crate::cards::street::Street;
use crate::gameplay::range::hole_index;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    #[test]
    fn within_codomain() {
        let board = Board::try_from("2h3h4c5d9s").unwrap();
        for _ in 0..1000 {
            let hand = Hand::random();
            if hand.collides(board.mask()) {
                continue;
            }
            for street in Street::all() {
                let index = Indexer::index(&hand, &board, *street);
                assert!(index < Indexer::codomain(*street));
            }
        }
    }

    #[test]
    fn canonical_equality() {
        let board = Board::try_from("2h3h4c").unwrap();
        let h1 = Hand::try_from("AcKd").unwrap();
        let h2 = Hand::try_from("KdAc").unwrap();
        assert!(
            Indexer::index(&h1, &board, Street::Flop) == Indexer::index(&h2, &board, Street::Flop)
        );
    }

    #[test]
    fn distinct_hands_distinct_indices() {
        let board = Board::try_from("2h3h4c").unwrap();
        let h1 = Hand::try_from("AcKd").unwrap();
        let h2 = Hand::try_from("AcQd").unwrap();
        assert!(
            Indexer::index(&h1, &board, Street::Flop) != Indexer::index(&h2, &board, Street::Flop)
        );
    }

    #[test]
    fn cache_is_transparent() {
        let board = Board::try_from("2h3h4c5d9s").unwrap();
        let hand = Hand::try_from("AcKd").unwrap();
        let mut cached = CachedIndexer::new();
        for street in Street::all() {
            assert!(
                cached.index(&hand, &board, *street) == Indexer::index(&hand, &board, *street)
            );
            assert!(
                cached.index(&hand, &board, *street) == Indexer::index(&hand, &board, *street)
            );
        }
    }
}
