/// a 52-card deck with optional dead cards removed.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    dead: u64,
}

impl Deck {
    pub fn new() -> Self {
        Self::from(0u64)
    }
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        use rand::seq::SliceRandom;
        self.reset();
        self.cards.shuffle(rng);
    }
    pub fn draw(&mut self) -> Card {
        self.cards.pop().expect("deck is not empty")
    }
    fn reset(&mut self) {
        let dead = self.dead;
        self.cards = (0..crate::N_CARDS as u8)
            .map(Card::from)
            .filter(|c| c.mask() & dead == 0)
            .collect();
    }
}

/// dead-card mask isomorphism
impl From<u64> for Deck {
    fn from(dead: u64) -> Self {
        let mut deck = Self {
            cards: Vec::with_capacity(crate::N_CARDS),
            dead,
        };
        deck.reset();
        deck
    }
}

use super::card::Card;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn respects_dead_cards() {
        let dead = crate::cards::hand::Hand::try_from("AcAd").unwrap().mask();
        let mut deck = Deck::from(dead);
        assert!(deck.remaining() == 50);
        let mut rng = SmallRng::seed_from_u64(0);
        deck.shuffle(&mut rng);
        for _ in 0..50 {
            assert!(deck.draw().mask() & dead == 0);
        }
    }
}
