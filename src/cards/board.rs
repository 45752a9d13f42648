/// community cards, up to 5, in deal order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cards: [Card; crate::N_BOARD],
    n: u8,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cards: [Card::from(0u8); crate::N_BOARD],
            n: 0,
        }
    }
    pub fn n(&self) -> usize {
        self.n as usize
    }
    pub fn push(&mut self, card: Card) {
        assert!(self.n() < crate::N_BOARD, "board is full");
        assert!(!self.collides(card.mask()), "board card repeated");
        self.cards[self.n()] = card;
        self.n += 1;
    }
    /// cards revealed by the given street
    pub fn street_cards(&self, street: Street) -> &[Card] {
        let n = street.n_board_cards().min(self.n());
        &self.cards[..n]
    }
    pub fn cards(&self) -> &[Card] {
        &self.cards[..self.n()]
    }
    pub fn mask(&self) -> u64 {
        self.cards().iter().map(Card::mask).fold(0, |m, c| m | c)
    }
    pub fn collides(&self, mask: u64) -> bool {
        self.mask() & mask != 0
    }
}

impl From<&[Card]> for Board {
    fn from(cards: &[Card]) -> Self {
        assert!(cards.len() <= crate::N_BOARD);
        let mut board = Self::empty();
        for card in cards {
            board.push(*card);
        }
        board
    }
}

/// "2h3h4c5d9s" notation, any prefix length
impl TryFrom<&str> for Board {
    type Error = anyhow::Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        anyhow::ensure!(s.len() % 2 == 0, "board notation has odd length: {}", s);
        anyhow::ensure!(s.len() <= 10, "board notation too long: {}", s);
        let mut board = Self::empty();
        for i in (0..s.len()).step_by(2) {
            board.push(Card::try_from(&s[i..i + 2])?);
        }
        Ok(board)
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for card in self.cards() {
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

use super::card::Card;
use super::street::Street;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
