/// one of the 52 cards, stored as rank and suit.
/// the integer form is rank * 4 + suit, so 0 is 2c and 51 is As.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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
    /// one-hot position in the 52-bit card universe
    pub fn mask(&self) -> u64 {
        1u64 << u8::from(*self)
    }
}

impl From<(Rank, Suit)> for Card {
    fn from((rank, suit): (Rank, Suit)) -> Self {
        Self { rank, suit }
    }
}

/// u8 isomorphism
impl From<Card> for u8 {
    fn from(c: Card) -> u8 {
        (c.rank as u8) * 4 + (c.suit as u8)
    }
}
impl From<u8> for Card {
    fn from(n: u8) -> Self {
        assert!(n < crate::N_CARDS as u8);
        Self {
            rank: Rank::from(n / 4),
            suit: Suit::from(n % 4),
        }
    }
}

/// u64 isomorphism
impl From<Card> for u64 {
    fn from(c: Card) -> u64 {
        c.mask()
    }
}
impl From<u64> for Card {
    fn from(n: u64) -> Self {
        assert!(n.count_ones() == 1);
        Self::from(n.trailing_zeros() as u8)
    }
}

/// "Ac" notation
impl TryFrom<&str> for Card {
    type Error = anyhow::Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut chars = s.chars();
        let rank = chars.next().ok_or_else(|| anyhow::anyhow!("empty card"))?;
        let suit = chars.next().ok_or_else(|| anyhow::anyhow!("missing suit"))?;
        Ok(Self {
            rank: Rank::try_from(rank)?,
            suit: Suit::try_from(suit)?,
        })
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl crate::Arbitrary for Card {
    fn random() -> Self {
        use rand::Rng;
        Self::from(rand::rng().random_range(0..crate::N_CARDS) as u8)
    }
}

use super::rank::Rank;
use super::suit::Suit;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_u8() {
        assert!((0..52).all(|n| n == u8::from(Card::from(n))));
    }

    #[test]
    fn parse_notation() {
        let card = Card::try_from("As").unwrap();
        assert!(card.rank() == Rank::Ace);
        assert!(card.suit() == Suit::S);
        assert!(format!("{}", card) == "As");
    }
}
