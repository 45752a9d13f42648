/// the 1326 hole combos in colex order: index = hi*(hi-1)/2 + lo
/// where hi > lo are the integer card forms.
pub fn hole_index(hand: &Hand) -> usize {
    let hi = u8::from(hand.hi()) as usize;
    let lo = u8::from(hand.lo()) as usize;
    hi * (hi - 1) / 2 + lo
}

/// inverse of `hole_index`
pub fn hole_combo(index: usize) -> Hand {
    assert!(index < crate::N_COMBOS);
    let mut hi = 1usize;
    while (hi + 1) * hi / 2 <= index {
        hi += 1;
    }
    let lo = index - hi * (hi - 1) / 2;
    Hand::from((Card::from(hi as u8), Card::from(lo as u8)))
}

/// a weighted distribution over hole combos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    weights: Vec<Weight>,
}

impl Range {
    pub fn empty() -> Self {
        Self {
            weights: vec![0.0; crate::N_COMBOS],
        }
    }
    /// every combo at full weight
    pub fn full() -> Self {
        Self {
            weights: vec![1.0; crate::N_COMBOS],
        }
    }
    pub fn add_hand(&mut self, hand: &Hand, weight: Weight) {
        self.weights[hole_index(hand)] += weight;
    }
    pub fn set_hand(&mut self, hand: &Hand, weight: Weight) {
        self.weights[hole_index(hand)] = weight;
    }
    pub fn frequency(&self, hand: &Hand) -> Weight {
        self.weights[hole_index(hand)]
    }
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }
    /// total weight in the range
    pub fn n_combos(&self) -> Weight {
        self.weights.iter().sum()
    }
    /// zero out combos colliding with dead cards
    pub fn remove_cards(&mut self, mask: u64) {
        for (i, w) in self.weights.iter_mut().enumerate() {
            if *w > 0.0 && hole_combo(i).collides(mask) {
                *w = 0.0;
            }
        }
    }
    /// combos carrying weight
    pub fn hands(&self) -> impl Iterator<Item = (Hand, Weight)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0.0)
            .map(|(i, w)| (hole_combo(i), *w))
    }
}

impl std::ops::MulAssign<&Range> for Range {
    fn mul_assign(&mut self, other: &Range) {
        for (w, o) in self.weights.iter_mut().zip(other.weights.iter()) {
            *w *= o;
        }
    }
}
impl std::ops::AddAssign<&Range> for Range {
    fn add_assign(&mut self, other: &Range) {
        for (w, o) in self.weights.iter_mut().zip(other.weights.iter()) {
            *w += o;
        }
    }
}

use crate::cards::card::Card;
use crate::cards::hand::Hand;
use crate::Weight;
use serde::Deserialize;
use serde::Serialize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_hole_index() {
        for i in 0..crate::N_COMBOS {
            assert!(hole_index(&hole_combo(i)) == i);
        }
    }

    #[test]
    fn full_range_counts() {
        assert!(Range::full().n_combos() == crate::N_COMBOS as Weight);
    }

    #[test]
    fn card_removal() {
        let mut range = Range::full();
        let dead = Hand::try_from("AcAd").unwrap();
        range.remove_cards(dead.mask());
        // 51 + 50 combos touch one of the two dead cards
        assert!(range.n_combos() == (crate::N_COMBOS - 101) as Weight);
        assert!(range.frequency(&Hand::try_from("AcKd").unwrap()) == 0.0);
        assert!(range.frequency(&Hand::try_from("KsKh").unwrap()) == 1.0);
    }
}
