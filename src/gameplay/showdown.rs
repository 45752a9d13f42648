/// one seat's claim on the pot at showdown.
#[derive(Debug, Clone)]
pub struct Claim {
    pub reward: Chips,
    pub risked: Chips,
    pub folded: bool,
    pub strength: Strength,
}

impl Claim {
    pub fn pnl(&self) -> Chips {
        self.reward - self.risked
    }
}

/// distribute the pot, side pots included, by slicing total
/// contributions into layers at each distinct stake. a layer is
/// won by the strongest unfolded claim fully invested in it;
/// ties split evenly with odd chips to the earliest seat.
pub fn settle(mut claims: Vec<Claim>) -> Vec<Claim> {
    let mut stakes = claims
        .iter()
        .filter(|c| !c.folded)
        .map(|c| c.risked)
        .collect::<Vec<Chips>>();
    stakes.sort_unstable();
    stakes.dedup();
    let mut prev = 0 as Chips;
    for stake in stakes {
        let layer = claims
            .iter()
            .map(|c| c.risked.min(stake).saturating_sub(prev).max(0))
            .sum::<Chips>();
        let best = claims
            .iter()
            .filter(|c| !c.folded)
            .filter(|c| c.risked >= stake)
            .map(|c| c.strength)
            .max()
            .expect("an unfolded claim covers every layer");
        let winners = claims
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.folded)
            .filter(|(_, c)| c.risked >= stake)
            .filter(|(_, c)| c.strength == best)
            .map(|(i, _)| i)
            .collect::<Vec<usize>>();
        let share = layer / winners.len() as Chips;
        let remainder = layer % winners.len() as Chips;
        for (nth, i) in winners.into_iter().enumerate() {
            claims[i].reward += share + if (nth as Chips) < remainder { 1 } else { 0 };
        }
        prev = stake;
    }
    debug_assert!(
        claims.iter().map(|c| c.reward).sum::<Chips>()
            <= claims.iter().map(|c| c.risked).sum::<Chips>()
    );
    claims
}

use crate::evaluation::strength::Strength;
use crate::Chips;
