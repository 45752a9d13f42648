pub mod importance;
pub mod marginal;
pub mod round;
pub mod walk;

/// one correlated draw of hole cards for every seat.
///
/// `mask` is the union of the dealt hands and any dead cards the
/// sampler was constructed with; `weight` is the importance weight
/// relative to the joint range distribution (1 for unweighted
/// rejection sampling).
#[derive(Debug, Clone)]
pub struct RoundSample {
    pub hands: Vec<Hand>,
    pub mask: u64,
    pub weight: Weight,
}

/// zero out combos blocked by dead cards, normalize to a
/// distribution, and keep only live combos alongside their
/// weights. an emptied range is a configuration error.
pub(crate) fn filter_range(range: &Range, dead: u64, seat: usize) -> Result<Vec<(Hand, Weight)>> {
    let mut live = range
        .hands()
        .filter(|(hand, _)| !hand.collides(dead))
        .collect::<Vec<(Hand, Weight)>>();
    let total = live.iter().map(|(_, w)| w).sum::<Weight>();
    anyhow::ensure!(
        total > 0.0,
        "seat {} range emptied after card removal",
        seat
    );
    for (_, w) in live.iter_mut() {
        *w /= total;
    }
    Ok(live)
}

use crate::cards::hand::Hand;
use crate::gameplay::range::Range;
use crate::Weight;
use anyhow::Result;
