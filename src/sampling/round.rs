#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Automatic,
    MarginalRejection,
    ImportanceRejection,
    ImportanceRandomWalk,
}

/// facade over the three hand samplers. the random walk is the
/// default: it never rejects after warm-up and its weights keep
/// estimators unbiased.
pub struct RoundSampler {
    marginal: MarginalRejection,
    importance: ImportanceRejection,
    walk: ImportanceWalk,
    mode: SamplingMode,
}

impl RoundSampler {
    pub fn new<R: Rng>(ranges: &[Range], dead: u64, rng: &mut R) -> Result<Self> {
        Ok(Self {
            marginal: MarginalRejection::new(ranges, dead)?,
            importance: ImportanceRejection::new(ranges, dead)?,
            walk: ImportanceWalk::new(ranges, dead, rng)?,
            mode: SamplingMode::Automatic,
        })
    }
    pub fn with_mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn sample<R: Rng>(&mut self, rng: &mut R) -> Result<RoundSample> {
        match self.mode {
            SamplingMode::Automatic | SamplingMode::ImportanceRandomWalk => {
                Ok(self.walk.sample(rng))
            }
            SamplingMode::ImportanceRejection => self.importance.sample(rng),
            SamplingMode::MarginalRejection => self.marginal.sample(rng),
        }
    }
    pub fn next_sample<R: Rng>(&mut self, sample: &mut RoundSample, rng: &mut R) {
        self.walk.next_sample(sample, rng);
    }
}

/// complete the board to five cards, drawing uniformly among
/// cards outside the mask
pub fn sample_board<R: Rng>(init: &Board, mask: u64, rng: &mut R) -> Board {
    let mut board = *init;
    let mut mask = mask | board.mask();
    while board.n() < crate::N_BOARD {
        let card = Card::from(rng.random_range(0..crate::N_CARDS) as u8);
        if card.mask() & mask == 0 {
            mask |= card.mask();
            board.push(card);
        }
    }
    board
}

use super::importance::ImportanceRejection;
use super::marginal::MarginalRejection;
use super::walk::ImportanceWalk;
use super::RoundSample;
use crate::cards::board::Board;
use crate::cards::card::Card;
use crate::gameplay::range::Range;
use anyhow::Result;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn board_respects_mask_and_prefix() {
        let init = Board::try_from("2h3h4c").unwrap();
        let dead = crate::cards::hand::Hand::try_from("AcAd").unwrap().mask();
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100 {
            let board = sample_board(&init, dead, &mut rng);
            assert!(board.n() == 5);
            assert!(board.mask() & dead == 0);
            assert!(board.mask() & init.mask() == init.mask());
            assert!(board.mask().count_ones() == 5);
        }
    }

    #[test]
    fn modes_share_ranges() {
        let ranges = vec![Range::full(), Range::full()];
        let mut rng = SmallRng::seed_from_u64(0);
        for mode in [
            SamplingMode::Automatic,
            SamplingMode::MarginalRejection,
            SamplingMode::ImportanceRejection,
            SamplingMode::ImportanceRandomWalk,
        ] {
            let mut sampler = RoundSampler::new(&ranges, 0, &mut rng)
                .unwrap()
                .with_mode(mode);
            let sample = sampler.sample(&mut rng).unwrap();
            assert!(sample.hands.len() == 2);
            assert!(sample.mask.count_ones() == 4);
        }
    }
}
