/// markov-chain variant of importance sampling: one seat's combo
/// index rolls backwards (modular decrement) to the next
/// non-colliding combo each step, and the weight updates
/// incrementally. successive samples are correlated, so variance
/// estimation over them must use weighted statistics.
pub struct ImportanceWalk {
    base: ImportanceRejection,
    indices: Vec<usize>,
}

impl ImportanceWalk {
    pub fn new<R: Rng>(ranges: &[Range], dead: u64, rng: &mut R) -> Result<Self> {
        let base = ImportanceRejection::new(ranges, dead)?;
        let (_, indices) = base.sample_indices(rng)?;
        Ok(Self { base, indices })
    }

    /// assemble the sample for the current assignment, stepping
    /// one random seat first
    pub fn sample<R: Rng>(&mut self, rng: &mut R) -> RoundSample {
        let n = self.indices.len();
        let seat = rng.random_range(0..n);
        let mut sample = RoundSample {
            hands: vec![Hand::blank(); n],
            mask: self.base.dead(),
            weight: 1.0 / self.base.joint(),
        };
        for other in 0..n {
            if other == seat {
                continue;
            }
            let (hand, weight) = self.base.filtered()[other][self.indices[other]];
            sample.hands[other] = hand;
            sample.weight *= weight;
            sample.mask |= hand.mask();
        }
        self.step(seat, &mut sample);
        sample
    }

    /// advance the chain in place: back out one seat's hand and
    /// roll its combo index to the next non-colliding assignment
    pub fn next_sample<R: Rng>(&mut self, sample: &mut RoundSample, rng: &mut R) {
        let seat = rng.random_range(0..self.indices.len());
        let (hand, weight) = self.base.filtered()[seat][self.indices[seat]];
        sample.weight /= weight;
        sample.mask &= !hand.mask();
        self.step(seat, sample);
    }

    fn step(&mut self, seat: usize, sample: &mut RoundSample) {
        let combos = &self.base.filtered()[seat];
        let index = &mut self.indices[seat];
        loop {
            *index = match *index {
                0 => combos.len() - 1,
                i => i - 1,
            };
            if !combos[*index].0.collides(sample.mask) {
                break;
            }
        }
        let (hand, weight) = combos[*index];
        sample.hands[seat] = hand;
        sample.weight *= weight;
        sample.mask |= hand.mask();
    }
}

use super::importance::ImportanceRejection;
use super::RoundSample;
use crate::cards::hand::Hand;
use crate::gameplay::range::Range;
use anyhow::Result;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn chain_stays_collision_free() {
        let ranges = vec![Range::full(), Range::full(), Range::full()];
        let mut rng = SmallRng::seed_from_u64(0);
        let mut walker = ImportanceWalk::new(&ranges, 0, &mut rng).unwrap();
        let mut sample = walker.sample(&mut rng);
        for _ in 0..1000 {
            walker.next_sample(&mut sample, &mut rng);
            assert!(sample.mask.count_ones() == 6);
            let mut union = 0u64;
            for hand in sample.hands.iter() {
                assert!(!hand.collides(union));
                union |= hand.mask();
            }
        }
    }

    #[test]
    fn weights_track_densities() {
        let mut skewed = Range::empty();
        skewed.set_hand(&Hand::try_from("AcAd").unwrap(), 3.0);
        skewed.set_hand(&Hand::try_from("KsKh").unwrap(), 1.0);
        skewed.set_hand(&Hand::try_from("QsQh").unwrap(), 4.0);
        let mut rng = SmallRng::seed_from_u64(0);
        let mut walker = ImportanceWalk::new(&[skewed.clone()], 0, &mut rng).unwrap();
        let mut sample = walker.sample(&mut rng);
        for _ in 0..100 {
            walker.next_sample(&mut sample, &mut rng);
            // normalized density over the 1/3 uniform proposal
            let expected = (skewed.frequency(&sample.hands[0]) / 8.0) * 3.0;
            assert!((sample.weight - expected).abs() < 1e-9);
        }
    }
}
