/// draws every seat independently from its own range and rejects
/// draws with card collisions. unbiased, weight 1, but wasteful
/// when ranges overlap heavily; aborts when the ranges are so
/// tight that rejection cannot terminate.
pub struct MarginalRejection {
    dists: Vec<WeightedIndex<Weight>>,
    hands: Vec<Vec<Hand>>,
    dead: u64,
}

impl MarginalRejection {
    pub fn new(ranges: &[Range], dead: u64) -> Result<Self> {
        let mut dists = Vec::with_capacity(ranges.len());
        let mut hands = Vec::with_capacity(ranges.len());
        for (seat, range) in ranges.iter().enumerate() {
            let live = filter_range(range, dead, seat)?;
            dists.push(
                WeightedIndex::new(live.iter().map(|(_, w)| *w))
                    .map_err(|e| anyhow::anyhow!("seat {} weights: {}", seat, e))?,
            );
            hands.push(live.into_iter().map(|(h, _)| h).collect());
        }
        Ok(Self { dists, hands, dead })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<RoundSample> {
        let n = self.dists.len();
        'rejection: for _ in 0..crate::MAX_REJECTIONS {
            let mut sample = RoundSample {
                hands: Vec::with_capacity(n),
                mask: self.dead,
                weight: 1.0,
            };
            for seat in 0..n {
                let hand = self.hands[seat][self.dists[seat].sample(rng)];
                if hand.collides(sample.mask) {
                    continue 'rejection;
                }
                sample.mask |= hand.mask();
                sample.hands.push(hand);
            }
            return Ok(sample);
        }
        anyhow::bail!(
            "too many sample rejections: {} consecutive",
            crate::MAX_REJECTIONS
        )
    }
}

use super::filter_range;
use super::RoundSample;
use crate::cards::hand::Hand;
use crate::gameplay::range::Range;
use crate::Weight;
use anyhow::Result;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn samples_are_collision_free() {
        let ranges = vec![Range::full(), Range::full(), Range::full()];
        let sampler = MarginalRejection::new(&ranges, 0).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100 {
            let sample = sampler.sample(&mut rng).unwrap();
            assert!(sample.mask.count_ones() == 6);
            assert!(sample.weight == 1.0);
        }
    }

    #[test]
    fn infeasible_ranges_abort() {
        // seat 0 holds AcAd; seat 1's only combo needs the Ac
        let mut r0 = Range::empty();
        r0.set_hand(&Hand::try_from("AcAd").unwrap(), 1.0);
        let mut r1 = Range::empty();
        r1.set_hand(&Hand::try_from("AcKd").unwrap(), 1.0);
        let sampler = MarginalRejection::new(&[r0, r1], 0).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(sampler.sample(&mut rng).is_err());
    }

    #[test]
    fn dead_cards_empty_range_is_config_error() {
        let mut r0 = Range::empty();
        r0.set_hand(&Hand::try_from("AcAd").unwrap(), 1.0);
        let dead = Hand::try_from("AcKd").unwrap().mask();
        assert!(MarginalRejection::new(&[r0], dead).is_err());
    }
}
