/// draws every seat uniformly from its live combos and carries
/// the range densities as an importance weight. rejection still
/// handles collisions, but the uniform proposal keeps acceptance
/// high even for skewed ranges.
pub struct ImportanceRejection {
    filtered: Vec<Vec<(Hand, Weight)>>,
    joint: Weight,
    dead: u64,
}

impl ImportanceRejection {
    pub fn new(ranges: &[Range], dead: u64) -> Result<Self> {
        let filtered = ranges
            .iter()
            .enumerate()
            .map(|(seat, range)| filter_range(range, dead, seat))
            .collect::<Result<Vec<_>>>()?;
        let joint = filtered
            .iter()
            .map(|live| 1.0 / live.len() as Weight)
            .product();
        Ok(Self {
            filtered,
            joint,
            dead,
        })
    }

    pub fn filtered(&self) -> &[Vec<(Hand, Weight)>] {
        &self.filtered
    }
    pub fn joint(&self) -> Weight {
        self.joint
    }
    pub fn dead(&self) -> u64 {
        self.dead
    }

    /// draw combo indices, rejecting collisions; weight left at 1
    pub fn sample_indices<R: Rng>(&self, rng: &mut R) -> Result<(RoundSample, Vec<usize>)> {
        let n = self.filtered.len();
        'rejection: for _ in 0..crate::MAX_REJECTIONS {
            let mut sample = RoundSample {
                hands: Vec::with_capacity(n),
                mask: self.dead,
                weight: 1.0,
            };
            let mut indices = Vec::with_capacity(n);
            for seat in 0..n {
                let index = rng.random_range(0..self.filtered[seat].len());
                let (hand, _) = self.filtered[seat][index];
                if hand.collides(sample.mask) {
                    continue 'rejection;
                }
                sample.mask |= hand.mask();
                sample.hands.push(hand);
                indices.push(index);
            }
            return Ok((sample, indices));
        }
        anyhow::bail!(
            "too many sample rejections: {} consecutive",
            crate::MAX_REJECTIONS
        )
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<RoundSample> {
        let (mut sample, indices) = self.sample_indices(rng)?;
        sample.weight = 1.0 / self.joint;
        for (seat, index) in indices.iter().enumerate() {
            sample.weight *= self.filtered[seat][*index].1;
        }
        Ok(sample)
    }
}

use super::filter_range;
use super::RoundSample;
use crate::cards::hand::Hand;
use crate::gameplay::range::Range;
use crate::Weight;
use anyhow::Result;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_ranges_weigh_one() {
        let ranges = vec![Range::full(), Range::full()];
        let sampler = ImportanceRejection::new(&ranges, 0).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let sample = sampler.sample(&mut rng).unwrap();
        // densities cancel the uniform proposal exactly
        assert!((sample.weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn skewed_ranges_reweigh() {
        let mut skewed = Range::empty();
        skewed.set_hand(&Hand::try_from("AcAd").unwrap(), 3.0);
        skewed.set_hand(&Hand::try_from("KsKh").unwrap(), 1.0);
        let sampler = ImportanceRejection::new(&[skewed], 0).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let sample = sampler.sample(&mut rng).unwrap();
        // either 0.75 * 2 or 0.25 * 2 depending on the draw
        assert!((sample.weight - 1.5).abs() < 1e-9 || (sample.weight - 0.5).abs() < 1e-9);
    }
}
