/// regret matching: play each action proportionally to its
/// positive cumulative regret, uniformly when no regret is
/// positive.
pub fn regret_matching(regrets: &[Regret]) -> Vec<Probability> {
    assert!(!regrets.is_empty());
    let positive = regrets
        .iter()
        .map(|r| (*r).max(0) as Probability)
        .collect::<Vec<Probability>>();
    let total = positive.iter().sum::<Probability>();
    if total > 0.0 {
        positive.into_iter().map(|r| r / total).collect()
    } else {
        vec![1.0 / regrets.len() as Probability; regrets.len()]
    }
}

/// normalize accumulated average-strategy mass; empty mass means
/// the infoset was never visited by a strategy update
pub fn normalized(mass: &[f32]) -> Option<Vec<Probability>> {
    let total = mass.iter().map(|m| (*m).max(0.0) as Probability).sum::<Probability>();
    if total > 0.0 {
        Some(
            mass.iter()
                .map(|m| (*m).max(0.0) as Probability / total)
                .collect(),
        )
    } else {
        None
    }
}

/// draw an index from a normalized distribution
pub fn sample_index<R: Rng>(weights: &[Probability], rng: &mut R) -> usize {
    assert!(!weights.is_empty());
    let roll = rng.random::<Probability>();
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return index;
        }
    }
    weights.len() - 1
}

/// snapshot a row of atomic cells
pub fn load_row<V: Value>(row: &[V::Atomic]) -> Vec<V> {
    row.iter().map(|cell| V::load(cell)).collect()
}

use super::value::Value;
use crate::Probability;
use crate::Regret;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn positive_regrets_normalize() {
        let sigma = regret_matching(&[10, -5, 30, 0]);
        assert!(sigma == vec![0.25, 0.0, 0.75, 0.0]);
    }

    #[test]
    fn zero_mass_is_uniform() {
        let sigma = regret_matching(&[0, 0, 0, 0]);
        assert!(sigma == vec![0.25; 4]);
        let sigma = regret_matching(&[-10, -20]);
        assert!(sigma == vec![0.5, 0.5]);
    }

    #[test]
    fn sampling_respects_support() {
        let mut rng = SmallRng::seed_from_u64(0);
        let sigma = vec![0.0, 1.0, 0.0];
        for _ in 0..100 {
            assert!(sample_index(&sigma, &mut rng) == 1);
        }
    }

    #[test]
    fn empty_mass_is_none() {
        assert!(normalized(&[0.0, 0.0]).is_none());
        let sigma = normalized(&[1.0, 3.0]).unwrap();
        assert!(sigma == vec![0.25, 0.75]);
    }
}
