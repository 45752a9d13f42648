/// greedy earth mover's distance heuristic.
///
/// used offline when building the turn/river abstraction: the
/// true transport problem over river-cluster histograms is too
/// slow at that scale, so each source point's unit mass goes to
/// its nearest target cluster with capacity remaining. inputs are
/// validated up front because the tables they come from are built
/// by separate tooling.
///
/// `x` holds the source points as cluster labels, `m` the target
/// masses summing to 1, and `sorted` one row per cluster label
/// with (distance, target position) pairs in non-decreasing
/// distance order.
pub fn emd_heuristic(x: &[usize], m: &[Weight], sorted: &[Vec<(f64, usize)>]) -> Result<Weight> {
    let q = m.len();
    for label in x {
        anyhow::ensure!(*label < sorted.len(), "cluster label {} out of range", label);
    }
    let total = m.iter().sum::<Weight>();
    anyhow::ensure!(
        (total - 1.0).abs() <= 1e-6,
        "target masses sum to {}, not 1",
        total
    );
    for row in sorted {
        anyhow::ensure!(row.len() == q, "sorted distance row size mismatch");
        for idx in 0..q {
            anyhow::ensure!(
                idx == 0 || row[idx - 1].0 <= row[idx].0,
                "distances are not sorted: {} > {}",
                row[idx - 1].0,
                row[idx].0
            );
            anyhow::ensure!(row[idx].1 < q, "ordered cluster index out of bounds");
        }
    }

    let unit = 1.0 / x.len() as Weight;
    let mut targets = vec![unit; x.len()];
    let mut remaining = m.to_vec();
    let mut done = vec![false; x.len()];
    let mut cost = 0.0;
    for rank in 0..q {
        for (j, label) in x.iter().enumerate() {
            if done[j] {
                continue;
            }
            let (distance, target) = sorted[*label][rank];
            let capacity = remaining[target];
            if capacity == 0.0 {
                continue;
            }
            if capacity < targets[j] {
                cost += capacity * distance;
                targets[j] -= capacity;
                remaining[target] = 0.0;
            } else {
                cost += targets[j] * distance;
                remaining[target] -= targets[j];
                targets[j] = 0.0;
                done[j] = true;
            }
        }
    }
    Ok(cost)
}

/// one-directional EMD between two label histograms under a
/// cluster-to-cluster distance matrix
pub fn compute_emd(
    source: &[usize],
    target: &[usize],
    matrix: &[Vec<f64>],
) -> Result<Weight> {
    anyhow::ensure!(!source.is_empty() && !target.is_empty(), "empty histogram");
    let n_clusters = matrix.len();
    let mut sorted = Vec::with_capacity(n_clusters);
    for row in matrix {
        let mut distances = target
            .iter()
            .enumerate()
            .map(|(pos, label)| (row[*label], pos))
            .collect::<Vec<(f64, usize)>>();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("no NaN distances"));
        sorted.push(distances);
    }
    let mass = vec![1.0 / target.len() as Weight; target.len()];
    emd_heuristic(source, &mass, &sorted)
}

/// the heuristic is asymmetric; average both directions
pub fn symmetric_emd(h1: &[usize], h2: &[usize], matrix: &[Vec<f64>]) -> Result<Weight> {
    Ok(0.5 * (compute_emd(h1, h2, matrix)? + compute_emd(h2, h1, matrix)?))
}

use crate::Weight;
use anyhow::Result;

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn identical_histograms_cost_nothing() {
        let h = vec![0, 1, 2, 1];
        assert!(symmetric_emd(&h, &h, &matrix()).unwrap() == 0.0);
    }

    #[test]
    fn hand_computed_transport() {
        // all mass at cluster 0 moving to cluster 2 costs the full distance
        let h1 = vec![0, 0];
        let h2 = vec![2, 2];
        assert!((compute_emd(&h1, &h2, &matrix()).unwrap() - 2.0).abs() < 1e-9);
        // half the mass is already in place
        let h3 = vec![0, 2];
        assert!((compute_emd(&h3, &h2, &matrix()).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn symmetrized_is_symmetric() {
        let h1 = vec![0, 1, 1];
        let h2 = vec![2, 2, 1];
        let d12 = symmetric_emd(&h1, &h2, &matrix()).unwrap();
        let d21 = symmetric_emd(&h2, &h1, &matrix()).unwrap();
        assert!(d12 == d21);
        assert!(d12 > 0.0);
    }

    #[test]
    fn rejects_bad_masses() {
        let sorted = vec![vec![(0.0, 0)]];
        assert!(emd_heuristic(&[0], &[0.5], &sorted).is_err());
    }

    #[test]
    fn rejects_unsorted_distances() {
        let sorted = vec![vec![(1.0, 0), (0.5, 1)]];
        assert!(emd_heuristic(&[0], &[0.5, 0.5], &sorted).is_err());
    }

    #[test]
    fn rejects_out_of_range_labels() {
        let sorted = vec![vec![(0.0, 0)]];
        assert!(emd_heuristic(&[3], &[1.0], &sorted).is_err());
    }
}
