/// the eight opponent cluster hand strength (OCHS) categories.
///
/// offline feature extraction computes, for every canonical hand,
/// its equity against each of these preflop ranges; the resulting
/// 8-vectors feed k-means under the EMD metric. listed weakest to
/// strongest in standard range notation.
pub const OCHS_CATEGORIES: [&str; 8] = [
    "32,42,52,62,72,43,53,63,73,54,64,82o,83o,74o,65o",
    "82s,92,T2,J2o,83s,93,T3o,J3o,74s,84,94,T4o,75o,85o,95o,T5o",
    "T3s,T4s,65s,75s,85s,95s,T5s,76,86,96,T6,87,97,T7o,98,T8o",
    "22,J2s,Q2,K2,J3s,Q3,K3o,J4,Q4,K4o,J5,Q5,J6,Q6o,J7o,Q7o",
    "Q6s,T7s,J7s,Q7s,T8s,J8,Q8,T9,J9,Q9,JT,QTo,QJo",
    "33,44,55,A2,K3s,A3,K4s,A4,K5,A5,K6,A6,K7,A7o,K8,A8o,K9o",
    "66,77,A7s,A8s,K9s,A9,QTs,KT,AT,QJs,KJ,AJ,KQ,AQ,AK",
    "88,99,TT,JJ,QQ,KK,AA",
];

pub const N_OCHS_FEATURES: usize = 8;

/// euclidean distances between cluster centroids in OCHS feature
/// space. row-symmetric by construction.
pub fn centroid_distances(centroids: &[f32], n_clusters: usize) -> Vec<Vec<f64>> {
    assert!(
        centroids.len() == n_clusters * N_OCHS_FEATURES,
        "expected {} centroid features, got {}",
        n_clusters * N_OCHS_FEATURES,
        centroids.len()
    );
    let mut matrix = vec![vec![0.0; n_clusters]; n_clusters];
    for c1 in 0..n_clusters {
        for c2 in (c1 + 1)..n_clusters {
            let dist = (0..N_OCHS_FEATURES)
                .map(|i| {
                    let d = centroids[c1 * N_OCHS_FEATURES + i] as f64
                        - centroids[c2 * N_OCHS_FEATURES + i] as f64;
                    d * d
                })
                .sum::<f64>()
                .sqrt();
            matrix[c1][c2] = dist;
            matrix[c2][c1] = dist;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_symmetric_and_hollow() {
        let centroids: Vec<f32> = (0..3 * N_OCHS_FEATURES).map(|i| i as f32 * 0.1).collect();
        let matrix = centroid_distances(&centroids, 3);
        for i in 0..3 {
            assert!(matrix[i][i] == 0.0);
            for j in 0..3 {
                assert!(matrix[i][j] == matrix[j][i]);
            }
        }
    }
}
