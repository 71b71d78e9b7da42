//! Discrete-distribution divergence primitives.

use ndarray::{Array, ArrayView, Axis, Dimension, RemoveAxis, Zip};

use crate::config::DivergenceMeasure;

/// Kullback-Leibler divergence D(P || Q) for discrete distributions.
///
/// The distributions live over the last axis; the result has that axis
/// reduced away. Terms where `p == 0` contribute 0 regardless of `q`.
/// If any resulting element is non-finite (e.g. `q == 0` where `p > 0`),
/// the entire result is replaced with zeros so degenerate divergences
/// never propagate into rewards.
pub fn kl_divergence<D>(
    p: &ArrayView<'_, f32, D>,
    q: &ArrayView<'_, f32, D>,
) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let axis = Axis(p.ndim() - 1);
    let kl = Zip::from(p.lanes(axis))
        .and(q.lanes(axis))
        .map_collect(|pl, ql| {
            pl.iter()
                .zip(ql.iter())
                .map(|(&pi, &qi)| if pi != 0.0 { pi * (pi / qi).ln() } else { 0.0 })
                .sum::<f32>()
        });

    if kl.iter().all(|v| v.is_finite()) {
        kl
    } else {
        Array::zeros(kl.raw_dim())
    }
}

/// Jensen-Shannon divergence: symmetrized KL against the midpoint
/// distribution `m = 0.5 * (p + q)`.
pub fn jsd<D>(p: &ArrayView<'_, f32, D>, q: &ArrayView<'_, f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let m: Array<f32, D> = Zip::from(p).and(q).map_collect(|&a, &b| 0.5 * (a + b));
    let left = kl_divergence(p, &m.view());
    let right = kl_divergence(q, &m.view());
    (left + right).mapv(|v| 0.5 * v)
}

impl DivergenceMeasure {
    /// Compute the configured divergence between two distribution tensors.
    pub fn compute<D>(
        &self,
        p: &ArrayView<'_, f32, D>,
        q: &ArrayView<'_, f32, D>,
    ) -> Array<f32, D::Smaller>
    where
        D: Dimension + RemoveAxis,
    {
        match self {
            DivergenceMeasure::Kl => kl_divergence(p, q),
            DivergenceMeasure::Jsd => jsd(p, q),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::Rng;

    fn random_dist(len: usize) -> Vec<f32> {
        let mut rng = rand::thread_rng();
        let raw: Vec<f32> = (0..len).map(|_| rng.gen_range(0.01..1.0)).collect();
        let sum: f32 = raw.iter().sum();
        raw.into_iter().map(|v| v / sum).collect()
    }

    #[test]
    fn test_self_divergence_is_zero() {
        for _ in 0..10 {
            let p = Array2::from_shape_vec((1, 5), random_dist(5)).unwrap();
            let kl = kl_divergence(&p.view(), &p.view());
            for &v in kl.iter() {
                assert!(v.abs() < 1e-6, "kl(p, p) = {}", v);
            }
        }
    }

    #[test]
    fn test_zero_p_entries_contribute_nothing() {
        // q has a zero where p is also zero, which is fine
        let p = array!([0.0f32, 0.5, 0.5]);
        let q = array!([0.0f32, 0.5, 0.5]);
        let kl = kl_divergence(&p.view(), &q.view());
        assert_eq!(kl[0], 0.0);
    }

    #[test]
    fn test_zero_q_under_nonzero_p_suppressed_to_zero() {
        // p > 0 where q == 0 diverges; the whole result falls back to zeros
        let p = array!([0.5f32, 0.5, 0.0]);
        let q = array!([0.0f32, 0.5, 0.5]);
        let kl = kl_divergence(&p.view(), &q.view());
        assert_eq!(kl[0], 0.0);
        assert!(kl.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_kl_positive_for_distinct_dists() {
        let p = array!([0.9f32, 0.1]);
        let q = array!([0.1f32, 0.9]);
        let kl = kl_divergence(&p.view(), &q.view());
        assert!(kl[0] > 0.0);
    }

    #[test]
    fn test_jsd_symmetry_and_nonnegativity() {
        for _ in 0..10 {
            let p = Array2::from_shape_vec((1, 4), random_dist(4)).unwrap();
            let q = Array2::from_shape_vec((1, 4), random_dist(4)).unwrap();
            let forward = jsd(&p.view(), &q.view());
            let backward = jsd(&q.view(), &p.view());
            assert!((forward[0] - backward[0]).abs() < 1e-6);
            assert!(forward[0] >= 0.0);
        }
    }

    #[test]
    fn test_jsd_handles_disjoint_support() {
        // Disjoint supports are fine for JSD since the midpoint covers both
        let p = array!([1.0f32, 0.0]);
        let q = array!([0.0f32, 1.0]);
        let out = jsd(&p.view(), &q.view());
        assert!((out[0] - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_measure_dispatch() {
        let p = array!([0.7f32, 0.3]);
        let q = array!([0.3f32, 0.7]);
        let kl = DivergenceMeasure::Kl.compute(&p.view(), &q.view());
        let js = DivergenceMeasure::Jsd.compute(&p.view(), &q.view());
        assert!(kl[0] > js[0]);
    }
}
