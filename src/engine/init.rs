use std::str::FromStr;

use ndarray::{Array2, ArrayBase, Data, DataMut, Ix2};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::trace;

use crate::Float;

/// What to do with the centroid of a cluster that received no points during an assignment step.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyClusterPolicy {
    /// Move the point farthest from its centroid into the empty cluster. The point is only taken
    /// from a cluster that keeps at least one other member.
    Reseed,
    /// Keep the centroid where it was before the update.
    RetainPrevious,
}

impl Default for EmptyClusterPolicy {
    fn default() -> Self {
        Self::Reseed
    }
}

impl FromStr for EmptyClusterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reseed" => Ok(Self::Reseed),
            "retain" => Ok(Self::RetainPrevious),
            other => Err(format!("unknown empty cluster policy `{}`", other)),
        }
    }
}

/// Sample `n_clusters` centroids uniformly from `[0, init_domain)²`.
///
/// A candidate equal to an already placed centroid on both coordinates is discarded and drawn
/// again.
pub(crate) fn random_init<F: Float>(
    n_clusters: usize,
    init_domain: F,
    rng: &mut impl Rng,
) -> Array2<F> {
    let mut centroids = Array2::zeros((n_clusters, 2));
    for cluster in 0..n_clusters {
        draw_centroid(&mut centroids, cluster, init_domain, rng);
    }
    centroids
}

// Draw the centroid in row `cluster`, distinct from the rows placed before it.
fn draw_centroid<F: Float>(
    centroids: &mut ArrayBase<impl DataMut<Elem = F>, Ix2>,
    cluster: usize,
    init_domain: F,
    rng: &mut impl Rng,
) {
    let domain = Uniform::new(F::zero(), init_domain);
    loop {
        let candidate = [domain.sample(rng), domain.sample(rng)];
        if !is_duplicate(centroids, cluster, &candidate) {
            centroids[[cluster, 0]] = candidate[0];
            centroids[[cluster, 1]] = candidate[1];
            return;
        }
        trace!(cluster, "rejected duplicate centroid");
    }
}

fn is_duplicate<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    n_placed: usize,
    candidate: &[F; 2],
) -> bool {
    centroids
        .rows()
        .into_iter()
        .take(n_placed)
        .any(|centroid| centroid[0] == candidate[0] && centroid[1] == candidate[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use rand_isaac::Isaac64Rng;

    #[test]
    fn random_init_stays_in_domain() {
        let mut rng = Isaac64Rng::seed_from_u64(42);
        let centroids = random_init(50, 6., &mut rng);
        assert_eq!(centroids.dim(), (50, 2));
        assert!(centroids.iter().all(|&c| (0. ..6.).contains(&c)));
    }

    #[test]
    fn random_init_is_reproducible() {
        let a: Array2<f64> = random_init(4, 6., &mut Isaac64Rng::seed_from_u64(3));
        let b: Array2<f64> = random_init(4, 6., &mut Isaac64Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn duplicates_are_detected_among_placed_rows_only() {
        let centroids = array![[1., 2.], [3., 4.], [5., 6.]];
        assert!(is_duplicate(&centroids, 2, &[1., 2.]));
        // row 2 is not placed yet
        assert!(!is_duplicate(&centroids, 2, &[5., 6.]));
        assert!(!is_duplicate(&centroids, 3, &[1., 4.]));
    }

    #[test]
    fn drawing_only_touches_its_row() {
        let mut rng = Isaac64Rng::seed_from_u64(42);
        let mut centroids = array![[10., 10.], [20., 20.], [30., 30.]];
        draw_centroid(&mut centroids, 1, 6., &mut rng);
        assert_eq!(centroids.row(0), array![10., 10.]);
        assert_eq!(centroids.row(2), array![30., 30.]);
        assert!(centroids.row(1).iter().all(|&c| (0. ..6.).contains(&c)));
    }

    #[test]
    fn parse_policy() {
        assert_eq!(
            "reseed".parse::<EmptyClusterPolicy>(),
            Ok(EmptyClusterPolicy::Reseed)
        );
        assert_eq!(
            "retain".parse::<EmptyClusterPolicy>(),
            Ok(EmptyClusterPolicy::RetainPrevious)
        );
        assert!("zero".parse::<EmptyClusterPolicy>().is_err());
    }
}
