use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, DataMut, Ix1, Ix2, Zip};
use rand::Rng;

use crate::Float;

/// Straight-line distance between two points of the plane.
pub(crate) fn euclidean_distance<F: Float>(a: ArrayView1<F>, b: ArrayView1<F>) -> F {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Given the distances from one point to every centroid, return the index of the closest one.
///
/// Exact ties are broken uniformly at random; `rng` is only drawn from when at least two
/// clusters share the minimum distance.
pub(crate) fn closest_cluster<F: Float>(
    distances: &ArrayBase<impl Data<Elem = F>, Ix1>,
    rng: &mut impl Rng,
) -> usize {
    let minimum_distance = distances.iter().fold(F::infinity(), |acc, &d| acc.min(d));
    let n_ties = distances.iter().filter(|&&d| d == minimum_distance).count();
    let pick = if n_ties > 1 { rng.gen_range(0..n_ties) } else { 0 };

    distances
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == minimum_distance)
        .nth(pick)
        .map(|(index, _)| index)
        .unwrap_or(0)
}

// Update `memberships` with the index of the cluster each point belongs to.
pub(crate) fn update_cluster_memberships<F: Float>(
    // (n_clusters, 2)
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_points, 2)
    points: &ArrayBase<impl Data<Elem = F>, Ix2>,
    memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
    rng: &mut impl Rng,
) {
    let mut distances = Array1::zeros(centroids.nrows());
    Zip::from(points.rows())
        .and(memberships)
        .for_each(|point, membership| {
            Zip::from(&mut distances)
                .and(centroids.rows())
                .for_each(|distance, centroid| *distance = euclidean_distance(point, centroid));
            *membership = closest_cluster(&distances, rng);
        });
}

/// Per-cluster coordinate sums, shape `(n_clusters, 2)`, and member counts.
pub(crate) fn accumulate_clusters<F: Float>(
    n_clusters: usize,
    points: &ArrayBase<impl Data<Elem = F>, Ix2>,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> (Array2<F>, Array1<usize>) {
    let mut sums = Array2::zeros((n_clusters, 2));
    let mut counts = Array1::zeros(n_clusters);

    Zip::from(points.rows())
        .and(memberships)
        .for_each(|point, &membership| {
            let mut sum = sums.row_mut(membership);
            sum += &point;
            counts[membership] += 1;
        });
    (sums, counts)
}

/// Squared distance of each point to the centroid of its cluster.
pub(crate) fn squared_dists_to_members<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    points: &ArrayBase<impl Data<Elem = F>, Ix2>,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Array1<F> {
    let mut dists = Array1::zeros(points.nrows());
    Zip::from(&mut dists)
        .and(points.rows())
        .and(memberships)
        .for_each(|dist, point, &membership| {
            let d = euclidean_distance(point, centroids.row(membership));
            *dist = d * d;
        });
    dists
}

/// Index of the point farthest from its centroid, among the points whose cluster holds more
/// than one member. `None` when every cluster is a singleton or empty.
pub(crate) fn farthest_movable_point<F: Float>(
    squared_dists: &ArrayBase<impl Data<Elem = F>, Ix1>,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    counts: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Option<usize> {
    squared_dists
        .iter()
        .zip(memberships.iter())
        .enumerate()
        .filter(|&(_, (_, &membership))| counts[membership] > 1)
        .fold(None, |farthest: Option<(usize, F)>, (index, (&dist, _))| match farthest {
            Some((_, max)) if max >= dist => farthest,
            _ => Some((index, dist)),
        })
        .map(|(index, _)| index)
}
