//! Utility functions for randomly generating point sets

use ndarray::{Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, StandardNormal},
};

/// Special case of `blobs_with_distribution` with a standard normal distribution.
pub fn blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    blobs_with_distribution(blob_size, blob_centroids, StandardNormal, rng)
}

/// Generate `blob_size` points around each row of `blob_centroids`, a `(n_blobs, 2)` matrix.
///
/// The offsets of a point from its blob centroid are sampled from `distribution`, first on the x
/// axis and then on the y axis. Rows `b * blob_size..(b + 1) * blob_size` of the output belong to
/// blob `b`.
///
/// # Panics
///
/// If `blob_centroids` does not have two columns.
pub fn blobs_with_distribution(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    assert_eq!(blob_centroids.ncols(), 2, "blob centroids must be points of the plane");
    let n_points = blob_centroids.nrows() * blob_size;

    Array2::from_shape_fn((n_points, 2), |(row, axis)| {
        blob_centroids[[row / blob_size, axis]] + distribution.sample(rng)
    })
}
