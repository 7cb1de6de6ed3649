use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Ix2, Zip};
use rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::helpers::{
    accumulate_clusters, farthest_movable_point, squared_dists_to_members,
    update_cluster_memberships,
};
use super::init::{random_init, EmptyClusterPolicy};
use crate::error::{Error, Result};
use crate::hyperparams::{EngineParams, EngineValidParams};
use crate::Float;

/// Where a [`ClusterEngine`] stands in its lifecycle.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Centroids still hold the `(-1, -1)` sentinel.
    Uninitialized,
    /// Centroids are placed, no point has been assigned yet.
    Ready,
    /// At least one assignment step has run.
    Iterating,
    /// The last measured displacement was lower or equal than the tolerance.
    Converged,
    /// `max_n_iterations` was reached before converging.
    Exhausted,
}

/// Outcome of a converged [`ClusterEngine::run`].
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary<F> {
    /// Number of assign/update rounds performed by this run
    pub n_iterations: u64,
    /// Displacement measured after the last round
    pub displacement: F,
}

/// Lloyd's k-means over a fixed set of points of the plane.
///
/// The engine owns the points, the centroids (current and previous) and the assignment of every
/// point to a cluster. Callers only get read-only views of that state.
///
/// A run goes through the following steps:
/// - initialisation: each centroid is sampled uniformly from `[0, init_domain)²`,
///   redrawing exact duplicates;
/// - assignment: each point goes to the cluster of its nearest centroid (euclidean distance),
///   exact ties being broken uniformly at random;
/// - update: each centroid moves to the mean of its points, empty clusters being handled by
///   the configured [`EmptyClusterPolicy`];
/// - convergence: the displacement between the previous and the current centroids is measured
///   with the configured [`ConvergenceMeasure`](crate::ConvergenceMeasure).
///
/// Assignment and update are repeated until the displacement is lower or equal than the
/// tolerance, or until `max_n_iterations` rounds have been performed.
///
/// The random source is injected through the hyperparameters, so a seeded generator makes a
/// whole run reproducible.
///
/// ```
/// use approx::assert_abs_diff_eq;
/// use ndarray::array;
/// use planar_kmeans::ClusterEngine;
///
/// let points = array![[0., 0.], [0., 1.], [10., 0.], [10., 1.]];
/// let mut engine = ClusterEngine::params(2).build(&points).unwrap();
/// engine.initialize_with(&array![[1., 1.], [4., 1.]]).unwrap();
/// engine.run().unwrap();
///
/// assert_abs_diff_eq!(engine.centroids(), array![[0., 0.5], [10., 0.5]]);
/// assert_eq!(engine.memberships().unwrap(), array![0, 0, 1, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct ClusterEngine<F: Float, R: Rng> {
    params: EngineValidParams<F, R>,
    rng: R,
    // (n_points, 2)
    points: Array2<F>,
    // (n_clusters, 2)
    centroids: Array2<F>,
    previous_centroids: Array2<F>,
    // `None` until the first assignment step
    memberships: Option<Array1<usize>>,
    phase: Phase,
    n_iterations: u64,
}

impl<F: Float> ClusterEngine<F, Isaac64Rng> {
    pub fn params(n_clusters: usize) -> EngineParams<F, Isaac64Rng> {
        EngineParams::new(n_clusters, Isaac64Rng::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(n_clusters: usize, rng: R) -> EngineParams<F, R> {
        EngineParams::new(n_clusters, rng)
    }
}

impl<F: Float, R: Rng + Clone> ClusterEngine<F, R> {
    /// Takes ownership of a copy of `points`, with shape `(n_points, 2)`.
    ///
    /// Fails if there are no points, if the points are not two-dimensional or not finite, or if
    /// more clusters than points are requested.
    pub fn new<D: Data<Elem = F>>(
        params: EngineValidParams<F, R>,
        points: &ArrayBase<D, Ix2>,
    ) -> Result<Self> {
        let (n_points, n_features) = points.dim();
        if n_points == 0 {
            return Err(Error::EmptyInput);
        }
        if n_features != 2 {
            return Err(Error::Dimensions(n_features));
        }
        if let Some(row) = points
            .rows()
            .into_iter()
            .position(|point| point.iter().any(|c| !c.is_finite()))
        {
            return Err(Error::NonFinite { row });
        }
        let n_clusters = params.n_clusters();
        if n_clusters > n_points {
            return Err(Error::InvalidClusterCount {
                n_clusters,
                n_points,
            });
        }

        let sentinel = Array2::from_elem((n_clusters, 2), -F::one());
        Ok(ClusterEngine {
            rng: params.rng().clone(),
            params,
            points: points.to_owned(),
            centroids: sentinel.clone(),
            previous_centroids: sentinel,
            memberships: None,
            phase: Phase::Uninitialized,
            n_iterations: 0,
        })
    }
}

impl<F: Float, R: Rng> ClusterEngine<F, R> {
    /// Place every centroid uniformly at random in the initialization domain.
    ///
    /// The previous centroids are left untouched.
    pub fn initialize_centroids(&mut self) {
        self.centroids = random_init(
            self.params.n_clusters(),
            self.params.init_domain(),
            &mut self.rng,
        );
        self.reset();
    }

    /// Start from the given centroids instead of random ones.
    pub fn initialize_with<D: Data<Elem = F>>(&mut self, centroids: &ArrayBase<D, Ix2>) -> Result<()> {
        let expected = (self.params.n_clusters(), 2);
        if centroids.dim() != expected {
            return Err(Error::InvalidCentroids(format!(
                "expected shape {:?}, got {:?}",
                expected,
                centroids.dim()
            )));
        }
        if centroids.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidCentroids("non-finite coordinate".into()));
        }
        self.centroids.assign(centroids);
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.memberships = None;
        self.n_iterations = 0;
        self.phase = Phase::Ready;
    }

    /// Assign every point to the cluster of its nearest centroid.
    pub fn assign_points_to_cluster(&mut self) -> Result<()> {
        if self.phase == Phase::Uninitialized {
            return Err(Error::Uninitialized);
        }
        let n_points = self.points.nrows();
        let memberships = self
            .memberships
            .get_or_insert_with(|| Array1::zeros(n_points));
        update_cluster_memberships(&self.centroids, &self.points, memberships, &mut self.rng);
        self.phase = Phase::Iterating;
        Ok(())
    }

    /// Move every centroid to the mean of its points.
    ///
    /// The current centroids are first copied into the previous ones. Returns the number of
    /// clusters found empty, which are handled according to the [`EmptyClusterPolicy`].
    pub fn update_centroids(&mut self) -> Result<usize> {
        let memberships = self.memberships.as_mut().ok_or(Error::Unassigned)?;
        let n_clusters = self.params.n_clusters();
        let (mut sums, mut counts) = accumulate_clusters(n_clusters, &self.points, memberships);

        let empty = counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == 0)
            .map(|(cluster, _)| cluster)
            .collect::<Vec<_>>();
        if !empty.is_empty() && self.params.empty_cluster() == EmptyClusterPolicy::Reseed {
            let dists = squared_dists_to_members(&self.centroids, &self.points, memberships);
            for &cluster in &empty {
                // with n_clusters <= n_points some other cluster always has a spare point
                let point = match farthest_movable_point(&dists, memberships, &counts) {
                    Some(point) => point,
                    None => break,
                };
                let from = memberships[point];
                let mut from_sum = sums.row_mut(from);
                from_sum -= &self.points.row(point);
                counts[from] -= 1;
                sums.row_mut(cluster).assign(&self.points.row(point));
                counts[cluster] = 1;
                memberships[point] = cluster;
                trace!(cluster, point, from, "moved farthest point into empty cluster");
            }
        }

        self.previous_centroids.assign(&self.centroids);

        Zip::from(self.centroids.rows_mut())
            .and(sums.rows())
            .and(&counts)
            .for_each(|mut centroid, sum, &count| {
                if count > 0 {
                    centroid.assign(&(&sum / F::cast(count)));
                }
            });
        Ok(empty.len())
    }

    /// Displacement between the previous and the current centroids, according to the configured
    /// [`ConvergenceMeasure`](crate::ConvergenceMeasure).
    ///
    /// Before the first update the previous centroids hold the `(-1, -1)` sentinel.
    pub fn calculate_tolerance(&self) -> Result<F> {
        if self.phase == Phase::Uninitialized {
            return Err(Error::Uninitialized);
        }
        Ok(self
            .params
            .convergence()
            .displacement(&self.previous_centroids, &self.centroids))
    }

    /// Iterate assignment and update until convergence.
    ///
    /// Centroids are initialized at random first if needed. At least one round is always
    /// performed. Reaching `max_n_iterations` rounds in this call returns
    /// [`Error::NotConverged`]; the state reached so far stays available.
    pub fn run(&mut self) -> Result<RunSummary<F>> {
        if self.phase == Phase::Uninitialized {
            self.initialize_centroids();
        }
        let tolerance = self.params.tolerance();

        for n_iter in 1..=self.params.max_n_iterations() {
            self.assign_points_to_cluster()?;
            let n_empty = self.update_centroids()?;
            self.n_iterations += 1;
            let displacement = self.calculate_tolerance()?;
            debug!(
                iteration = self.n_iterations,
                %displacement,
                n_empty,
                "centroids updated"
            );

            if displacement <= tolerance {
                self.phase = Phase::Converged;
                return Ok(RunSummary {
                    n_iterations: n_iter,
                    displacement,
                });
            }
            if n_iter == self.params.max_n_iterations() {
                self.phase = Phase::Exhausted;
                warn!(n_iterations = n_iter, %displacement, "iteration cap reached");
                return Err(Error::NotConverged {
                    n_iterations: n_iter,
                    displacement: displacement.to_f64().unwrap_or(f64::NAN),
                });
            }
        }
        // max_n_iterations is validated to be at least 1
        Err(Error::NotConverged {
            n_iterations: 0,
            displacement: f64::NAN,
        })
    }

    /// The points, with shape `(n_points, 2)`.
    pub fn points(&self) -> ArrayView2<'_, F> {
        self.points.view()
    }

    /// The current centroids, with shape `(n_clusters, 2)`.
    pub fn centroids(&self) -> ArrayView2<'_, F> {
        self.centroids.view()
    }

    /// The centroids as they were before the last update.
    pub fn previous_centroids(&self) -> ArrayView2<'_, F> {
        self.previous_centroids.view()
    }

    /// For each point, the index of its cluster. `None` until the first assignment step.
    pub fn memberships(&self) -> Option<ArrayView1<'_, usize>> {
        self.memberships.as_ref().map(|m| m.view())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of rounds performed since the centroids were initialized.
    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }

    pub fn n_clusters(&self) -> usize {
        self.params.n_clusters()
    }

    pub fn tolerance(&self) -> F {
        self.params.tolerance()
    }

    pub fn valid_params(&self) -> &EngineValidParams<F, R> {
        &self.params
    }

    /// Number of points assigned to each cluster.
    pub fn cluster_sizes(&self) -> Result<Array1<usize>> {
        let memberships = self.memberships.as_ref().ok_or(Error::Unassigned)?;
        let mut sizes = Array1::zeros(self.n_clusters());
        memberships.iter().for_each(|&c| sizes[c] += 1);
        Ok(sizes)
    }

    /// Squared distance between each point and the centroid of its cluster, averaged over all
    /// points.
    pub fn inertia(&self) -> Result<F> {
        let memberships = self.memberships.as_ref().ok_or(Error::Unassigned)?;
        let dists = squared_dists_to_members(&self.centroids, &self.points, memberships);
        Ok(dists.sum() / F::cast(self.points.nrows()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvergenceMeasure, EngineParams};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use rand_xoshiro::Xoshiro256Plus;

    fn two_pairs() -> Array2<f64> {
        array![[0., 0.], [0., 1.], [10., 0.], [10., 1.]]
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<ClusterEngine<f64, Isaac64Rng>>();
        has_autotraits::<ClusterEngine<f32, Xoshiro256Plus>>();
    }

    #[test]
    fn construction_fills_sentinels() {
        let engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        assert_eq!(engine.phase(), Phase::Uninitialized);
        assert_eq!(engine.centroids(), Array2::from_elem((2, 2), -1.));
        assert_eq!(engine.previous_centroids(), Array2::from_elem((2, 2), -1.));
        assert!(engine.memberships().is_none());
        assert_eq!(engine.points(), two_pairs());
        assert_eq!(engine.valid_params().n_clusters(), 2);
        assert_eq!(engine.valid_params().max_n_iterations(), 300);
    }

    #[test]
    fn construction_rejects_invalid_input() {
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            ClusterEngine::params(1).build(&empty),
            Err(Error::EmptyInput)
        ));

        let three_d = Array2::<f64>::zeros((4, 3));
        assert!(matches!(
            ClusterEngine::params(1).build(&three_d),
            Err(Error::Dimensions(3))
        ));

        let nan = array![[0., 0.], [f64::NAN, 1.]];
        assert!(matches!(
            ClusterEngine::params(1).build(&nan),
            Err(Error::NonFinite { row: 1 })
        ));

        assert!(matches!(
            ClusterEngine::params(5).build(&two_pairs()),
            Err(Error::InvalidClusterCount {
                n_clusters: 5,
                n_points: 4
            })
        ));

        assert!(matches!(
            ClusterEngine::params(0).build(&two_pairs()),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn steps_require_initialization_and_assignment() {
        let mut engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        assert!(matches!(
            engine.assign_points_to_cluster(),
            Err(Error::Uninitialized)
        ));
        assert!(matches!(engine.calculate_tolerance(), Err(Error::Uninitialized)));
        assert!(matches!(engine.update_centroids(), Err(Error::Unassigned)));
        assert!(matches!(engine.inertia(), Err(Error::Unassigned)));

        engine.initialize_centroids();
        assert_eq!(engine.phase(), Phase::Ready);
        assert!(matches!(engine.update_centroids(), Err(Error::Unassigned)));
    }

    #[test]
    fn initialization_leaves_previous_centroids_alone() {
        let mut engine = ClusterEngine::params(3)
            .build(&array![[0., 0.], [1., 1.], [2., 2.]])
            .unwrap();
        engine.initialize_centroids();

        assert_eq!(engine.previous_centroids(), Array2::from_elem((3, 2), -1.));
        assert!(engine.centroids().iter().all(|&c| (0. ..6.).contains(&c)));
        // fresh centroids against the sentinel always exceed the tolerance
        assert!(engine.calculate_tolerance().unwrap() > engine.tolerance());
    }

    #[test]
    fn initialize_with_checks_shape() {
        let mut engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        assert!(matches!(
            engine.initialize_with(&array![[1., 1.]]),
            Err(Error::InvalidCentroids(_))
        ));
        assert!(matches!(
            engine.initialize_with(&array![[1., 1.], [f64::INFINITY, 0.]]),
            Err(Error::InvalidCentroids(_))
        ));
        assert_eq!(engine.phase(), Phase::Uninitialized);
    }

    #[test]
    fn update_snapshots_then_averages() {
        let mut engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        engine.initialize_with(&array![[1., 1.], [4., 1.]]).unwrap();
        engine.assign_points_to_cluster().unwrap();
        assert_eq!(engine.memberships().unwrap(), array![0, 0, 1, 1]);

        let n_empty = engine.update_centroids().unwrap();
        assert_eq!(n_empty, 0);
        assert_eq!(engine.previous_centroids(), array![[1., 1.], [4., 1.]]);
        assert_abs_diff_eq!(engine.centroids(), array![[0., 0.5], [10., 0.5]]);
        assert_abs_diff_eq!(
            engine.calculate_tolerance().unwrap(),
            1. + 0.5 + 6. / 4. + 0.5
        );
    }

    #[test]
    fn empty_cluster_is_retained() {
        let mut engine = ClusterEngine::params(2)
            .empty_cluster(EmptyClusterPolicy::RetainPrevious)
            .build(&two_pairs())
            .unwrap();
        engine.initialize_with(&array![[5., 0.5], [50., 50.]]).unwrap();
        engine.assign_points_to_cluster().unwrap();
        assert_eq!(engine.memberships().unwrap(), array![0, 0, 0, 0]);

        assert_eq!(engine.update_centroids().unwrap(), 1);
        assert_abs_diff_eq!(engine.centroids(), array![[5., 0.5], [50., 50.]]);
        assert_eq!(engine.cluster_sizes().unwrap(), array![4, 0]);
    }

    #[test]
    fn empty_cluster_takes_the_farthest_point() {
        let mut engine = ClusterEngine::params(2)
            .empty_cluster(EmptyClusterPolicy::Reseed)
            .build(&two_pairs())
            .unwrap();
        engine.initialize_with(&array![[9., 0.], [50., 50.]]).unwrap();
        engine.assign_points_to_cluster().unwrap();
        assert_eq!(engine.memberships().unwrap(), array![0, 0, 0, 0]);

        assert_eq!(engine.update_centroids().unwrap(), 1);
        assert_eq!(engine.memberships().unwrap(), array![0, 1, 0, 0]);
        assert_eq!(engine.cluster_sizes().unwrap(), array![3, 1]);
        assert_abs_diff_eq!(
            engine.centroids(),
            array![[20. / 3., 1. / 3.], [0., 1.]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn reseeding_never_empties_another_cluster() {
        let points = array![[0., 0.], [1., 0.], [30., 0.]];
        let mut engine = ClusterEngine::params(3).build(&points).unwrap();
        engine
            .initialize_with(&array![[0., 0.], [10., 0.], [50., 50.]])
            .unwrap();
        engine.assign_points_to_cluster().unwrap();
        assert_eq!(engine.memberships().unwrap(), array![0, 0, 1]);

        // the point at 30 is the farthest, but it is alone in its cluster
        assert_eq!(engine.update_centroids().unwrap(), 1);
        assert_eq!(engine.memberships().unwrap(), array![0, 2, 1]);
        assert_eq!(engine.centroids(), array![[0., 0.], [30., 0.], [1., 0.]]);
    }

    #[test]
    fn memberships_stay_in_range() {
        let mut rng = Isaac64Rng::seed_from_u64(11);
        let points: Array2<f64> = random_init(200, 10., &mut rng);
        let mut engine = ClusterEngine::params_with_rng(7, rng).build(&points).unwrap();
        engine.initialize_centroids();
        for _ in 0..10 {
            engine.assign_points_to_cluster().unwrap();
            assert!(engine.memberships().unwrap().iter().all(|&m| m < 7));
            engine.update_centroids().unwrap();
            assert_eq!(engine.centroids().nrows(), 7);
            assert_eq!(engine.previous_centroids().nrows(), 7);
        }
    }

    #[test]
    fn run_counts_iterations_and_converges() {
        let mut engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        engine.initialize_with(&array![[1., 1.], [4., 1.]]).unwrap();
        let summary = engine.run().unwrap();

        // second round no longer moves anything
        assert_eq!(summary.n_iterations, 2);
        assert_abs_diff_eq!(summary.displacement, 0.);
        assert_eq!(engine.phase(), Phase::Converged);
        assert_eq!(engine.n_iterations(), 2);
    }

    #[test]
    fn run_reports_the_iteration_cap() {
        let params = EngineParams::new(2, Isaac64Rng::seed_from_u64(42))
            .max_n_iterations(1)
            .tolerance(1e-12);
        let mut engine = params.build(&two_pairs()).unwrap();
        engine.initialize_with(&array![[1., 1.], [4., 1.]]).unwrap();

        let err = engine.run().unwrap_err();
        assert!(matches!(err, Error::NotConverged { n_iterations: 1, .. }));
        assert_eq!(engine.phase(), Phase::Exhausted);
        // the state reached so far is still there
        assert_abs_diff_eq!(engine.centroids(), array![[0., 0.5], [10., 0.5]]);
    }

    #[test]
    fn inertia_of_converged_pairs() {
        let mut engine = ClusterEngine::params(2).build(&two_pairs()).unwrap();
        engine.initialize_with(&array![[1., 1.], [4., 1.]]).unwrap();
        engine.run().unwrap();
        assert_abs_diff_eq!(engine.inertia().unwrap(), 0.25);
        assert_eq!(engine.cluster_sizes().unwrap(), array![2, 2]);
    }

    #[test]
    fn mixed_measure_sees_centroids_on_an_axis() {
        let mut engine = ClusterEngine::params(2)
            .convergence(ConvergenceMeasure::Mixed)
            .build(&two_pairs())
            .unwrap();
        engine.initialize_with(&array![[0., 0.5], [10., 0.]]).unwrap();
        engine.assign_points_to_cluster().unwrap();
        engine.update_centroids().unwrap();

        // the second centroid moved by 0.5 along y, starting from y = 0
        assert_abs_diff_eq!(engine.calculate_tolerance().unwrap(), 0.5);
        assert_abs_diff_eq!(
            ConvergenceMeasure::Relative
                .displacement(&engine.previous_centroids(), &engine.centroids()),
            0.
        );
    }
}
