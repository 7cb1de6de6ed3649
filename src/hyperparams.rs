use ndarray::{ArrayBase, Data, Ix2};
use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::engine::{ClusterEngine, ConvergenceMeasure, EmptyClusterPolicy};
use crate::error::{ParamsError, Result};
use crate::param_guard::ParamGuard;
use crate::Float;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters that can be specified for a [clustering run](crate::ClusterEngine).
pub struct EngineValidParams<F: Float, R: Rng> {
    /// The number of clusters we will be looking for in the point set.
    n_clusters: usize,
    /// The run is considered converged once the total centroid displacement
    /// between two consecutive iterations is lower or equal than `tolerance`.
    tolerance: F,
    /// We exit the loop when the number of iterations reaches `max_n_iterations`
    /// even if the `tolerance` convergence condition has not been met.
    max_n_iterations: u64,
    /// Centroids are sampled uniformly from `[0, init_domain)` on both axes.
    init_domain: F,
    /// What happens to a centroid whose cluster ends an assignment step empty.
    empty_cluster: EmptyClusterPolicy,
    /// How centroid displacement between iterations is measured.
    convergence: ConvergenceMeasure,
    /// The random number generator
    rng: R,
}

#[derive(Clone, Debug, PartialEq)]
/// An helper struct used to construct a set of [valid hyperparameters](EngineValidParams) for
/// the [clustering engine](crate::ClusterEngine) (using the builder pattern).
pub struct EngineParams<F: Float, R: Rng>(EngineValidParams<F, R>);

impl<F: Float, R: Rng> EngineParams<F, R> {
    /// `new` lets us configure the clustering run:
    /// * we will be looking for `n_clusters` in the point set;
    /// * `rng` drives both the centroid initialization and tie-breaking.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `tolerance = 1e-3`
    /// * `max_n_iterations = 300`
    /// * `init_domain = 6`
    /// * `empty_cluster = EmptyClusterPolicy::Reseed`
    /// * `convergence = ConvergenceMeasure::Relative`
    pub fn new(n_clusters: usize, rng: R) -> Self {
        Self(EngineValidParams {
            n_clusters,
            tolerance: F::cast(1e-3),
            max_n_iterations: 300,
            init_domain: F::cast(6.),
            empty_cluster: EmptyClusterPolicy::default(),
            convergence: ConvergenceMeasure::default(),
            rng,
        })
    }

    /// Change the value of `tolerance`
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Change the value of `max_n_iterations`
    pub fn max_n_iterations(mut self, max_n_iterations: u64) -> Self {
        self.0.max_n_iterations = max_n_iterations;
        self
    }

    /// Change the width of the initialization domain
    pub fn init_domain(mut self, init_domain: F) -> Self {
        self.0.init_domain = init_domain;
        self
    }

    /// Change the policy applied to empty clusters
    pub fn empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.0.empty_cluster = policy;
        self
    }

    /// Change the displacement measure used as convergence criterion
    pub fn convergence(mut self, measure: ConvergenceMeasure) -> Self {
        self.0.convergence = measure;
        self
    }
}

impl<F: Float, R: Rng + Clone> EngineParams<F, R> {
    /// Checks the hyperparameters and builds an uninitialized engine over `points`.
    pub fn build<D: Data<Elem = F>>(
        self,
        points: &ArrayBase<D, Ix2>,
    ) -> Result<ClusterEngine<F, R>> {
        let params = self.check()?;
        ClusterEngine::new(params, points)
    }

    /// Builds an engine over `points` and runs it until convergence.
    pub fn fit<D: Data<Elem = F>>(self, points: &ArrayBase<D, Ix2>) -> Result<ClusterEngine<F, R>> {
        let mut engine = self.build(points)?;
        engine.run()?;
        Ok(engine)
    }
}

impl<F: Float, R: Rng> ParamGuard for EngineParams<F, R> {
    type Checked = EngineValidParams<F, R>;
    type Error = ParamsError;

    fn check_ref(&self) -> std::result::Result<&Self::Checked, Self::Error> {
        if self.0.n_clusters == 0 {
            Err(ParamsError::NClusters)
        } else if !(self.0.tolerance > F::zero()) {
            Err(ParamsError::Tolerance)
        } else if self.0.max_n_iterations == 0 {
            Err(ParamsError::MaxIterations)
        } else if !(self.0.init_domain > F::zero()) || !self.0.init_domain.is_finite() {
            Err(ParamsError::InitDomain)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> std::result::Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> EngineValidParams<F, R> {
    /// The number of clusters we will be looking for in the point set.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// The run is considered converged once the total centroid displacement
    /// between two consecutive iterations is lower or equal than `tolerance`.
    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    pub fn init_domain(&self) -> F {
        self.init_domain
    }

    pub fn empty_cluster(&self) -> EmptyClusterPolicy {
        self.empty_cluster
    }

    pub fn convergence(&self) -> ConvergenceMeasure {
        self.convergence
    }

    /// Returns the random generator
    pub fn rng(&self) -> &R {
        &self.rng
    }
}
