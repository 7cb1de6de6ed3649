//! `planar-kmeans` partitions a fixed set of points of the plane into a fixed number of
//! clusters with Lloyd's algorithm (k-means).
//!
//! ## The Big Picture
//!
//! Everything revolves around the [`ClusterEngine`]: it owns the points, the centroids and the
//! assignment of each point to a cluster, and exposes every step of the algorithm on its own
//! (initialisation, assignment, update, convergence measure) as well as a driving loop,
//! [`ClusterEngine::run`].
//!
//! Hyperparameters are set with the builder returned by [`ClusterEngine::params`] (or
//! [`ClusterEngine::params_with_rng`] to inject a random source) and checked before any work
//! is done:
//!
//! ```
//! use ndarray::array;
//! use planar_kmeans::{ClusterEngine, EmptyClusterPolicy};
//!
//! let points = array![[0., 0.], [0., 1.], [5., 5.], [5., 6.]];
//! let engine = ClusterEngine::params(2)
//!     .tolerance(1e-4)
//!     .empty_cluster(EmptyClusterPolicy::Reseed)
//!     .fit(&points)
//!     .unwrap();
//!
//! assert_eq!(engine.centroids().nrows(), 2);
//! assert!(engine.memberships().unwrap().iter().all(|&m| m < 2));
//! ```
//!
//! ## Around the engine
//!
//! * [`io`] reads `index,x,y` point files and writes `pointIndex, clusterIndex` assignment files;
//! * [`generate`] builds synthetic point sets made of gaussian blobs.
//!

pub mod engine;
pub mod error;
mod float;
pub mod generate;
mod hyperparams;
pub mod io;
mod param_guard;

pub use engine::{ClusterEngine, ConvergenceMeasure, EmptyClusterPolicy, Phase, RunSummary};
pub use error::{Error, ParamsError, Result};
pub use float::Float;
pub use hyperparams::{EngineParams, EngineValidParams};
pub use param_guard::ParamGuard;
