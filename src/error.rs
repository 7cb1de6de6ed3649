//! Error types in planar-kmeans
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// An error when checking an invalid hyperparameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("n_clusters cannot be 0")]
    NClusters,
    #[error("tolerance must be greater than 0")]
    Tolerance,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
    #[error("init_domain must be a finite value greater than 0")]
    InitDomain,
}

/// An error when building or driving a [`ClusterEngine`](crate::ClusterEngine)
#[derive(Error, Debug)]
pub enum Error {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] ParamsError),
    #[error("at least one point is required")]
    EmptyInput,
    #[error("points must have exactly 2 coordinates, got {0}")]
    Dimensions(usize),
    #[error("point {row} has a non-finite coordinate")]
    NonFinite { row: usize },
    #[error("cannot form {n_clusters} clusters out of {n_points} points")]
    InvalidClusterCount { n_clusters: usize, n_points: usize },
    #[error("invalid centroids: {0}")]
    InvalidCentroids(String),
    #[error("centroids have not been initialized")]
    Uninitialized,
    #[error("points have not been assigned to clusters")]
    Unassigned,
    /// When the iteration cap is reached before the displacement drops below the tolerance
    #[error("did not converge after {n_iterations} iterations (displacement {displacement})")]
    NotConverged {
        n_iterations: u64,
        displacement: f64,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("malformed point records: {0}")]
    Records(String),
}
