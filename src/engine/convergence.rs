use std::str::FromStr;

use ndarray::{ArrayBase, Data, Ix2, Zip};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::Float;

/// How the displacement of the centroids between two consecutive iterations is measured.
///
/// The run stops once the measured displacement is lower or equal than the tolerance.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergenceMeasure {
    /// Sum over all clusters of `|Δx| / |x_prev| + |Δy| / |y_prev|`.
    ///
    /// A cluster whose previous centroid has a zero coordinate contributes nothing, so
    /// movement of centroids sitting exactly on an axis goes unnoticed for that iteration.
    Relative,
    /// Sum over all clusters of `|Δx| / max(|x_prev|, 1) + |Δy| / max(|y_prev|, 1)`.
    ///
    /// Behaves like `Relative` far from the origin and like an absolute displacement close to
    /// it; no cluster is ever skipped.
    Mixed,
}

impl Default for ConvergenceMeasure {
    fn default() -> Self {
        Self::Relative
    }
}

impl FromStr for ConvergenceMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relative" => Ok(Self::Relative),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!("unknown convergence measure `{}`", other)),
        }
    }
}

impl ConvergenceMeasure {
    /// Total displacement between `previous` and `current`, both with shape `(n_clusters, 2)`.
    pub fn displacement<F: Float>(
        &self,
        previous: &ArrayBase<impl Data<Elem = F>, Ix2>,
        current: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> F {
        let mut total = F::zero();
        Zip::from(previous.rows())
            .and(current.rows())
            .for_each(|prev, cur| {
                let (dx, dy) = ((cur[0] - prev[0]).abs(), (cur[1] - prev[1]).abs());
                match self {
                    Self::Relative => {
                        if prev[0] != F::zero() && prev[1] != F::zero() {
                            total += dx / prev[0].abs() + dy / prev[1].abs();
                        }
                    }
                    Self::Mixed => {
                        total += dx / prev[0].abs().max(F::one()) + dy / prev[1].abs().max(F::one());
                    }
                }
            });
        total
    }
}
