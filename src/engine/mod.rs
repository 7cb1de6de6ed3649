mod algorithm;
mod convergence;
mod helpers;
mod init;

pub use algorithm::*;
pub use convergence::*;
pub use init::EmptyClusterPolicy;
