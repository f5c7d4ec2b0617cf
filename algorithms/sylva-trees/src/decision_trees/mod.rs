mod algorithm;
mod entry_set;
mod hyperparams;
mod iter;
mod prune;

pub use algorithm::*;
pub use entry_set::*;
pub use hyperparams::*;
pub use iter::*;
pub use prune::*;
