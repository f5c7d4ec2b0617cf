//! `sylva` provides the shared ground for learners on nominal, tabular data.
//!
//! The crate holds everything an algorithm crate needs besides the algorithm itself:
//!
//! * a [`Dataset`] of records and aligned class targets, with the column queries nominal learners
//!   rely on (maxima, arities, majority values) and the missing-value sentinel [`MISSING`],
//! * helpers to shuffle, split and fold a dataset for validation,
//! * the [`Fit`](traits::Fit) and [`Predict`](traits::Predict) traits together with the
//!   [`ParamGuard`] pattern for checked hyperparameters,
//! * classification metrics built around a confusion matrix.
//!
//! Algorithms live in their own crates under `algorithms/`, for example `sylva-trees` for
//! decision tree induction with imputation and reduced-error pruning.
//!

pub mod benchmarks;
pub mod dataset;
pub mod error;
mod metrics_classification;
mod param_guard;
pub mod prelude;
pub mod traits;

pub use dataset::{is_missing, ColumnKind, Dataset, MAX_CODE, MISSING};
pub use error::Error;
pub use param_guard::ParamGuard;

/// Common metrics functions for classification
pub mod metrics {
    pub use crate::metrics_classification::{ConfusionMatrix, ToConfusionMatrix};
}
