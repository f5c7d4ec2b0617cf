//! Provide traits for different classes of algorithms
//!

use ndarray::{Array1, Array2};

use crate::dataset::Dataset;

/// Fittable algorithms
///
/// A fittable algorithm takes a dataset and creates a concept of some kind about it. For example
/// in *decision tree induction* the concept is a tree of nominal splits which maps records to
/// their most likely label.
///
/// The error type `E` has to be convertible from the base crate error, so that malformed datasets
/// can be reported by any implementor.
pub trait Fit<E: std::error::Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, dataset: &Dataset) -> Result<Self::Object, E>;
}

/// Predict with model
///
/// This trait assumes the `PredictInplace` implementation and provides additional input/output
/// combinations.
///
/// # Provided implementation
///
/// * Array2 -> Array1 with default implementation
/// * Dataset -> Array1
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}

/// Predict with model into a mutable reference of targets.
pub trait PredictInplace<R, T> {
    /// Predict something in place
    fn predict_inplace(&self, x: &R, y: &mut T);

    /// Create targets that `predict_inplace` works with.
    fn default_target(&self, x: &R) -> T;
}

impl<'a, M> Predict<&'a Array2<f64>, Array1<f64>> for M
where
    M: PredictInplace<Array2<f64>, Array1<f64>>,
{
    fn predict(&self, records: &'a Array2<f64>) -> Array1<f64> {
        let mut targets = self.default_target(records);
        self.predict_inplace(records, &mut targets);
        targets
    }
}

impl<'a, M> Predict<&'a Dataset, Array1<f64>> for M
where
    M: PredictInplace<Array2<f64>, Array1<f64>>,
{
    fn predict(&self, dataset: &'a Dataset) -> Array1<f64> {
        let mut targets = self.default_target(dataset.records());
        self.predict_inplace(dataset.records(), &mut targets);
        targets
    }
}
