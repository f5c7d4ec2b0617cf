//! Common metrics for performance evaluation of classifier
//!
//! Scoring is essential for classification tasks. This module implements the confusion matrix
//! together with accuracy, precision and recall derived from it.
use std::fmt;

use ndarray::prelude::*;

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Confusion matrix for multi-label evaluation
///
/// A confusion matrix shows predictions in a matrix, where rows correspond to target and columns
/// to predicted. The diagonal entries are correct predictions.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
    matrix: Array2<usize>,
    members: Array1<f64>,
}

impl ConfusionMatrix {
    /// Calculate precision for every class
    pub fn precision(&self) -> Array1<f32> {
        let sum = self.matrix.sum_axis(Axis(0));

        self.matrix
            .diag()
            .iter()
            .zip(sum.iter())
            .map(|(a, b)| *a as f32 / *b as f32)
            .collect()
    }

    /// Calculate recall for every class
    pub fn recall(&self) -> Array1<f32> {
        let sum = self.matrix.sum_axis(Axis(1));

        self.matrix
            .diag()
            .iter()
            .zip(sum.iter())
            .map(|(a, b)| *a as f32 / *b as f32)
            .collect()
    }

    /// Return mean accuracy
    pub fn accuracy(&self) -> f32 {
        self.matrix.diag().sum() as f32 / self.matrix.sum() as f32
    }

    /// Class codes in the order of the matrix rows/columns
    pub fn members(&self) -> &Array1<f64> {
        &self.members
    }

    /// Number of samples with ground truth `target` predicted as `predicted`
    pub fn count(&self, target: f64, predicted: f64) -> usize {
        match (self.index_of(target), self.index_of(predicted)) {
            (Some(i), Some(j)) => self.matrix[(i, j)],
            _ => 0,
        }
    }

    fn index_of(&self, class: f64) -> Option<usize> {
        self.members.iter().position(|x| *x == class)
    }
}

/// Print a confusion matrix
impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "classes    | {}",
            self.members
                .iter()
                .map(|x| format!("{:>6}", x))
                .collect::<Vec<_>>()
                .join(" ")
        )?;
        for (member, row) in self.members.iter().zip(self.matrix.outer_iter()) {
            writeln!(
                f,
                "{:<10} | {}",
                member,
                row.iter()
                    .map(|x| format!("{:>6}", x))
                    .collect::<Vec<_>>()
                    .join(" ")
            )?;
        }

        Ok(())
    }
}

/// Classification for multi-label evaluation
///
/// Contains a routine to calculate the confusion matrix, all other scores are derived from it.
pub trait ToConfusionMatrix<T> {
    fn confusion_matrix(&self, ground_truth: T) -> Result<ConfusionMatrix>;
}

impl ToConfusionMatrix<&Array1<f64>> for Array1<f64> {
    fn confusion_matrix(&self, ground_truth: &Array1<f64>) -> Result<ConfusionMatrix> {
        if self.len() != ground_truth.len() {
            return Err(Error::MismatchedShapes(ground_truth.len(), self.len()));
        }
        if self.is_empty() {
            return Err(Error::NotEnoughSamples);
        }

        let mut members: Vec<f64> = ground_truth.iter().chain(self.iter()).copied().collect();
        members.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        members.dedup();

        let position = |class: f64| members.iter().position(|x| *x == class).unwrap_or(0);

        let mut matrix = Array2::zeros((members.len(), members.len()));
        for (target, predicted) in ground_truth.iter().zip(self.iter()) {
            matrix[(position(*target), position(*predicted))] += 1;
        }

        Ok(ConfusionMatrix {
            matrix,
            members: Array1::from(members),
        })
    }
}

impl ToConfusionMatrix<&Dataset> for Array1<f64> {
    fn confusion_matrix(&self, ground_truth: &Dataset) -> Result<ConfusionMatrix> {
        self.confusion_matrix(ground_truth.targets())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_confusion_matrix() {
        let ground_truth = array![1., 1., 0., 1., 0., 1.];
        let predicted = array![0., 1., 0., 1., 0., 1.];

        let cm = predicted.confusion_matrix(&ground_truth).unwrap();

        assert_eq!(cm.members(), &array![0., 1.]);
        assert_eq!(cm.count(1., 0.), 1);
        assert_eq!(cm.count(0., 0.), 2);
        assert_eq!(cm.count(1., 1.), 3);
        assert_abs_diff_eq!(cm.accuracy(), 5.0 / 6.0_f32, epsilon = 1e-5);
        assert_abs_diff_eq!(cm.precision(), array![2.0f32 / 3.0, 1.0], epsilon = 1e-5);
        assert_abs_diff_eq!(cm.recall(), array![1.0f32, 0.75], epsilon = 1e-5);
    }

    #[test]
    fn test_predicted_class_missing_from_ground_truth() {
        let ground_truth = array![0., 0., 0.];
        let predicted = array![0., 2., 0.];

        let cm = predicted.confusion_matrix(&ground_truth).unwrap();

        assert_eq!(cm.members(), &array![0., 2.]);
        assert_abs_diff_eq!(cm.accuracy(), 2.0 / 3.0_f32, epsilon = 1e-5);
    }

    #[test]
    fn test_mismatched_lengths() {
        let ground_truth = array![0., 1.];
        let predicted = array![0.];

        assert_eq!(
            predicted.confusion_matrix(&ground_truth),
            Err(Error::MismatchedShapes(2, 1))
        );
    }
}
