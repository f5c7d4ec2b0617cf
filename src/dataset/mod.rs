//! Datasets
//!
//! This module implements the dataset struct and the queries a learner needs on top of a plain
//! feature matrix: column maxima, nominal arities, majority values and the shuffling/splitting
//! helpers used for validation.
use ndarray::{Array1, Array2};

use crate::error::{Error, Result};

mod impl_dataset;
mod iter;

pub use iter::Iter;

/// Reserved code marking a missing (unknown) cell in any column
pub const MISSING: f64 = f64::MAX;

/// Largest nominal code accepted in records and targets
///
/// Learners size per-value tables by the largest code of a column, so codes are bounded.
pub const MAX_CODE: f64 = 65_535.0;

/// Returns true if `value` is the missing sentinel
#[inline]
pub fn is_missing(value: f64) -> bool {
    value == MISSING
}

/// The kind of values stored in a column
///
/// Nominal columns hold small non-negative integer codes `0..arity`. Continuous columns hold
/// arbitrary magnitudes and report an arity of zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Nominal,
    Continuous,
}

/// Dataset
///
/// This is the fundamental structure of a dataset. It contains a matrix of records and a single
/// target column aligned with the rows. Feature names and column kinds are optional and always
/// owned.
///
/// # Fields
///
/// * `records`: a two-dimensional matrix with dimensionality (nsamples, nfeatures)
/// * `targets`: a one-dimensional vector of class codes with dimensionality (nsamples)
/// * `feature_names`: optional descriptive feature names with dimensionality (nfeatures)
/// * `column_kinds`: optional kind per column, every column is nominal if unset
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub records: Array2<f64>,
    pub targets: Array1<f64>,

    feature_names: Vec<String>,
    column_kinds: Vec<ColumnKind>,
}

impl Dataset {
    /// Create a new dataset from records and targets
    ///
    /// No checks are performed here, learners call [`Dataset::validate`] before fitting.
    pub fn new(records: Array2<f64>, targets: Array1<f64>) -> Dataset {
        Dataset {
            records,
            targets,
            feature_names: Vec::new(),
            column_kinds: Vec::new(),
        }
    }

    /// Returns reference to records
    pub fn records(&self) -> &Array2<f64> {
        &self.records
    }

    /// Returns reference to targets
    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    /// Number of rows
    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    /// Number of feature columns
    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    /// Returns feature names
    ///
    /// A feature name gives a human-readable string describing the purpose of a single feature.
    /// If no names were set, `feature-0`, `feature-1`, .. are generated.
    pub fn feature_names(&self) -> Vec<String> {
        if !self.feature_names.is_empty() {
            self.feature_names.clone()
        } else {
            (0..self.nfeatures())
                .map(|idx| format!("feature-{}", idx))
                .collect()
        }
    }

    /// Updates the feature names of a dataset
    pub fn with_feature_names<I: Into<String>>(mut self, names: Vec<I>) -> Dataset {
        self.feature_names = names.into_iter().map(|x| x.into()).collect();
        self
    }

    /// Kind of column `col`, nominal unless set otherwise
    pub fn column_kind(&self, col: usize) -> ColumnKind {
        self.column_kinds
            .get(col)
            .copied()
            .unwrap_or(ColumnKind::Nominal)
    }

    /// Updates the column kinds of a dataset
    pub fn with_column_kinds(mut self, kinds: Vec<ColumnKind>) -> Dataset {
        self.column_kinds = kinds;
        self
    }

    /// Create an iterator over `(record, target)` pairs
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Checks that the dataset can be handed to a nominal learner
    ///
    /// Fails if records and targets disagree in their row count, the dataset is empty, a column
    /// is continuous or a cell holds something other than an integer code in `0..=MAX_CODE` or
    /// the missing sentinel. Targets must be known class codes.
    pub fn validate(&self) -> Result<()> {
        if self.records.nrows() != self.targets.len() {
            return Err(Error::MismatchedShapes(
                self.records.nrows(),
                self.targets.len(),
            ));
        }
        if self.nsamples() == 0 {
            return Err(Error::NotEnoughSamples);
        }

        for (col, column) in self.records.columns().into_iter().enumerate() {
            if self.column_kind(col) == ColumnKind::Continuous {
                return Err(Error::ContinuousColumn(col));
            }
            if let Some(&value) = column
                .iter()
                .find(|&&x| !is_missing(x) && !is_code(x))
            {
                return Err(Error::InvalidCode { col, value });
            }
        }

        match self.targets.iter().find(|&&x| is_missing(x) || !is_code(x)) {
            Some(&target) => Err(Error::InvalidTarget(target)),
            None => Ok(()),
        }
    }
}

impl From<(Array2<f64>, Array1<f64>)> for Dataset {
    fn from(rec_tar: (Array2<f64>, Array1<f64>)) -> Self {
        Dataset::new(rec_tar.0, rec_tar.1)
    }
}

fn is_code(x: f64) -> bool {
    (0.0..=MAX_CODE).contains(&x) && x.fract() == 0.0
}
