use sylva::ParamGuard;

use crate::error::{Result, TreeError};
use crate::DecisionTree;

/// The set of hyperparameters that can be specified for fitting a
/// [decision tree](struct.DecisionTree.html).
///
/// ### Example
///
/// ```rust
/// use ndarray::array;
/// use sylva::prelude::*;
/// use sylva_trees::DecisionTree;
///
/// let records = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]];
/// let dataset = Dataset::new(records, array![0., 1., 1., 0.]);
///
/// // Initialize the default set of parameters
/// let params = DecisionTree::params();
/// // Set the parameters to the desired values
/// let params = params.seed(7).max_depth(Some(4));
///
/// // Fit the decision tree on the training data
/// let tree = params.fit(&dataset).unwrap();
/// // Predict on the same records and check accuracy
/// let accuracy = tree.predict(&dataset).confusion_matrix(&dataset).unwrap().accuracy();
/// assert!((accuracy - 1.0).abs() < 1e-6);
/// ```
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionTreeValidParams {
    prune: bool,
    train_ratio: f32,
    seed: u64,
    max_depth: Option<usize>,
}

impl DecisionTreeValidParams {
    pub fn prune(&self) -> bool {
        self.prune
    }

    pub fn train_ratio(&self) -> f32 {
        self.train_ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionTreeParams(DecisionTreeValidParams);

impl DecisionTreeParams {
    pub fn new() -> Self {
        Self(DecisionTreeValidParams {
            prune: false,
            train_ratio: 0.8,
            seed: 42,
            max_depth: None,
        })
    }

    /// Enables reduced-error pruning
    ///
    /// The dataset is shuffled and split by `train_ratio`; the tree is grown on the first part and
    /// pruned against the second.
    pub fn prune(mut self, prune: bool) -> Self {
        self.0.prune = prune;
        self
    }

    /// Sets the share of rows used for growing the tree when pruning is enabled
    pub fn train_ratio(mut self, train_ratio: f32) -> Self {
        self.0.train_ratio = train_ratio;
        self
    }

    /// Sets the seed for shuffling, imputation and the routing of unseen values
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Sets the optional limit to the depth of the decision tree
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `prune = false`
    /// * `train_ratio = 0.8`
    /// * `seed = 42`
    /// * `max_depth = None`
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> DecisionTreeParams {
        DecisionTreeParams::new()
    }
}

impl ParamGuard for DecisionTreeParams {
    type Checked = DecisionTreeValidParams;
    type Error = TreeError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !(self.0.train_ratio > 0.0 && self.0.train_ratio < 1.0) {
            Err(TreeError::Parameters(format!(
                "Training ratio should be in (0, 1), but was {}",
                self.0.train_ratio
            )))
        } else if self.0.max_depth == Some(0) {
            Err(TreeError::Parameters(
                "Maximum depth should be positive, but was 0".to_string(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
