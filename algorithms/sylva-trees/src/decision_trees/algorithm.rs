//! Nominal decision trees
//!
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeSet;

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{DecisionTreeValidParams, EntrySet, NodeIter, PruneReport, Pruner};
use crate::error::{Result, TreeError};
use sylva::{
    traits::{Fit, PredictInplace},
    Dataset,
};

/// Index of a node in the arena of a [`DecisionTree`]
///
/// Ids are handed out in creation order, which is a preorder walk of the tree. The root always
/// has index zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

#[derive(Debug, Clone)]
/// A node in the decision tree
///
/// Every node keeps the snapshot of the rows that reached it during training. Internal nodes have
/// one child per value of their split feature. The `pruned` flag is independent of the leaf
/// flag: a pruned internal node keeps its children but predicts as if it were a leaf.
pub struct TreeNode {
    entries: EntrySet,
    split_feature: usize,
    info_gain: f64,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    leaf_node: bool,
    pruned: bool,
    prediction: f64,
    depth: usize,
}

impl TreeNode {
    fn leaf(entries: EntrySet, parent: Option<NodeId>, prediction: f64, depth: usize) -> Self {
        TreeNode {
            entries,
            split_feature: 0,
            info_gain: 0.0,
            children: Vec::new(),
            parent,
            leaf_node: true,
            pruned: false,
            prediction,
            depth,
        }
    }

    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.leaf_node
    }

    /// Returns true if pruning turned the node into a leaf
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    /// Returns the depth of the node in the decision tree
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Majority class of the training rows that reached this node
    ///
    /// Nodes without rows carry the majority class of their parent.
    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    /// Children ordered by the value of the split feature
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Snapshot of the training rows that reached this node
    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    /// Return the split as (local feature index, original feature index) and its information gain
    ///
    /// Returns `None` for leaves.
    pub fn split(&self) -> Option<(usize, usize, f64)> {
        if self.leaf_node {
            None
        } else {
            Some((
                self.split_feature,
                self.entries.columns()[self.split_feature],
                self.info_gain,
            ))
        }
    }
}

/// Output of growing a tree: the node arena and the nodes registered for pruning
pub(crate) struct Induction {
    nodes: Vec<TreeNode>,
    candidates: BTreeSet<NodeId>,
    max_depth: Option<usize>,
}

/// Grows a tree from the root snapshot `entries`
pub(crate) fn induce(entries: EntrySet, max_depth: Option<usize>) -> Induction {
    let mut induction = Induction {
        nodes: Vec::new(),
        candidates: BTreeSet::new(),
        max_depth,
    };
    induction.grow(entries, None, 0, None);

    induction
}

impl Induction {
    /// Recursively grows the node for `entries` and returns its id
    fn grow(
        &mut self,
        entries: EntrySet,
        parent: Option<NodeId>,
        depth: usize,
        inherited: Option<f64>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let prediction = entries.majority_target().or(inherited).unwrap_or(0.0);

        // no column left to split on, so nothing can be gained below this node
        if entries.nfeatures() == 0 {
            if let Some(parent) = parent {
                self.candidates.insert(parent);
            }
            self.nodes
                .push(TreeNode::leaf(entries, parent, prediction, depth));
            return id;
        }

        if self.max_depth.map(|max| depth >= max).unwrap_or(false) {
            self.nodes
                .push(TreeNode::leaf(entries, parent, prediction, depth));
            return id;
        }

        let gains = entries.feature_info_gains();
        let (mut best, mut best_gain) = (0, gains[0]);
        for (col, &gain) in gains.iter().enumerate().skip(1) {
            if gain > best_gain {
                best = col;
                best_gain = gain;
            }
        }

        if best_gain <= 0.0 {
            // an impure node can still be separated by a column whose one-level gain is zero
            let separating = if entries.info() > 0.0 {
                (0..entries.nfeatures()).find(|&col| entries.separates(col))
            } else {
                None
            };

            match separating {
                Some(col) => {
                    best = col;
                    best_gain = gains[col].max(0.0);
                }
                None => {
                    if let Some(parent) = parent {
                        self.candidates.insert(parent);
                    }
                    self.nodes
                        .push(TreeNode::leaf(entries, parent, prediction, depth));
                    return id;
                }
            }
        }

        debug!(
            "node {} at depth {} splits on feature {} with gain {:.4}",
            id.0,
            depth,
            entries.columns()[best],
            best_gain
        );

        let partitions = entries.split_on_feature(best);
        let mut node = TreeNode::leaf(entries, parent, prediction, depth);
        node.leaf_node = false;
        node.split_feature = best;
        node.info_gain = best_gain;
        self.nodes.push(node);

        let children = partitions
            .into_iter()
            .map(|partition| self.grow(partition, Some(id), depth + 1, Some(prediction)))
            .collect();
        self.nodes[id.0].children = children;

        id
    }
}

/// A fitted decision tree model for classification of nominal data.
///
/// ### Structure
/// A decision tree structure is a tree where each internal node splits the rows on the value of
/// one nominal feature, with one child per value. Leaves predict the majority class of the
/// training rows that reached them.
///
/// ### Algorithm
/// The tree is grown top down: every node splits on the feature with the highest information
/// gain and the split feature is dropped from the subtrees. Missing cells of the training data
/// are imputed with auxiliary trees before growing. When pruning is enabled, part of the data is
/// held back and internal nodes are collapsed greedily as long as the accuracy on the held-back
/// rows does not decrease.
///
/// ### Prediction
/// Feature values above the largest value seen in training are capped to it. A value that
/// matches no child of a node is routed to a random child, using a generator seeded from the
/// hyperparameters.
///
/// ### Example
///
/// ```rust
/// use ndarray::array;
/// use sylva::prelude::*;
/// use sylva_trees::DecisionTree;
///
/// let records = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.], [2., 0.], [2., 1.]];
/// let targets = array![0., 0., 1., 1., 1., 0.];
/// let dataset = Dataset::new(records, targets);
///
/// let tree = DecisionTree::params().fit(&dataset).unwrap();
///
/// assert_eq!(tree.predict_row(array![1., 1.].view()), 1.);
/// assert_eq!(tree.features(), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    maxima: Vec<f64>,
    num_features: usize,
    prune_candidates: BTreeSet<NodeId>,
    prune_report: Option<PruneReport>,
    rng: RefCell<SmallRng>,
}

impl DecisionTree {
    pub(crate) fn from_induction(induction: Induction, rng: SmallRng) -> Self {
        let root = induction.nodes[0].entries();
        let num_features = root.nfeatures();
        let maxima = (0..num_features)
            .map(|col| root.column_max(col).unwrap_or(0.0))
            .collect();

        DecisionTree {
            num_features,
            maxima,
            nodes: induction.nodes,
            prune_candidates: induction.candidates,
            prune_report: None,
            rng: RefCell::new(rng),
        }
    }

    /// Classify a single record
    ///
    /// ### Panics
    ///
    /// If the record does not have as many features as the training data
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        assert_eq!(
            row.len(),
            self.num_features,
            "The number of features must match the training data."
        );

        let mut features = row
            .iter()
            .zip(&self.maxima)
            .map(|(&x, &max)| x.min(max))
            .collect::<Vec<_>>();

        let mut node = self.root_node();
        while !node.is_leaf() && !node.is_pruned() && !node.children.is_empty() {
            let value = features.remove(node.split_feature);
            let nchildren = node.children.len();

            let child = if value >= 0.0 && value.fract() == 0.0 && (value as usize) < nchildren {
                value as usize
            } else {
                self.rng.borrow_mut().gen_range(0..nchildren)
            };
            node = &self.nodes[node.children[child].0];
        }

        node.prediction
    }

    /// Create a node iterator in level-order (BFT)
    ///
    /// The iterator does not descend below pruned nodes.
    pub fn iter_nodes(&self) -> NodeIter {
        NodeIter::new(&self.nodes, NodeId(0))
    }

    /// Return root node of the tree
    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Look up a node by id, including nodes hidden below pruned ones
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Number of reachable nodes
    pub fn node_count(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Return max depth of the tree
    pub fn depth(&self) -> usize {
        self.iter_nodes()
            .fold(0, |max, node| usize::max(max, node.depth))
    }

    /// Return the number of leaves in this tree, counting pruned nodes as leaves
    pub fn num_leaves(&self) -> usize {
        self.iter_nodes()
            .filter(|node| node.is_leaf() || node.is_pruned())
            .count()
    }

    /// Return the original feature indices this tree splits on, in ascending order
    pub fn features(&self) -> Vec<usize> {
        self.splits()
            .map(|(_, feature, _)| feature)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Return the mean information gain of the splits on each feature
    pub fn mean_information_gain(&self) -> Vec<f64> {
        let mut information_gain = vec![0.0; self.num_features];
        let mut num_nodes = vec![0; self.num_features];

        for (_, feature, gain) in self.splits() {
            information_gain[feature] += gain;
            num_nodes[feature] += 1;
        }

        information_gain
            .into_iter()
            .zip(num_nodes.into_iter())
            .map(|(val, n)| if n == 0 { 0.0 } else { val / n as f64 })
            .collect()
    }

    /// Return the feature importance, i.e. the relative mean information gain, for each feature
    ///
    /// All importances are zero if no split gained any information.
    pub fn feature_importance(&self) -> Vec<f64> {
        let mean_information_gain = self.mean_information_gain();
        let sum: f64 = mean_information_gain.iter().sum();

        if sum > 0.0 {
            mean_information_gain.into_iter().map(|x| x / sum).collect()
        } else {
            mean_information_gain
        }
    }

    /// Nodes whose subtrees ended in a leaf without information gain
    ///
    /// These are the starting points of reduced-error pruning.
    pub fn prune_candidates(&self) -> &BTreeSet<NodeId> {
        &self.prune_candidates
    }

    /// Prune the tree against held-back `validation` data
    ///
    /// Flags set by an earlier pruning run are cleared first. Accuracy on `validation` never
    /// drops below the accuracy of the unpruned tree.
    pub fn prune_with(&mut self, validation: &Dataset) -> Result<&PruneReport> {
        validation.validate()?;
        if validation.nfeatures() != self.num_features {
            return Err(TreeError::Parameters(format!(
                "validation data has {} features, but the tree was trained on {}",
                validation.nfeatures(),
                self.num_features
            )));
        }

        let report = Pruner::new(self).run(validation)?;
        Ok(&*self.prune_report.insert(report))
    }

    /// Outcome of the last pruning run, if any
    pub fn prune_report(&self) -> Option<&PruneReport> {
        self.prune_report.as_ref()
    }

    pub(crate) fn set_pruned(&mut self, id: NodeId) {
        self.nodes[id.0].pruned = true;
    }

    pub(crate) fn reset_pruning(&mut self) {
        for node in self.nodes.iter_mut() {
            node.pruned = false;
        }
    }

    fn splits(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.iter_nodes()
            .filter(|node| !node.is_pruned())
            .filter_map(|node| node.split())
    }
}

impl PredictInplace<Array2<f64>, Array1<f64>> for DecisionTree {
    /// Make predictions for each row of a matrix of features `x`.
    fn predict_inplace(&self, x: &Array2<f64>, y: &mut Array1<f64>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.predict_row(row);
        }
    }

    fn default_target(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }
}

impl Fit<TreeError> for DecisionTreeValidParams {
    type Object = DecisionTree;

    /// Fit a decision tree using the hyperparameters on the dataset consisting of
    /// a matrix of nominal features and an array of class codes.
    fn fit(&self, dataset: &Dataset) -> Result<Self::Object> {
        dataset.validate()?;

        let mut rng = SmallRng::seed_from_u64(self.seed());
        let (train, validation) = if self.prune() {
            let (train, validation) = dataset
                .clone()
                .shuffle(&mut rng)
                .split_with_ratio(self.train_ratio());
            (Cow::Owned(train), Some(validation))
        } else {
            (Cow::Borrowed(dataset), None)
        };

        let entries = EntrySet::from_dataset(&train, &mut rng)?;
        let induction = induce(entries, self.max_depth());
        let mut tree = DecisionTree::from_induction(induction, SmallRng::seed_from_u64(rng.gen()));

        match validation {
            Some(validation) if validation.nsamples() > 0 => {
                tree.prune_with(&validation)?;
            }
            Some(_) => warn!(
                "no rows left for validation with a training ratio of {}, pruning skipped",
                self.train_ratio()
            ),
            None => {}
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::{array, s, Array};
    use sylva::{metrics::ToConfusionMatrix, traits::Predict, ParamGuard};

    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};

    fn xor() -> Dataset {
        Dataset::new(
            array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]],
            array![0., 1., 1., 0.],
        )
    }

    #[test]
    fn xor_is_learned_perfectly() -> Result<()> {
        let dataset = xor();
        let model = DecisionTree::params().fit(&dataset)?;

        let cm = model.predict(&dataset).confusion_matrix(&dataset)?;
        assert_abs_diff_eq!(cm.accuracy(), 1.0, epsilon = 1e-6);
        assert_eq!(model.predict(dataset.records()), array![0., 1., 1., 0.]);

        Ok(())
    }

    #[test]
    fn nodes_are_numbered_in_preorder() -> Result<()> {
        let model = DecisionTree::params().fit(&xor())?;

        assert_eq!(model.node_count(), 7);
        assert_eq!(model.depth(), 2);
        assert_eq!(model.num_leaves(), 4);

        let root = model.root_node();
        assert_eq!(root.split(), Some((0, 0, 0.0)));
        assert_eq!(root.children(), &[NodeId(1), NodeId(4)]);

        let left = model.node(NodeId(1)).unwrap();
        assert_eq!(left.parent(), Some(NodeId(0)));
        assert_eq!(left.entries().columns(), &[1]);
        assert_eq!(left.split(), Some((0, 1, 1.0)));
        assert_eq!(left.children(), &[NodeId(2), NodeId(3)]);

        // pure leaves register their parents
        let candidates = model.prune_candidates().iter().copied().collect::<Vec<_>>();
        assert_eq!(candidates, vec![NodeId(1), NodeId(4)]);

        Ok(())
    }

    #[test]
    fn exhausted_leaves_register_their_parent() -> Result<()> {
        // column 1 only separates two noisy rows where column 0 is one
        let dataset = Dataset::new(
            array![
                [0., 0.],
                [0., 0.],
                [0., 1.],
                [1., 0.],
                [1., 0.],
                [1., 0.],
                [1., 1.],
            ],
            array![0., 0., 0., 1., 1., 1., 0.],
        );
        let model = DecisionTree::params().fit(&dataset)?;

        assert_eq!(model.node_count(), 5);
        // leaves 3 and 4 have no column left
        assert_eq!(model.node(NodeId(3)).unwrap().entries().nfeatures(), 0);
        let candidates = model.prune_candidates().iter().copied().collect::<Vec<_>>();
        assert_eq!(candidates, vec![NodeId(0), NodeId(2)]);

        // leaves cut off by the depth limit do not
        let shallow = DecisionTree::params().max_depth(Some(1)).fit(&dataset)?;
        assert_eq!(shallow.node_count(), 3);
        assert!(shallow.prune_candidates().is_empty());

        Ok(())
    }

    #[test]
    fn constant_feature_gives_a_single_leaf() -> Result<()> {
        let dataset = Dataset::new(array![[0.], [0.], [0.]], array![0., 1., 1.]);
        let model = DecisionTree::params().fit(&dataset)?;

        assert_eq!(model.node_count(), 1);
        assert!(model.root_node().is_leaf());
        assert!(model.prune_candidates().is_empty());
        assert_eq!(model.predict_row(array![0.].view()), 1.);
        // capped to the largest trained value
        assert_eq!(model.predict_row(array![3.].view()), 1.);

        Ok(())
    }

    #[test]
    /// Single feature test
    ///
    /// Generate a dataset where a single feature perfectly correlates
    /// with the target while the remaining features are random nominal
    /// noise and do not add any information.
    fn single_feature_random_noise_binary() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);

        // generate data with 9 noise columns and a single correlated feature
        let mut data =
            Array::random_using((50, 10), Uniform::new(0u8, 3), &mut rng).mapv(f64::from);
        data.slice_mut(s![.., 8]).assign(
            &(0..50)
                .map(|x| if x < 25 { 0.0 } else { 1.0 })
                .collect::<Array1<_>>(),
        );

        let targets = (0..50)
            .map(|x| if x < 25 { 0.0 } else { 1.0 })
            .collect::<Array1<_>>();
        let dataset = Dataset::new(data, targets);

        let model = DecisionTree::params().fit(&dataset)?;

        // we should only use feature index 8 here
        assert_eq!(&model.features(), &[8]);
        assert_eq!(model.node_count(), 3);

        let ground_truth = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];

        for (imp, truth) in model.feature_importance().iter().zip(&ground_truth) {
            assert_abs_diff_eq!(imp, truth, epsilon = 1e-15);
        }

        // check for perfect accuracy
        let cm = model
            .predict(dataset.records())
            .confusion_matrix(&dataset)?;
        assert_abs_diff_eq!(cm.accuracy(), 1.0, epsilon = 1e-6);

        Ok(())
    }

    #[test]
    /// Check that the max depth is respected for random data
    fn check_max_depth() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);

        let data = Array::random_using((60, 5), Uniform::new(0u8, 3), &mut rng).mapv(f64::from);
        let targets = Array::random_using(60, Uniform::new(0u8, 4), &mut rng).mapv(f64::from);
        let dataset = Dataset::new(data, targets);

        for max_depth in &[1, 2, 3] {
            let model = DecisionTree::params()
                .max_depth(Some(*max_depth))
                .fit(&dataset)?;
            assert!(model.depth() <= *max_depth);
        }

        // every level drops one column
        let model = DecisionTree::params().fit(&dataset)?;
        assert!(model.depth() <= 5);

        Ok(())
    }

    #[test]
    fn children_lose_the_split_column() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(3);

        let data = Array::random_using((40, 4), Uniform::new(0u8, 3), &mut rng).mapv(f64::from);
        let targets = Array::random_using(40, Uniform::new(0u8, 2), &mut rng).mapv(f64::from);
        let model = DecisionTree::params().fit(&Dataset::new(data, targets))?;

        for node in model.iter_nodes() {
            for child in node.children() {
                let child = model.node(*child).unwrap();
                assert_eq!(child.entries().nfeatures() + 1, node.entries().nfeatures());
                assert_eq!(child.depth(), node.depth() + 1);
            }
            if !node.is_leaf() {
                let rows = node
                    .children()
                    .iter()
                    .map(|child| model.node(*child).unwrap().entries().nsamples())
                    .sum::<usize>();
                assert_eq!(rows, node.entries().nsamples());
            }
        }

        Ok(())
    }

    #[test]
    fn unseen_values_are_routed_to_some_child() -> Result<()> {
        let dataset = xor();
        let model = DecisionTree::params().seed(11).fit(&dataset)?;
        let same = DecisionTree::params().seed(11).fit(&dataset)?;

        let unseen = array![[-1., 0.], [0.5, 1.], [-3., -3.], [-2., 0.5]];
        let predictions = model.predict(&unseen);
        for prediction in predictions.iter() {
            assert!(*prediction == 0. || *prediction == 1.);
        }

        // routing is reproducible for a given seed
        assert_eq!(predictions, same.predict(&unseen));

        Ok(())
    }

    #[test]
    fn prune_with_checks_the_validation_data() -> Result<()> {
        let mut model = DecisionTree::params().fit(&xor())?;

        let narrow = Dataset::new(array![[0.], [1.]], array![0., 1.]);
        assert!(matches!(
            model.prune_with(&narrow),
            Err(TreeError::Parameters(_))
        ));
        assert!(model.prune_report().is_none());

        Ok(())
    }

    #[test]
    fn malformed_data_is_rejected() {
        let params = DecisionTree::params().check_unwrap();

        let negative = Dataset::new(array![[0.], [-1.]], array![0., 1.]);
        assert!(matches!(
            params.fit(&negative),
            Err(TreeError::BaseCrate(sylva::Error::InvalidCode { col: 0, .. }))
        ));

        let unknown_target =
            Dataset::new(array![[0.], [1.], [1.]], array![0., sylva::MISSING, 1.]);
        assert_eq!(
            params.fit(&unknown_target).map(|_| ()),
            Err(TreeError::BaseCrate(sylva::Error::InvalidTarget(
                sylva::MISSING
            )))
        );

        let huge_code = Dataset::new(array![[0.], [1e12], [1.]], array![0., 1., 1.]);
        assert_eq!(
            params.fit(&huge_code).map(|_| ()),
            Err(TreeError::BaseCrate(sylva::Error::InvalidCode {
                col: 0,
                value: 1e12
            }))
        );

        let continuous = xor().with_column_kinds(vec![
            sylva::ColumnKind::Nominal,
            sylva::ColumnKind::Continuous,
        ]);
        assert_eq!(
            params.fit(&continuous).map(|_| ()),
            Err(TreeError::BaseCrate(sylva::Error::ContinuousColumn(1)))
        );
    }

    #[test]
    fn pruning_without_validation_rows_is_skipped() -> Result<()> {
        let dataset = Dataset::new(array![[0., 1.]], array![1.]);
        let model = DecisionTree::params().prune(true).fit(&dataset)?;

        assert!(model.prune_report().is_none());
        assert_eq!(model.predict_row(array![0., 1.].view()), 1.);

        Ok(())
    }
}
