//! Reduced-error pruning
//!
use std::collections::BTreeSet;

use log::{debug, info};
use sylva::{metrics::ToConfusionMatrix, traits::Predict, Dataset};

use super::{DecisionTree, NodeId};
use crate::error::Result;

/// Outcome of a pruning run
#[derive(Debug, Clone, PartialEq)]
pub struct PruneReport {
    /// Validation accuracy of the unpruned tree
    pub baseline: f32,
    /// Validation accuracy with all accepted nodes pruned
    pub accuracy: f32,
    /// Pruned nodes, in the order they were accepted
    pub accepted: Vec<NodeId>,
    /// Best accuracy after each round
    pub history: Vec<f32>,
}

/// Greedy search for internal nodes that can be collapsed without losing validation accuracy
///
/// The search starts from the nodes registered by the inducer, which are the parents of leaves
/// without information gain. Each round tries every node of the frontier in ascending id order.
/// A candidate is kept pruned if the accuracy does not drop below the best accuracy seen so far;
/// its parent then joins the frontier. A rejected candidate is dropped for good.
///
/// Pruning only flips flags, no node is ever removed from the tree.
pub struct Pruner<'a> {
    tree: &'a mut DecisionTree,
    frontier: BTreeSet<NodeId>,
    accepted: Vec<NodeId>,
}

impl<'a> Pruner<'a> {
    pub fn new(tree: &'a mut DecisionTree) -> Self {
        let frontier = tree.prune_candidates().clone();

        Pruner {
            tree,
            frontier,
            accepted: Vec::new(),
        }
    }

    /// Search the frontier against `validation` and leave the tree with the accepted nodes pruned
    pub fn run(mut self, validation: &Dataset) -> Result<PruneReport> {
        self.apply();
        let nodes_before = self.reachable_nodes();
        let baseline = self.accuracy(validation)?;
        let mut best = baseline;
        let mut history = Vec::new();

        while !self.frontier.is_empty() {
            let round = self.frontier.iter().copied().collect::<Vec<_>>();
            for candidate in round {
                self.frontier.remove(&candidate);

                self.apply();
                self.tree.set_pruned(candidate);
                let accuracy = self.accuracy(validation)?;

                if accuracy < best {
                    debug!(
                        "keeping node {}, accuracy would drop to {:.4}",
                        candidate.index(),
                        accuracy
                    );
                    continue;
                }

                best = accuracy;
                self.accepted.push(candidate);
                if let Some(parent) = self.parent(candidate) {
                    if !self.accepted.contains(&parent) {
                        self.frontier.insert(parent);
                    }
                }
            }
            history.push(best);
        }

        self.apply();
        let accuracy = self.accuracy(validation)?;
        info!(
            "pruned {} nodes ({} -> {} reachable), validation accuracy {:.4} -> {:.4}",
            self.accepted.len(),
            nodes_before,
            self.reachable_nodes(),
            baseline,
            accuracy
        );

        Ok(PruneReport {
            baseline,
            accuracy,
            accepted: self.accepted,
            history,
        })
    }

    /// Reset all flags and prune exactly the accepted nodes
    fn apply(&mut self) {
        self.tree.reset_pruning();
        for id in &self.accepted {
            self.tree.set_pruned(*id);
        }
    }

    fn accuracy(&self, validation: &Dataset) -> Result<f32> {
        let predictions = self.tree.predict(validation);
        Ok(predictions.confusion_matrix(validation)?.accuracy())
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.node(id).and_then(|node| node.parent())
    }

    fn reachable_nodes(&self) -> usize {
        self.tree.node_count()
    }
}
