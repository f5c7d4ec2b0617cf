use std::collections::VecDeque;
use std::iter::Iterator;

use super::{NodeId, TreeNode};

/// Level-order (BFT) iterator of nodes in a decision tree
///
/// Children of pruned nodes are not visited.
pub struct NodeIter<'a> {
    nodes: &'a [TreeNode],
    queue: VecDeque<NodeId>,
}

impl<'a> NodeIter<'a> {
    pub fn new(nodes: &'a [TreeNode], root: NodeId) -> Self {
        let mut queue = VecDeque::new();
        if root.index() < nodes.len() {
            queue.push_back(root);
        }

        NodeIter { nodes, queue }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        self.queue.pop_front().map(|id| {
            let node = &nodes[id.index()];
            if !node.is_pruned() {
                self.queue.extend(node.children().iter().copied());
            }

            node
        })
    }
}
