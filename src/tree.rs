//! A binary decision tree is the core data structure for Bayesian
//! Additive Regression Trees (BART). The tree is index-addressed: node
//! `i` has its left child at `2i + 1`, its right child at `2i + 2` and
//! its parent at `(i - 1) / 2`, with the root at 0.
//!
//! Nodes are stored in a map keyed by index rather than a pointer
//! graph. This gives O(1) parent/child lookup and avoids the borrow
//! checker issues of classical recursive binary tree implementations.

use core::fmt;
use std::collections::HashMap;

use ndarray::Array1;

/// A split node routes observations by comparing one predictor against
/// a threshold: `x[idx_split_variable] <= split_value` goes left,
/// anything else (including NaN) goes right.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitNode {
    /// Position of this node in the logical complete binary tree.
    pub index: usize,
    /// Column of the design matrix used for routing.
    pub idx_split_variable: usize,
    /// Routing threshold.
    pub split_value: f64,
    /// Observation indices currently routed to this node.
    pub idx_data_points: Vec<usize>,
}

/// A leaf node holds the scalar prediction this tree contributes for
/// every observation routed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    /// Position of this node in the logical complete binary tree.
    pub index: usize,
    /// Scalar prediction contributed by this leaf.
    pub value: f64,
    /// Observation indices currently routed to this node.
    pub idx_data_points: Vec<usize>,
}

/// A tree position, either a split or a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Internal node with exactly two children.
    Split(SplitNode),
    /// Terminal node holding a scalar prediction.
    Leaf(LeafNode),
}

impl Node {
    /// Position of this node in the logical complete binary tree.
    pub fn index(&self) -> usize {
        match self {
            Node::Split(split) => split.index,
            Node::Leaf(leaf) => leaf.index,
        }
    }

    /// Observation indices currently routed to this node.
    pub fn idx_data_points(&self) -> &[usize] {
        match self {
            Node::Split(split) => &split.idx_data_points,
            Node::Leaf(leaf) => &leaf.idx_data_points,
        }
    }

    /// Index of the left child position.
    pub fn left_child_index(&self) -> usize {
        self.index() * 2 + 1
    }

    /// Index of the right child position.
    pub fn right_child_index(&self) -> usize {
        self.index() * 2 + 2
    }

    /// Depth of this node, with the root at depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current_index = self.index();

        while current_index != 0 {
            depth += 1;
            current_index = (current_index - 1) / 2;
        }

        depth
    }
}

/// Represents errors related to binary decision tree operations.
#[derive(Debug, PartialEq, Eq)]
pub enum TreeError {
    /// When attempting to grow at a node that is not a leaf.
    NonLeafGrow,
    /// When attempting to prune at a node that is not a split.
    NonSplitPrune,
    /// When the passed node index does not exist in the tree.
    InvalidNodeIndex,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TreeError::NonLeafGrow => write!(f, "Cannot grow at a non-leaf node"),
            TreeError::NonSplitPrune => write!(f, "Cannot prune at a non-split node"),
            TreeError::InvalidNodeIndex => write!(f, "Node index does not exist"),
        }
    }
}

impl std::error::Error for TreeError {}

/// An index-addressed full binary tree. Every node has zero or two
/// children; the `idx_data_points` of the leaves partition the rows
/// assigned to the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: HashMap<usize, Node>,
}

impl Tree {
    /// Creates a tree holding a single leaf at the root with the given
    /// value and row indices.
    pub fn new(leaf_value: f64, idx_data_points: Vec<usize>) -> Self {
        let root = Node::Leaf(LeafNode {
            index: 0,
            value: leaf_value,
            idx_data_points,
        });

        Self {
            nodes: HashMap::from([(0, root)]),
        }
    }

    /// Looks up the node stored at `index`.
    pub fn get_node(&self, index: usize) -> Result<&Node, TreeError> {
        self.nodes.get(&index).ok_or(TreeError::InvalidNodeIndex)
    }

    /// Number of nodes currently in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all nodes in the tree, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Checks whether the node at `index` is a leaf.
    pub fn is_leaf(&self, index: usize) -> bool {
        matches!(self.nodes.get(&index), Some(Node::Leaf(_)))
    }

    /// Checks whether the node at `index` is a split whose two children
    /// are both leaves, i.e. whether it can be pruned.
    pub fn is_prunable_split(&self, index: usize) -> bool {
        match self.nodes.get(&index) {
            Some(node @ Node::Split(_)) => {
                self.is_leaf(node.left_child_index()) && self.is_leaf(node.right_child_index())
            }
            _ => false,
        }
    }

    /// Replaces the leaf at `split.index` with `split` and installs the
    /// two new leaves at its child positions.
    ///
    /// The caller is responsible for the row bookkeeping: `left` and
    /// `right` must partition the replaced leaf's `idx_data_points`.
    pub fn grow(
        &mut self,
        split: SplitNode,
        left: LeafNode,
        right: LeafNode,
    ) -> Result<(), TreeError> {
        let index = split.index;
        match self.nodes.get(&index) {
            None => return Err(TreeError::InvalidNodeIndex),
            Some(Node::Split(_)) => return Err(TreeError::NonLeafGrow),
            Some(Node::Leaf(_)) => {}
        }

        debug_assert_eq!(left.index, index * 2 + 1);
        debug_assert_eq!(right.index, index * 2 + 2);

        self.nodes.insert(left.index, Node::Leaf(left));
        self.nodes.insert(right.index, Node::Leaf(right));
        self.nodes.insert(index, Node::Split(split));

        Ok(())
    }

    /// Replaces the split at `leaf.index` (and its two leaf children)
    /// with the single leaf `leaf`.
    ///
    /// The caller must have checked that the split is prunable; `leaf`
    /// carries the union of the removed children's rows.
    pub fn prune(&mut self, leaf: LeafNode) -> Result<(), TreeError> {
        let index = leaf.index;
        match self.nodes.get(&index) {
            None => return Err(TreeError::InvalidNodeIndex),
            Some(Node::Leaf(_)) => return Err(TreeError::NonSplitPrune),
            Some(Node::Split(_)) => {}
        }

        self.nodes.remove(&(index * 2 + 1));
        self.nodes.remove(&(index * 2 + 2));
        self.nodes.insert(index, Node::Leaf(leaf));

        Ok(())
    }

    /// Returns this tree's prediction for each of the `num_observations`
    /// in-sample rows, using the row membership of its leaves.
    pub fn predict_output(&self, num_observations: usize) -> Array1<f64> {
        let mut predictions = Array1::zeros(num_observations);

        for node in self.nodes.values() {
            if let Node::Leaf(leaf) = node {
                for &idx in &leaf.idx_data_points {
                    predictions[idx] = leaf.value;
                }
            }
        }

        predictions
    }

    /// Routes a new input row from the root to a leaf and returns that
    /// leaf's value. Rows with NaN in the routing predictor go right,
    /// consistent with the in-sample partition rule.
    pub fn out_of_sample_predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[&index] {
                Node::Leaf(leaf) => return leaf.value,
                Node::Split(split) => {
                    index = if x[split.idx_split_variable] <= split.split_value {
                        split.index * 2 + 1
                    } else {
                        split.index * 2 + 2
                    };
                }
            }
        }
    }
}
