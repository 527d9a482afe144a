use gp_bart::tree::{LeafNode, Node, SplitNode, Tree, TreeError};

fn grown_tree() -> Tree {
    let mut tree = Tree::new(0.5, vec![0, 1, 2, 3]);
    tree.grow(
        SplitNode {
            index: 0,
            idx_split_variable: 0,
            split_value: 2.0,
            idx_data_points: vec![0, 1, 2, 3],
        },
        LeafNode {
            index: 1,
            value: -1.0,
            idx_data_points: vec![0, 1],
        },
        LeafNode {
            index: 2,
            value: 1.0,
            idx_data_points: vec![2, 3],
        },
    )
    .unwrap();
    tree
}

#[test]
fn test_tree_new() {
    let tree = Tree::new(1.5, vec![0, 1, 2]);

    assert_eq!(tree.num_nodes(), 1);
    assert!(tree.is_leaf(0));

    match tree.get_node(0).unwrap() {
        Node::Leaf(leaf) => {
            assert_eq!(leaf.value, 1.5);
            assert_eq!(leaf.idx_data_points, vec![0, 1, 2]);
        }
        Node::Split(_) => panic!("root of a fresh tree must be a leaf"),
    }
}

#[test]
fn test_node_addressing() {
    let tree = grown_tree();
    let root = tree.get_node(0).unwrap();

    assert_eq!(root.left_child_index(), 1);
    assert_eq!(root.right_child_index(), 2);
    assert_eq!(root.depth(), 0);
    assert_eq!(tree.get_node(1).unwrap().depth(), 1);
    assert_eq!(tree.get_node(2).unwrap().depth(), 1);
}

#[test]
fn test_grow_replaces_leaf_with_subtree() {
    let tree = grown_tree();

    assert_eq!(tree.num_nodes(), 3);
    assert!(!tree.is_leaf(0));
    assert!(tree.is_leaf(1));
    assert!(tree.is_leaf(2));
    assert!(tree.is_prunable_split(0));

    match tree.get_node(0).unwrap() {
        Node::Split(split) => {
            assert_eq!(split.idx_split_variable, 0);
            assert_eq!(split.split_value, 2.0);
            assert_eq!(split.idx_data_points, vec![0, 1, 2, 3]);
        }
        Node::Leaf(_) => panic!("grown node must be a split"),
    }
}

#[test]
fn test_grow_rejects_non_leaf_and_bad_index() {
    let mut tree = grown_tree();

    let err = tree
        .grow(
            SplitNode {
                index: 0,
                idx_split_variable: 0,
                split_value: 1.0,
                idx_data_points: vec![0, 1, 2, 3],
            },
            LeafNode {
                index: 1,
                value: 0.0,
                idx_data_points: vec![0],
            },
            LeafNode {
                index: 2,
                value: 0.0,
                idx_data_points: vec![1, 2, 3],
            },
        )
        .unwrap_err();
    assert_eq!(err, TreeError::NonLeafGrow);

    let err = tree
        .grow(
            SplitNode {
                index: 9,
                idx_split_variable: 0,
                split_value: 1.0,
                idx_data_points: vec![],
            },
            LeafNode {
                index: 19,
                value: 0.0,
                idx_data_points: vec![],
            },
            LeafNode {
                index: 20,
                value: 0.0,
                idx_data_points: vec![],
            },
        )
        .unwrap_err();
    assert_eq!(err, TreeError::InvalidNodeIndex);
}

#[test]
fn test_prune_restores_single_leaf() {
    let mut tree = grown_tree();
    tree.prune(LeafNode {
        index: 0,
        value: 0.25,
        idx_data_points: vec![0, 1, 2, 3],
    })
    .unwrap();

    assert_eq!(tree.num_nodes(), 1);
    assert!(tree.is_leaf(0));
    assert_eq!(tree.get_node(1).unwrap_err(), TreeError::InvalidNodeIndex);
    assert_eq!(tree.get_node(2).unwrap_err(), TreeError::InvalidNodeIndex);
}

#[test]
fn test_prune_rejects_leaf() {
    let mut tree = Tree::new(0.0, vec![0]);
    let err = tree
        .prune(LeafNode {
            index: 0,
            value: 0.0,
            idx_data_points: vec![0],
        })
        .unwrap_err();
    assert_eq!(err, TreeError::NonSplitPrune);
}

#[test]
fn test_predict_output_uses_leaf_membership() {
    let tree = grown_tree();
    let predictions = tree.predict_output(4);

    assert_eq!(predictions[0], -1.0);
    assert_eq!(predictions[1], -1.0);
    assert_eq!(predictions[2], 1.0);
    assert_eq!(predictions[3], 1.0);
}

#[test]
fn test_out_of_sample_predict_routes_by_threshold() {
    let tree = grown_tree();

    assert_eq!(tree.out_of_sample_predict(&[1.0]), -1.0);
    assert_eq!(tree.out_of_sample_predict(&[2.0]), -1.0); // <= goes left
    assert_eq!(tree.out_of_sample_predict(&[3.0]), 1.0);
    // NaN fails the comparison and routes right
    assert_eq!(tree.out_of_sample_predict(&[f64::NAN]), 1.0);
}

#[test]
fn test_is_prunable_split_only_for_leaf_children() {
    let mut tree = grown_tree();
    assert!(tree.is_prunable_split(0));
    assert!(!tree.is_prunable_split(1));

    // Grow the left child; the root is no longer prunable
    tree.grow(
        SplitNode {
            index: 1,
            idx_split_variable: 0,
            split_value: 1.0,
            idx_data_points: vec![0, 1],
        },
        LeafNode {
            index: 3,
            value: 0.0,
            idx_data_points: vec![0],
        },
        LeafNode {
            index: 4,
            value: 0.0,
            idx_data_points: vec![1],
        },
    )
    .unwrap();

    assert!(!tree.is_prunable_split(0));
    assert!(tree.is_prunable_split(1));
}
