//! The BART engine: forest state, residual accounting and the
//! grow/prune mutation operations.
//!
//! The engine owns the observation data, the transformed response, the
//! forest of `m` trees and the running sum of per-tree predictions
//! (`sum_trees_output`). The diff trick from Kapelner & Bleich's
//! bartMachine keeps residual computation at O(N) per tree: when the
//! residual target for tree `j` is needed, tree `j`'s own contribution
//! is subtracted from the maintained running sum instead of re-summing
//! the whole forest.
//!
//! Node selection, move acceptance and sample recording belong to the
//! outer Markov-chain driver, which consumes these primitives.

use log::debug;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::ModelContext;
use crate::params::{BartParams, ConjugateParams, ParamsError, Transform, TreeSampler};
use crate::posterior::{ConjugatePosterior, LeafPosterior, NormalPosterior};
use crate::sampler::{DiscreteUniformSampler, NormalSampler};
use crate::tree::{LeafNode, Node, SplitNode, Tree, TreeError};

/// Owns a BART forest and the state needed to mutate it.
#[derive(Debug)]
pub struct BartEngine {
    X: Array2<f64>,
    Y: Array1<f64>,
    Y_transformed: Array1<f64>,
    num_observations: usize,
    num_variates: usize,
    y_min: f64,
    y_max: f64,
    half_range: f64,
    m: usize,
    prior_alpha: f64,
    prior_beta: f64,
    tree_sampler: TreeSampler,
    transform: Transform,
    trees: Vec<Tree>,
    sum_trees_output: Array1<f64>,
    posterior: LeafPosterior,
    normal_sampler: NormalSampler,
    uniform_sampler: DiscreteUniformSampler,
    rng: StdRng,
}

impl BartEngine {
    /// Builds an engine with the plain-normal leaf posterior.
    ///
    /// Requires an active [`ModelContext`]; every parameter is
    /// validated before any sampling state is allocated.
    pub fn new(X: Array2<f64>, Y: Array1<f64>, params: BartParams) -> Result<Self, ParamsError> {
        Self::build(X, Y, params, None)
    }

    /// Builds an engine with the conjugate normal/inverse-gamma leaf
    /// posterior.
    pub fn new_conjugate(
        X: Array2<f64>,
        Y: Array1<f64>,
        params: BartParams,
        conjugate: ConjugateParams,
    ) -> Result<Self, ParamsError> {
        Self::build(X, Y, params, Some(conjugate))
    }

    fn build(
        X: Array2<f64>,
        Y: Array1<f64>,
        params: BartParams,
        conjugate: Option<ConjugateParams>,
    ) -> Result<Self, ParamsError> {
        if !ModelContext::is_active() {
            return Err(ParamsError::NoModelContext);
        }
        if X.nrows() != Y.len() {
            return Err(ParamsError::DimensionMismatch);
        }
        if X.nrows() == 0 {
            return Err(ParamsError::EmptyData);
        }
        params.validate()?;
        if let Some(conjugate) = &conjugate {
            conjugate.validate()?;
        }

        let num_observations = X.nrows();
        let num_variates = X.ncols();

        let y_min = Y.fold(f64::INFINITY, |acc, &y| acc.min(y));
        let y_max = Y.fold(f64::NEG_INFINITY, |acc, &y| acc.max(y));
        let half_range = match params.transform {
            Transform::Regression => 0.5,
            Transform::Classification => 3.0,
            Transform::None => (y_max - y_min) / 2.0,
        };

        let Y_transformed = transform_response(&Y, y_min, y_max, half_range);
        let overestimated_sigma = Y_transformed.std(0.0);

        let posterior = match &conjugate {
            Some(conjugate) => LeafPosterior::Conjugate(ConjugatePosterior::new(
                conjugate,
                half_range,
                params.m,
                overestimated_sigma,
            )),
            None => LeafPosterior::Normal(NormalPosterior),
        };

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let normal_sampler = NormalSampler::new(params.cache_size, StdRng::seed_from_u64(rng.gen()));
        let uniform_sampler =
            DiscreteUniformSampler::new(params.cache_size, StdRng::seed_from_u64(rng.gen()));

        let initial_leaf_value = Y_transformed.mean().unwrap() / params.m as f64;
        let trees = (0..params.m)
            .map(|_| Tree::new(initial_leaf_value, (0..num_observations).collect()))
            .collect();

        // The forest starts as m copies of mean / m, so the running sum
        // starts at the mean of the transformed response.
        let sum_trees_output =
            Array1::from_elem(num_observations, Y_transformed.mean().unwrap());

        debug!(
            "initialized BART engine: m={}, N={}, P={}",
            params.m, num_observations, num_variates
        );

        Ok(Self {
            X,
            Y,
            Y_transformed,
            num_observations,
            num_variates,
            y_min,
            y_max,
            half_range,
            m: params.m,
            prior_alpha: params.alpha,
            prior_beta: params.beta,
            tree_sampler: params.tree_sampler,
            transform: params.transform,
            trees,
            sum_trees_output,
            posterior,
            normal_sampler,
            uniform_sampler,
            rng,
        })
    }

    /// Min-max rescales a response vector to
    /// `[-half_range, half_range]` using the raw Y's observed min/max.
    pub fn transform_y(&self, Y: &Array1<f64>) -> Array1<f64> {
        transform_response(Y, self.y_min, self.y_max, self.half_range)
    }

    /// Exactly inverts [`transform_y`](Self::transform_y).
    pub fn un_transform_y(&self, Y: &Array1<f64>) -> Array1<f64> {
        Y.mapv(|y| self.un_transform_value(y))
    }

    /// Exactly inverts the response transform for a single value.
    pub fn un_transform_value(&self, value: f64) -> f64 {
        let range = self.y_max - self.y_min;
        if range == 0.0 {
            // Constant response: the transform collapsed everything to 0.
            return self.y_min;
        }
        (value + self.half_range) * range / (2.0 * self.half_range) + self.y_min
    }

    /// Columns of X usable to split the given rows: column `j` is
    /// included iff, after dropping NaNs, at least two distinct finite
    /// values remain. Column order is preserved.
    pub fn available_predictors(&self, idx_data_points: &[usize]) -> Vec<usize> {
        let mut predictors = Vec::new();
        for j in 0..self.num_variates {
            let x_j: Vec<f64> = idx_data_points
                .iter()
                .map(|&i| self.X[[i, j]])
                .filter(|x| !x.is_nan())
                .collect();
            if x_j.windows(2).any(|pair| pair[0] != pair[1]) {
                predictors.push(j);
            }
        }
        predictors
    }

    /// Candidate thresholds for splitting the given rows on column
    /// `idx_split_variable`: the sorted distinct finite values of the
    /// column restricted to those rows, with the maximum excluded
    /// (choosing it would leave the right child empty). Also returns
    /// each value's first-occurrence position in the NaN-filtered
    /// column slice.
    pub fn available_splitting_rules(
        &self,
        idx_data_points: &[usize],
        idx_split_variable: usize,
    ) -> (Vec<f64>, Vec<usize>) {
        let x_j: Vec<f64> = idx_data_points
            .iter()
            .map(|&i| self.X[[i, idx_split_variable]])
            .filter(|x| !x.is_nan())
            .collect();

        let mut order: Vec<usize> = (0..x_j.len()).collect();
        order.sort_by(|&a, &b| x_j[a].partial_cmp(&x_j[b]).unwrap().then(a.cmp(&b)));

        let mut values: Vec<f64> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();
        for &pos in &order {
            if values.last() != Some(&x_j[pos]) {
                values.push(x_j[pos]);
                indices.push(pos);
            }
        }

        values.pop();
        indices.pop();

        (values, indices)
    }

    /// Grows tree `tree_id` at the leaf `index_leaf_node`: picks a
    /// predictor and threshold uniformly among the available ones,
    /// partitions the leaf's rows, draws fresh child leaf values from
    /// the active posterior and performs the structural edit.
    ///
    /// Returns `Ok(false)` without mutating anything when the leaf has
    /// no available predictors; the caller picks a different node or
    /// accepts a stalled iteration.
    pub fn grow_tree(&mut self, tree_id: usize, index_leaf_node: usize) -> Result<bool, TreeError> {
        let current_node = self.trees[tree_id].get_node(index_leaf_node)?;
        let idx_data_points = match current_node {
            Node::Leaf(leaf) => leaf.idx_data_points.clone(),
            Node::Split(_) => return Err(TreeError::NonLeafGrow),
        };

        let available_predictors = self.available_predictors(&idx_data_points);
        if available_predictors.is_empty() {
            debug!(
                "tree {}: leaf {} has no available predictors, grow failed",
                tree_id, index_leaf_node
            );
            return Ok(false);
        }

        let selected_predictor =
            available_predictors[self.uniform_sampler.sample(0, available_predictors.len())];

        let (splitting_rules, _) =
            self.available_splitting_rules(&idx_data_points, selected_predictor);
        let selected_splitting_rule =
            splitting_rules[self.uniform_sampler.sample(0, splitting_rules.len())];

        let (left_idx_data_points, right_idx_data_points) =
            self.partition_data_points(&idx_data_points, selected_predictor, selected_splitting_rule);

        let residuals = self.residuals(tree_id);
        let left_value = self.draw_leaf_value(&residuals, &left_idx_data_points);
        let right_value = self.draw_leaf_value(&residuals, &right_idx_data_points);

        let new_split_node = SplitNode {
            index: index_leaf_node,
            idx_split_variable: selected_predictor,
            split_value: selected_splitting_rule,
            idx_data_points,
        };
        let new_left_node = LeafNode {
            index: index_leaf_node * 2 + 1,
            value: left_value,
            idx_data_points: left_idx_data_points,
        };
        let new_right_node = LeafNode {
            index: index_leaf_node * 2 + 2,
            value: right_value,
            idx_data_points: right_idx_data_points,
        };

        self.trees[tree_id].grow(new_split_node, new_left_node, new_right_node)?;
        Ok(true)
    }

    /// Prunes tree `tree_id` at the split `index_split_node`, replacing
    /// it and its two leaf children with a single leaf carrying all the
    /// split's rows and a fresh posterior draw.
    ///
    /// The caller checks prunability (both children leaves, see
    /// [`Tree::is_prunable_split`]); given that precondition the
    /// operation always succeeds.
    pub fn prune_tree(&mut self, tree_id: usize, index_split_node: usize) -> Result<(), TreeError> {
        let current_node = self.trees[tree_id].get_node(index_split_node)?;
        let idx_data_points = match current_node {
            Node::Split(split) => split.idx_data_points.clone(),
            Node::Leaf(_) => return Err(TreeError::NonSplitPrune),
        };

        let residuals = self.residuals(tree_id);
        let value = self.draw_leaf_value(&residuals, &idx_data_points);

        self.trees[tree_id].prune(LeafNode {
            index: index_split_node,
            value,
            idx_data_points,
        })
    }

    /// Splits rows by `x[idx_split_variable] <= split_value`. Rows with
    /// NaN in the predictor fail the comparison and route right; this
    /// is the single routing rule used everywhere in the crate.
    fn partition_data_points(
        &self,
        idx_data_points: &[usize],
        idx_split_variable: usize,
        split_value: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        idx_data_points
            .iter()
            .copied()
            .partition(|&i| self.X[[i, idx_split_variable]] <= split_value)
    }

    /// Backfitting residuals for tree `tree_id`: the running forest sum
    /// with this tree's own contribution subtracted out. This is the
    /// sole input to leaf-value posterior draws and must be recomputed
    /// after any other tree's contribution changes.
    pub fn residuals(&self, tree_id: usize) -> Array1<f64> {
        &self.sum_trees_output - &self.trees[tree_id].predict_output(self.num_observations)
    }

    fn draw_leaf_value(&mut self, residuals: &Array1<f64>, idx_data_points: &[usize]) -> f64 {
        let node_responses: Vec<f64> = idx_data_points.iter().map(|&i| residuals[i]).collect();
        self.posterior
            .draw_leaf_value(&node_responses, self.m, &mut self.normal_sampler)
    }

    /// Replaces one tree's contribution in the running forest sum. The
    /// outer driver calls this after accepting a mutation, passing the
    /// tree's output before and after the move.
    pub fn update_sum_trees(
        &mut self,
        old_tree_output: &Array1<f64>,
        new_tree_output: &Array1<f64>,
    ) {
        self.sum_trees_output = &self.sum_trees_output - old_tree_output + new_tree_output;
    }

    /// Draws a new noise standard deviation from its posterior and
    /// records it as the engine's current estimate.
    ///
    /// # Panics
    ///
    /// Panics when the engine was built with the plain-normal
    /// posterior, which defines no sigma draw.
    pub fn draw_sigma_from_posterior(&mut self) -> f64 {
        self.posterior
            .draw_sigma(&self.Y_transformed, &self.sum_trees_output, &mut self.rng)
    }

    /// Out-of-sample prediction for a new input row on the original Y
    /// scale: the sum of every tree's prediction, inverse-transformed.
    pub fn prediction_untransformed(&self, x: &[f64]) -> f64 {
        let sum_of_trees: f64 = self
            .trees
            .iter()
            .map(|tree| tree.out_of_sample_predict(x))
            .sum();
        self.un_transform_value(sum_of_trees)
    }

    /// Proportion of split nodes using each predictor across the
    /// current forest. Returns all zeros while every tree is still a
    /// single leaf.
    pub fn variable_inclusion(&self) -> Vec<f64> {
        let mut counts = vec![0usize; self.num_variates];
        for tree in &self.trees {
            for node in tree.nodes() {
                if let Node::Split(split) = node {
                    counts[split.idx_split_variable] += 1;
                }
            }
        }

        let total: usize = counts.iter().sum();
        if total == 0 {
            return vec![0.0; self.num_variates];
        }
        counts
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect()
    }

    /// The design matrix.
    pub fn X(&self) -> &Array2<f64> {
        &self.X
    }

    /// The raw response.
    pub fn Y(&self) -> &Array1<f64> {
        &self.Y
    }

    /// The rescaled response the forest is fit against.
    pub fn Y_transformed(&self) -> &Array1<f64> {
        &self.Y_transformed
    }

    /// The forest.
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// One tree of the forest.
    pub fn tree(&self, tree_id: usize) -> &Tree {
        &self.trees[tree_id]
    }

    /// The running sum of per-tree predictions.
    pub fn sum_trees_output(&self) -> &Array1<f64> {
        &self.sum_trees_output
    }

    /// Number of observations N.
    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    /// Number of predictor columns P.
    pub fn num_variates(&self) -> usize {
        self.num_variates
    }

    /// Forest size m.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Half the width of the symmetric transform target interval.
    pub fn half_range(&self) -> f64 {
        self.half_range
    }

    /// Depth prior base alpha, for the outer driver's grow policy.
    pub fn prior_alpha(&self) -> f64 {
        self.prior_alpha
    }

    /// Depth prior exponent beta, for the outer driver's grow policy.
    pub fn prior_beta(&self) -> f64 {
        self.prior_beta
    }

    /// Mutation policy of the outer driver.
    pub fn tree_sampler(&self) -> TreeSampler {
        self.tree_sampler
    }

    /// Response rescaling mode.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Current noise standard deviation, if the active posterior tracks
    /// one.
    pub fn current_sigma(&self) -> Option<f64> {
        self.posterior.current_sigma()
    }
}

fn transform_response(Y: &Array1<f64>, y_min: f64, y_max: f64, half_range: f64) -> Array1<f64> {
    let range = y_max - y_min;
    if range == 0.0 {
        return Array1::zeros(Y.len());
    }
    Y.mapv(|y| (y - y_min) / range * (2.0 * half_range) - half_range)
}
