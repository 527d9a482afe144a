//   Copyright 2024 The PyMC Developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.
#![warn(missing_docs)]
#![allow(non_snake_case)]

//! gp_bart implements the tree-mutation core of Bayesian Additive
//! Regression Trees (BART). BART is a non-parametric method to
//! approximate functions based on the sum of many shallow trees, where
//! priors regularize inference by restricting each tree's learning
//! capacity so that no individual tree is able to explain the data,
//! but rather the sum of trees.
//!
//! This crate provides the primitives consumed by an outer Markov-chain
//! driver: index-addressed binary trees with grow/prune mutation,
//! predictor and splitting-rule enumeration under missing values,
//! backfitting residual accounting over a running sum of tree outputs,
//! and two leaf-value posterior models (plain-normal and conjugate
//! normal/inverse-gamma). The driver itself, which selects nodes and
//! records chain samples, is a caller-level concern.

pub mod engine;
pub mod model;
pub mod params;
pub mod posterior;
pub mod sampler;
pub mod tree;
