//! Constructor parameters and their construction-time validation.
//!
//! Every parameter is range-checked before any sampling state is
//! built: the first violated rule fails construction and nothing is
//! partially allocated.

use std::str::FromStr;

use thiserror::Error;

/// Policy the outer Markov-chain driver uses to propose tree mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSampler {
    /// Propose grow and prune moves on single nodes.
    GrowPrune,
    /// Particle Gibbs moves over whole trees.
    ParticleGibbs,
}

impl FromStr for TreeSampler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "growprune" => Ok(TreeSampler::GrowPrune),
            "particlegibbs" => Ok(TreeSampler::ParticleGibbs),
            _ => Err(format!("{} is not a valid tree sampler", s)),
        }
    }
}

/// Response rescaling mode. The response is min-max rescaled to the
/// symmetric interval `[-half_range, half_range]` before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Rescale to half the observed range of Y.
    None,
    /// Rescale to `[-0.5, 0.5]`.
    Regression,
    /// Rescale to `[-3.0, 3.0]`.
    Classification,
}

impl FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Transform::None),
            "regression" => Ok(Transform::Regression),
            "classification" => Ok(Transform::Classification),
            _ => Err(format!("{} is not a valid transformation for Y", s)),
        }
    }
}

/// Errors raised synchronously at engine construction, one per first
/// violated rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    /// Engine construction requires an active model context.
    #[error("no model on the context stack, which is needed to instantiate BART; construct the engine inside an active ModelContext")]
    NoModelContext,
    /// X and Y row counts differ.
    #[error("the design matrix X and the response vector Y must have the same number of rows")]
    DimensionMismatch,
    /// The design matrix has no observations.
    #[error("the design matrix X must contain at least one observation")]
    EmptyData,
    /// m must be a positive integer.
    #[error("the number of trees m must be greater than zero")]
    InvalidM,
    /// alpha must lie in (0, 1).
    #[error("the alpha parameter for the tree structure must be in the interval (0, 1)")]
    InvalidAlpha,
    /// beta must be non-negative.
    #[error("the beta parameter for the tree structure must be in the interval [0, inf)")]
    InvalidBeta,
    /// Sampler caches of size zero would refill forever.
    #[error("the sampler cache_size must be greater than zero")]
    InvalidCacheSize,
    /// Chipman et al. discourage nu below 3.
    #[error("the nu parameter for the sigma prior must be at least 3.0")]
    InvalidNu,
    /// q must lie in (0, 1).
    #[error("the q parameter for the sigma prior must be in the interval (0, 1)")]
    InvalidQ,
    /// k must be positive.
    #[error("the k parameter for the leaf mean prior must be in the interval (0, inf)")]
    InvalidK,
}

/// Parameters shared by both engine variants.
#[derive(Debug, Clone)]
pub struct BartParams {
    /// Number of trees in the forest.
    pub m: usize,
    /// Depth prior base, in (0, 1). Consumed by the outer driver's
    /// grow-probability policy, not enforced inside grow/prune.
    pub alpha: f64,
    /// Depth prior exponent, in [0, inf). Consumed by the outer driver.
    pub beta: f64,
    /// Mutation policy of the outer driver.
    pub tree_sampler: TreeSampler,
    /// Response rescaling mode.
    pub transform: Transform,
    /// Bulk refill size of the buffered samplers.
    pub cache_size: usize,
    /// Seed for the engine-owned random state. `None` seeds from
    /// entropy; a fixed value makes every draw reproducible.
    pub seed: Option<u64>,
}

impl Default for BartParams {
    fn default() -> Self {
        Self {
            m: 200,
            alpha: 0.95,
            beta: 2.0,
            tree_sampler: TreeSampler::GrowPrune,
            transform: Transform::None,
            cache_size: 5000,
            seed: None,
        }
    }
}

impl BartParams {
    /// Checks every rule, returning the first violation.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.m < 1 {
            return Err(ParamsError::InvalidM);
        }
        if self.alpha <= 0.0 || 1.0 <= self.alpha {
            return Err(ParamsError::InvalidAlpha);
        }
        if !(self.beta >= 0.0) {
            return Err(ParamsError::InvalidBeta);
        }
        if self.cache_size == 0 {
            return Err(ParamsError::InvalidCacheSize);
        }
        Ok(())
    }
}

/// Hyperparameters of the conjugate normal/inverse-gamma variant.
#[derive(Debug, Clone)]
pub struct ConjugateParams {
    /// Degrees of freedom of the sigma prior.
    pub nu: f64,
    /// Prior probability that the error variance exceeds the naive
    /// overestimate, in (0, 1).
    pub q: f64,
    /// Shrinkage factor of the leaf mean prior.
    pub k: f64,
}

impl Default for ConjugateParams {
    fn default() -> Self {
        Self {
            nu: 3.0,
            q: 0.9,
            k: 2.0,
        }
    }
}

impl ConjugateParams {
    /// Checks every rule, returning the first violation.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.nu >= 3.0) {
            return Err(ParamsError::InvalidNu);
        }
        if self.q <= 0.0 || 1.0 <= self.q {
            return Err(ParamsError::InvalidQ);
        }
        if !(self.k > 0.0) {
            return Err(ParamsError::InvalidK);
        }
        Ok(())
    }
}
