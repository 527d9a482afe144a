//! Leaf-value and sigma posterior models.
//!
//! Two strategies compute the value drawn for a (new) leaf from the
//! backfitting residuals of the rows routed to it:
//!
//! - `NormalPosterior`: the within-leaf residual mean plus Gaussian
//!   noise scaled by the within-leaf sample variance. No prior
//!   shrinkage.
//! - `ConjugatePosterior`: a conjugate normal mean / inverse-gamma
//!   variance update, with the leaf mean prior centered at zero and
//!   `prior_sigma_mu = half_range / (k * sqrt(m))`. The conjugate
//!   variant also owns the noise variance estimate and its posterior
//!   draw.
//!
//! The variants are held behind the `LeafPosterior` enum and selected
//! at engine construction.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::params::ConjugateParams;
use crate::sampler::NormalSampler;

/// Holds the leaf-value posterior strategies as enum variants.
#[derive(Debug)]
pub enum LeafPosterior {
    /// Plain-normal strategy.
    Normal(NormalPosterior),
    /// Conjugate normal/inverse-gamma strategy.
    Conjugate(ConjugatePosterior),
}

trait LeafValueStrategy {
    fn draw(&self, node_responses: &[f64], m: usize, normal: &mut NormalSampler) -> f64;
}

impl LeafPosterior {
    /// Draws a leaf value from the active strategy.
    ///
    /// `node_responses` are the backfitting residuals of the rows
    /// routed to the leaf; `m` is the forest size.
    pub fn draw_leaf_value(
        &self,
        node_responses: &[f64],
        m: usize,
        normal: &mut NormalSampler,
    ) -> f64 {
        match self {
            LeafPosterior::Normal(strategy) => strategy.draw(node_responses, m, normal),
            LeafPosterior::Conjugate(strategy) => strategy.draw(node_responses, m, normal),
        }
    }

    /// Draws a new noise standard deviation from its posterior and
    /// records it as the current estimate.
    ///
    /// # Panics
    ///
    /// The plain-normal strategy defines no sigma posterior; calling
    /// this on it is a programming error and panics.
    pub fn draw_sigma(
        &mut self,
        Y_transformed: &Array1<f64>,
        sum_trees_output: &Array1<f64>,
        rng: &mut StdRng,
    ) -> f64 {
        match self {
            LeafPosterior::Normal(_) => {
                panic!("the plain-normal leaf posterior does not define a sigma draw")
            }
            LeafPosterior::Conjugate(strategy) => {
                strategy.draw_sigma(Y_transformed, sum_trees_output, rng)
            }
        }
    }

    /// Current noise standard deviation, if the active strategy tracks one.
    pub fn current_sigma(&self) -> Option<f64> {
        match self {
            LeafPosterior::Normal(_) => None,
            LeafPosterior::Conjugate(strategy) => Some(strategy.current_sigma),
        }
    }
}

/// Leaf value is the within-leaf residual mean plus noise scaled by the
/// within-leaf variance.
#[derive(Debug)]
pub struct NormalPosterior;

impl LeafValueStrategy for NormalPosterior {
    fn draw(&self, node_responses: &[f64], _m: usize, normal: &mut NormalSampler) -> f64 {
        let n = node_responses.len() as f64;
        let mean = node_responses.iter().sum::<f64>() / n;
        // Population variance. A single-observation leaf has zero
        // variance and yields a zero-width posterior, which is valid.
        let variance = node_responses
            .iter()
            .map(|r| (r - mean) * (r - mean))
            .sum::<f64>()
            / n;

        mean + normal.sample() * variance.sqrt()
    }
}

/// Conjugate normal mean / inverse-gamma variance update for leaf
/// values, plus the noise-variance posterior.
#[derive(Debug)]
pub struct ConjugatePosterior {
    /// Degrees of freedom of the sigma prior.
    pub prior_nu: f64,
    /// Prior tail probability used to calibrate `prior_lambda`.
    pub prior_q: f64,
    /// Shrinkage factor of the leaf mean prior.
    pub prior_k: f64,
    /// Scale of the sigma prior, calibrated at construction so the
    /// unconditional variance has only a `q` chance of exceeding the
    /// naive overestimate.
    pub prior_lambda: f64,
    /// Standard deviation of the leaf mean prior.
    pub prior_sigma_mu: f64,
    /// Current noise standard deviation estimate.
    pub current_sigma: f64,
}

impl ConjugatePosterior {
    /// Builds the conjugate strategy from validated hyperparameters.
    ///
    /// `overestimated_sigma` is the standard deviation of the
    /// transformed response, a deliberate overestimate of the noise.
    pub fn new(
        params: &ConjugateParams,
        half_range: f64,
        m: usize,
        overestimated_sigma: f64,
    ) -> Self {
        Self {
            prior_nu: params.nu,
            prior_q: params.q,
            prior_k: params.k,
            prior_lambda: scaled_inverse_chi_square_lambda(overestimated_sigma, params.q, params.nu),
            prior_sigma_mu: half_range / (params.k * (m as f64).sqrt()),
            current_sigma: 1.0,
        }
    }

    fn draw_sigma(
        &mut self,
        Y_transformed: &Array1<f64>,
        sum_trees_output: &Array1<f64>,
        rng: &mut StdRng,
    ) -> f64 {
        let num_observations = Y_transformed.len() as f64;
        let posterior_alpha = self.prior_nu + num_observations / 2.0;
        let quadratic_error = (Y_transformed - sum_trees_output).mapv(|d| d * d).sum();
        let posterior_beta = self.prior_lambda + 0.5 * quadratic_error;

        // Inverse-gamma draw for the variance via a gamma-distributed
        // precision. posterior_alpha > 0 and posterior_beta > 0, so the
        // draw is strictly positive.
        let gamma = Gamma::new(posterior_alpha, 1.0 / posterior_beta).unwrap();
        let draw = gamma.sample(rng).powf(-0.5);

        self.current_sigma = draw;
        draw
    }
}

impl LeafValueStrategy for ConjugatePosterior {
    fn draw(&self, node_responses: &[f64], m: usize, normal: &mut NormalSampler) -> f64 {
        let num_observations = node_responses.len() as f64;
        let likelihood_mean = node_responses.iter().sum::<f64>() / num_observations;

        let prior_var = self.prior_sigma_mu * self.prior_sigma_mu;
        let likelihood_var = (self.current_sigma * self.current_sigma) / num_observations;
        let posterior_variance = 1.0 / (1.0 / prior_var + 1.0 / likelihood_var);
        let posterior_mean = likelihood_mean * (prior_var / (likelihood_var + prior_var));

        // The draw stdev divides by m: the m trees jointly explain Y,
        // so each tree's leaf variance shrinks with the ensemble size.
        posterior_mean + normal.sample() * (posterior_variance / m as f64).sqrt()
    }
}

/// Scale of the sigma prior, following the bartMachine calibration:
/// `chi2_quantile(1 - q, nu) / nu * overestimated_sigma`.
pub fn scaled_inverse_chi_square_lambda(overestimated_sigma: f64, q: f64, nu: f64) -> f64 {
    let chi_squared = ChiSquared::new(nu).unwrap();
    chi_squared.inverse_cdf(1.0 - q) / nu * overestimated_sigma
}
