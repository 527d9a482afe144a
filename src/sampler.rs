//! Buffered random samplers backing all randomness in the engine.
//!
//! Drawing one value at a time from a distribution object is
//! comparatively expensive, so both samplers amortize generation by
//! drawing `cache_size` values in bulk and serving single values from
//! the shrinking buffer, refilling only on exhaustion.
//!
//! Each engine owns its samplers and seeds them explicitly, so results
//! are reproducible under a supplied seed. The samplers are not
//! process-wide singletons and carry no concurrency guard.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};

/// Serves draws from the standard normal distribution out of a bulk
/// refilled buffer.
#[derive(Debug)]
pub struct NormalSampler {
    dist: Normal<f64>,
    rng: StdRng,
    cache: Vec<f64>,
    cache_size: usize,
    refills: usize,
}

impl NormalSampler {
    /// Creates a sampler that refills `cache_size` draws at a time.
    ///
    /// `cache_size` must be positive; parameter validation rejects zero
    /// before an engine is built.
    pub fn new(cache_size: usize, rng: StdRng) -> Self {
        Self {
            dist: Normal::new(0.0, 1.0).unwrap(),
            rng,
            cache: Vec::with_capacity(cache_size),
            cache_size,
            refills: 0,
        }
    }

    /// Returns one draw from N(0, 1), consuming it from the buffer.
    pub fn sample(&mut self) -> f64 {
        if self.cache.is_empty() {
            self.refresh_cache();
        }
        self.cache.pop().unwrap()
    }

    fn refresh_cache(&mut self) {
        self.cache
            .extend((0..self.cache_size).map(|_| self.dist.sample(&mut self.rng)));
        self.refills += 1;
    }

    /// Number of bulk refills performed so far. Total draws consumed
    /// from the underlying distribution is `refill_count() * cache_size`.
    pub fn refill_count(&self) -> usize {
        self.refills
    }
}

/// Serves integer draws uniform over a half-open interval `[lower, upper)`.
///
/// The buffer caches base uniforms u in `[0, 1)` rather than finished
/// integers, so one refill serves any sequence of `(lower, upper)`
/// pairs: each call computes `floor(lower + (upper - lower) * u)`.
#[derive(Debug)]
pub struct DiscreteUniformSampler {
    dist: Uniform<f64>,
    rng: StdRng,
    cache: Vec<f64>,
    cache_size: usize,
    refills: usize,
}

impl DiscreteUniformSampler {
    /// Creates a sampler that refills `cache_size` base uniforms at a time.
    pub fn new(cache_size: usize, rng: StdRng) -> Self {
        Self {
            dist: Uniform::new(0.0, 1.0),
            rng,
            cache: Vec::with_capacity(cache_size),
            cache_size,
            refills: 0,
        }
    }

    /// Returns one integer uniform over `[lower, upper)`, consuming one
    /// cached base uniform.
    pub fn sample(&mut self, lower: usize, upper: usize) -> usize {
        if self.cache.is_empty() {
            self.refresh_cache();
        }
        let u = self.cache.pop().unwrap();
        (lower as f64 + (upper - lower) as f64 * u) as usize
    }

    fn refresh_cache(&mut self) {
        self.cache
            .extend((0..self.cache_size).map(|_| self.dist.sample(&mut self.rng)));
        self.refills += 1;
    }

    /// Number of bulk refills performed so far.
    pub fn refill_count(&self) -> usize {
        self.refills
    }
}
