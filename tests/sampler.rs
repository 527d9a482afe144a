use rand::rngs::StdRng;
use rand::SeedableRng;

use gp_bart::sampler::{DiscreteUniformSampler, NormalSampler};

#[test]
fn test_normal_sampler_refills_in_bulk() {
    let mut sampler = NormalSampler::new(8, StdRng::seed_from_u64(7));
    assert_eq!(sampler.refill_count(), 0);

    // The first call triggers exactly one refill of cache_size draws,
    // which then serves cache_size consecutive calls.
    for _ in 0..8 {
        sampler.sample();
    }
    assert_eq!(sampler.refill_count(), 1);

    sampler.sample();
    assert_eq!(sampler.refill_count(), 2);

    for _ in 0..7 {
        sampler.sample();
    }
    assert_eq!(sampler.refill_count(), 2);
}

#[test]
fn test_normal_sampler_reproducible_under_seed() {
    let mut a = NormalSampler::new(16, StdRng::seed_from_u64(42));
    let mut b = NormalSampler::new(16, StdRng::seed_from_u64(42));

    for _ in 0..50 {
        assert_eq!(a.sample(), b.sample());
    }
}

#[test]
fn test_discrete_uniform_sampler_bounds() {
    let mut sampler = DiscreteUniformSampler::new(32, StdRng::seed_from_u64(3));

    for _ in 0..200 {
        let value = sampler.sample(0, 5);
        assert!(value < 5);
    }
    for _ in 0..200 {
        let value = sampler.sample(2, 7);
        assert!((2..7).contains(&value));
    }
}

#[test]
fn test_discrete_uniform_sampler_refill_accounting() {
    let mut sampler = DiscreteUniformSampler::new(10, StdRng::seed_from_u64(11));

    // One cached base uniform is consumed per call regardless of the
    // (lower, upper) pair.
    for i in 0..10 {
        sampler.sample(0, i + 1);
    }
    assert_eq!(sampler.refill_count(), 1);

    sampler.sample(0, 3);
    assert_eq!(sampler.refill_count(), 2);
}

#[test]
fn test_discrete_uniform_sampler_degenerate_interval() {
    let mut sampler = DiscreteUniformSampler::new(4, StdRng::seed_from_u64(0));

    for _ in 0..10 {
        assert_eq!(sampler.sample(3, 4), 3);
    }
}

#[test]
fn test_discrete_uniform_sampler_covers_interval() {
    let mut sampler = DiscreteUniformSampler::new(64, StdRng::seed_from_u64(99));
    let mut seen = [false; 4];

    for _ in 0..500 {
        seen[sampler.sample(0, 4)] = true;
    }
    assert!(seen.iter().all(|&hit| hit));
}
