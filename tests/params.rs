use std::str::FromStr;

use gp_bart::params::{BartParams, ConjugateParams, ParamsError, Transform, TreeSampler};

#[test]
fn test_defaults_are_valid() {
    assert_eq!(BartParams::default().validate(), Ok(()));
    assert_eq!(ConjugateParams::default().validate(), Ok(()));
}

#[test]
fn test_m_must_be_positive() {
    let params = BartParams {
        m: 0,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidM));
}

#[test]
fn test_alpha_open_interval() {
    for alpha in [0.0, 1.0, -0.2, 1.5] {
        let params = BartParams {
            alpha,
            ..BartParams::default()
        };
        assert_eq!(params.validate(), Err(ParamsError::InvalidAlpha));
    }

    let params = BartParams {
        alpha: 0.95,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Ok(()));
}

#[test]
fn test_beta_non_negative() {
    let params = BartParams {
        beta: -0.1,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidBeta));

    let params = BartParams {
        beta: 0.0,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Ok(()));
}

#[test]
fn test_cache_size_must_be_positive() {
    let params = BartParams {
        cache_size: 0,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidCacheSize));
}

#[test]
fn test_first_violation_wins() {
    let params = BartParams {
        m: 0,
        alpha: 2.0,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidM));
}

#[test]
fn test_conjugate_ranges() {
    let params = ConjugateParams {
        nu: 2.9,
        ..ConjugateParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidNu));

    let params = ConjugateParams {
        q: 1.0,
        ..ConjugateParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidQ));

    let params = ConjugateParams {
        k: 0.0,
        ..ConjugateParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidK));
}

#[test]
fn test_nan_hyperparameters_rejected() {
    let params = BartParams {
        beta: f64::NAN,
        ..BartParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidBeta));

    let params = ConjugateParams {
        nu: f64::NAN,
        ..ConjugateParams::default()
    };
    assert_eq!(params.validate(), Err(ParamsError::InvalidNu));
}

#[test]
fn test_tree_sampler_from_str() {
    assert_eq!(
        TreeSampler::from_str("GrowPrune").unwrap(),
        TreeSampler::GrowPrune
    );
    assert_eq!(
        TreeSampler::from_str("particlegibbs").unwrap(),
        TreeSampler::ParticleGibbs
    );
    assert!(TreeSampler::from_str("metropolis").is_err());
}

#[test]
fn test_transform_from_str() {
    assert_eq!(Transform::from_str("none").unwrap(), Transform::None);
    assert_eq!(
        Transform::from_str("Regression").unwrap(),
        Transform::Regression
    );
    assert_eq!(
        Transform::from_str("classification").unwrap(),
        Transform::Classification
    );
    assert!(Transform::from_str("logit").is_err());
}
