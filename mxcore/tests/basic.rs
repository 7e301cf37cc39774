use mxcore::implied::{CrossTwin, causal_sandwich, twin_covariance};
use mxcore::linalg::{LinalgError, inv_sqrt_diag, inverse};
use mxcore::stats::likelihood_ratio_p;
use mxcore::{
    ConfidenceInterval, Constraint, FitOptions, FitSummary, ModelKind, MxMatrix, MxModel,
    ParameterAddress, SemEngine, Zygosity,
};
use ndarray::{Array2, array};

/// An engine that only knows how to fit; everything else is the default.
struct FixedEngine;

impl SemEngine for FixedEngine {
    fn fit(&self, model: &MxModel, _options: &FitOptions) -> anyhow::Result<MxModel> {
        let ep = model.free_count();
        let mut fitted = model.clone().with_fit(FitSummary {
            minus2ll: 812.0,
            estimated_parameters: ep,
            degrees_of_freedom: 400 - ep as i64,
            aic: 812.0 + 2.0 * ep as f64,
        });
        fitted.intervals.insert(
            "a_r1c1".to_string(),
            ConfidenceInterval {
                lower: 0.41,
                estimate: 0.6,
                upper: 0.72,
            },
        );
        Ok(fitted)
    }
}

fn ace_model() -> MxModel {
    MxModel::new("ACE", ModelKind::Ace)
        .with_matrix(MxMatrix::lower("a", array![[0.6, 0.0], [0.2, 0.5]]))
        .with_matrix(MxMatrix::lower("c", array![[0.3, 0.0], [0.1, 0.2]]))
        .with_matrix(MxMatrix::lower("e", array![[0.5, 0.0], [0.1, 0.4]]))
        .with_matrix(MxMatrix::labelled_scalar("dzCr", "dzCr", 1.0))
}

#[test]
fn lower_matrix_labels_and_addresses() {
    let model = ace_model();
    let a = model.matrix("a").expect("a");
    assert_eq!(a.label_at(1, 0), Some("a_r2c1"));
    assert_eq!(a.label_at(0, 1), None);
    assert_eq!(
        a.free_addresses(),
        vec![
            ParameterAddress::new("a", 0, 0),
            ParameterAddress::new("a", 1, 0),
            ParameterAddress::new("a", 1, 1),
        ]
    );
    assert_eq!(model.free_count(), 9);
    assert_eq!(ParameterAddress::new("a", 1, 0).to_string(), "a[2,1]");
}

#[test]
fn modified_returns_unfitted_copy() {
    let base = ace_model();
    let drop = base
        .modified(&[Constraint::fix(ParameterAddress::new("c", 1, 1), 0.0)], "drop_c22")
        .expect("modify");
    assert_eq!(drop.name, "drop_c22");
    assert!(!drop.is_free(&ParameterAddress::new("c", 1, 1)).unwrap());
    assert_eq!(drop.value_at(&ParameterAddress::new("c", 1, 1)).unwrap(), 0.0);
    assert!(base.is_free(&ParameterAddress::new("c", 1, 1)).unwrap());
    assert_eq!(drop.free_count(), base.free_count() - 1);

    let ade = base
        .modified(&[Constraint::fix_label("dzCr", 0.25)], "ADE")
        .expect("modify by label");
    assert_eq!(ade.values("dzCr").unwrap()[(0, 0)], 0.25);

    let missing = base.modified(&[Constraint::fix_label("nope", 0.0)], "x");
    assert!(missing.is_err());
}

#[test]
fn twin_covariance_univariate() {
    let a = array![[0.6]];
    let c = array![[0.3]];
    let e = array![[0.5]];
    let mz = twin_covariance(&a, &c, &e, CrossTwin::for_zygosity(Zygosity::Mz, 0.5, 1.0));
    let dz = twin_covariance(&a, &c, &e, CrossTwin::for_zygosity(Zygosity::Dz, 0.5, 1.0));
    assert!((mz[(0, 0)] - 0.70).abs() < 1e-12);
    assert!((mz[(0, 1)] - 0.45).abs() < 1e-12);
    assert!((dz[(0, 1)] - (0.18 + 0.09)).abs() < 1e-12);
    assert!((dz[(1, 1)] - 0.70).abs() < 1e-12);
}

#[test]
fn causal_sandwich_identity_beta_is_noop() {
    let sigma = array![
        [1.0, 0.2, 0.5, 0.1],
        [0.2, 1.0, 0.1, 0.4],
        [0.5, 0.1, 1.0, 0.2],
        [0.1, 0.4, 0.2, 1.0]
    ];
    let beta = Array2::<f64>::zeros((2, 2));
    let out = causal_sandwich(&beta, &sigma).expect("sandwich");
    for (x, y) in out.iter().zip(sigma.iter()) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[test]
fn causal_sandwich_rejects_degenerate_loop() {
    let beta = array![[0.0, 2.0], [0.5, 0.0]];
    let sigma = Array2::<f64>::eye(4);
    let err = causal_sandwich(&beta, &sigma).unwrap_err();
    assert!(matches!(err, LinalgError::Singular { .. }));
}

#[test]
fn inverse_and_scaling() {
    let m = array![[4.0, 1.0], [1.0, 3.0]];
    let inv = inverse(&m, "m").expect("inverse");
    let prod = m.dot(&inv);
    assert!((prod[(0, 0)] - 1.0).abs() < 1e-12);
    assert!(prod[(0, 1)].abs() < 1e-12);

    let sd = inv_sqrt_diag(&m, "m").expect("scale");
    assert!((sd[(0, 0)] - 0.5).abs() < 1e-12);

    let zero = array![[1.0, 0.0], [0.0, 0.0]];
    assert!(matches!(
        inv_sqrt_diag(&zero, "zero"),
        Err(LinalgError::NonPositiveDiagonal { index: 1, .. })
    ));
}

#[test]
fn likelihood_ratio_p_three_df() {
    let p = likelihood_ratio_p(351.65 - 333.08, 3);
    assert!(p > 0.0003 && p < 0.0004, "p = {p}");
    assert!(likelihood_ratio_p(1.0, 0).is_nan());
}

#[test]
fn engine_defaults_read_the_fitted_model() {
    let engine = FixedEngine;
    let model = ace_model();
    assert!(engine.confidence_intervals(&model).is_empty());
    assert_eq!(engine.aic(&model), None);

    let fitted = engine.fit(&model, &FitOptions::default()).expect("fit");
    assert!(!model.is_fitted());
    let intervals = engine.confidence_intervals(&fitted);
    assert_eq!(intervals.len(), 1);
    let a11 = intervals["a_r1c1"];
    assert!(a11.lower < a11.estimate && a11.estimate < a11.upper);

    let a = engine.parameter_matrix(&fitted, "a").expect("a");
    assert_eq!(a.label_at(1, 0), Some("a_r2c1"));
    assert_eq!(a.values, array![[0.6, 0.0], [0.2, 0.5]]);
    assert!(engine.parameter_matrix(&fitted, "missing").is_err());

    assert_eq!(engine.log_likelihood(&fitted), Some(-406.0));
    assert_eq!(engine.degrees_of_freedom(&fitted), Some(391));
    assert_eq!(engine.aic(&fitted), Some(830.0));

    let dropped = engine
        .modify(&fitted, &[Constraint::fix(ParameterAddress::new("c", 1, 1), 0.0)], "drop_c22")
        .unwrap();
    assert!(engine.confidence_intervals(&dropped).is_empty());
}
