mod common;

use common::{assert_close, twin_frame};
use mxcore::{ModelKind, Zygosity};
use ndarray::array;
use polars::df;
use twinsem::TwinSemError;
use twinsem::config::EngineConfig;
use twinsem::data::{column_variance, twin_column_names, validate_twin_data};
use twinsem::logging::init_tracing;
use twinsem::twin::{DZ_AR, DZ_CR, TwinSpec, build_ace, build_cp, build_gxe, build_ip, expected_covariance};

#[test]
fn twin_columns_are_twin_major() {
    let bases = vec!["x".to_string(), "y".to_string()];
    assert_eq!(twin_column_names(&bases, "_T"), vec!["x_T1", "y_T1", "x_T2", "y_T2"]);
}

#[test]
fn ace_builder_labels_and_settings() {
    let mz = twin_frame(&["x", "y"], "_T", 20, 0);
    let dz = twin_frame(&["x", "y"], "_T", 15, 3);
    let spec = TwinSpec::new("ACE", &["x", "y"], "_T", &mz, &dz);
    let model = build_ace(&spec).expect("build");

    assert_eq!(model.kind, ModelKind::Ace);
    assert_eq!(model.values(DZ_AR).unwrap()[(0, 0)], 0.5);
    assert_eq!(model.values(DZ_CR).unwrap()[(0, 0)], 1.0);
    assert_eq!(model.sample_size.map(|s| (s.mz, s.dz)), Some((20, 15)));
    assert_eq!(model.matrix("c").unwrap().label_at(1, 0), Some("c_r2c1"));

    let var = column_variance(&mz, "x_T1").unwrap();
    assert_close(model.values("a").unwrap()[(0, 0)], (var / 3.0).sqrt(), 1e-12);
    assert_eq!(model.values("a").unwrap()[(0, 1)], 0.0);

    let ade = build_ace(&spec.clone().with_dz_cr(0.25)).unwrap();
    assert_eq!(ade.values(DZ_CR).unwrap()[(0, 0)], 0.25);
}

#[test]
fn covariates_switch_the_kind_and_are_required() {
    let mz = twin_frame(&["x", "age"], "_T", 20, 0);
    let dz = twin_frame(&["x", "age"], "_T", 20, 1);
    let spec = TwinSpec::new("ACEcov", &["x"], "_T", &mz, &dz).with_covariates(&["age"]);
    let model = build_ace(&spec).unwrap();
    assert_eq!(model.kind, ModelKind::AceCov);
    assert!(model.manifests.contains(&"age_T2".to_string()));

    let missing = TwinSpec::new("ACEcov", &["x"], "_T", &mz, &dz).with_covariates(&["sex"]);
    assert!(matches!(build_ace(&missing), Err(TwinSemError::Configuration(_))));
}

#[test]
fn pathway_and_moderation_builders() {
    let mz = twin_frame(&["x", "y", "z", "m"], "_T", 20, 0);
    let dz = twin_frame(&["x", "y", "z", "m"], "_T", 20, 2);
    let spec = TwinSpec::new("CP", &["x", "y", "z"], "_T", &mz, &dz);

    let cp = build_cp(&spec, 1).unwrap();
    assert_eq!(cp.kind, ModelKind::Cp);
    assert_eq!(cp.matrix("cp_loadings").unwrap().dim(), (3, 1));
    // 3 factor paths, 3 loadings, 9 specifics
    assert_eq!(cp.free_count(), 15);
    assert!(build_cp(&spec, 0).is_err());

    let ip = build_ip(&spec, 2).unwrap();
    assert_eq!(ip.matrix("ai").unwrap().dim(), (3, 2));
    assert_eq!(ip.free_count(), 27);

    assert!(matches!(build_gxe(&spec, "m"), Err(TwinSemError::InvalidArgument(_))));
    let gxe = build_gxe(&TwinSpec::new("GxE", &["x"], "_T", &mz, &dz), "m").unwrap();
    assert_eq!(gxe.matrix("betaLin").unwrap().label_at(0, 0), Some("lin11"));
    assert_eq!(gxe.matrix("betaQuad").unwrap().label_at(0, 0), Some("quad11"));
}

#[test]
fn data_validation_happens_first() {
    let mz = twin_frame(&["x"], "_T", 20, 0);
    let empty = twin_frame(&["x"], "_T", 0, 0);
    let cols = twin_column_names(&["x".to_string()], "_T");
    assert!(matches!(
        validate_twin_data(&mz, &empty, &cols),
        Err(TwinSemError::Configuration(_))
    ));
    assert!(matches!(
        validate_twin_data(&mz, &mz, &[]),
        Err(TwinSemError::Configuration(_))
    ));

    let spec = TwinSpec::new("ACE", &["x", "y"], "_T", &mz, &mz);
    assert!(matches!(build_ace(&spec), Err(TwinSemError::Configuration(_))));
    let bad = TwinSpec::new("ACE", &["x"], "_T", &mz, &mz).with_dz_cr(1.5);
    assert!(matches!(build_ace(&bad), Err(TwinSemError::InvalidArgument(_))));
}

#[test]
fn ace_expected_covariance() {
    let mz = twin_frame(&["x"], "_T", 20, 0);
    let spec = TwinSpec::new("ACE", &["x"], "_T", &mz, &mz);
    let mut model = build_ace(&spec).unwrap();
    model.set_values("a", array![[0.6]]).unwrap();
    model.set_values("c", array![[0.3]]).unwrap();
    model.set_values("e", array![[0.5]]).unwrap();

    let mz_cov = expected_covariance(&model, Zygosity::Mz).unwrap();
    let dz_cov = expected_covariance(&model, Zygosity::Dz).unwrap();
    assert_close(mz_cov[(0, 0)], 0.70, 1e-12);
    assert_close(mz_cov[(0, 1)], 0.45, 1e-12);
    assert_close(dz_cov[(1, 0)], 0.27, 1e-12);

    let cp = build_cp(&spec, 1).unwrap();
    assert!(matches!(
        expected_covariance(&cp, Zygosity::Mz),
        Err(TwinSemError::Unsupported { .. })
    ));
}

#[test]
fn column_variance_skips_missing_values() {
    let df = df!(
        "x" => [Some(1.0), Some(2.0), None, Some(f64::NAN), Some(4.0)],
        "n" => [Some(3i32), Some(5), Some(7), None, Some(9)],
        "one" => [Some(1.0), None, None, Some(f64::NAN), None]
    )
    .unwrap();
    assert_close(column_variance(&df, "x").unwrap(), 7.0 / 3.0, 1e-12);
    assert_close(column_variance(&df, "n").unwrap(), 20.0 / 3.0, 1e-12);
    assert!(matches!(
        column_variance(&df, "one"),
        Err(TwinSemError::InvalidArgument(_))
    ));
    assert!(column_variance(&df, "missing").is_err());
}

#[test]
fn tracing_can_be_installed_twice() {
    let config = EngineConfig::default().with_log_filter("debug");
    init_tracing(&config);
    init_tracing(&config);
}
