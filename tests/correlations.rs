mod common;

use common::assert_close;
use ndarray::{Array2, array};
use twinsem::correlations::{component_correlations, correlations};
use twinsem::standardize::variance_components;
use twinsem::types::{Component, PathMatrixSet};

#[test]
fn genetic_correlation_from_cholesky() {
    let a = array![[0.36, 0.18], [0.18, 0.25]];
    let c = array![[0.09, 0.03], [0.03, 0.04]];
    let e = array![[0.25, 0.05], [0.05, 0.16]];
    let r = correlations(&a, &c, &e).expect("correlations");
    assert_close(r.ra[(0, 1)], 0.6, 1e-12);
    assert_close(r.ra[(1, 0)], 0.6, 1e-12);
    assert_close(r.rc[(0, 1)], 0.5, 1e-12);
    assert_close(r.re[(0, 1)], 0.25, 1e-12);
    for block in [&r.ra, &r.rc, &r.re] {
        assert_close(block[(0, 0)], 1.0, 1e-12);
        assert_close(block[(1, 1)], 1.0, 1e-12);
    }
}

#[test]
fn dropped_component_gives_na_block_only() {
    let paths = PathMatrixSet {
        a: array![[0.6, 0.0], [0.3, 0.4]],
        c: Array2::zeros((2, 2)),
        e: array![[0.5, 0.0], [0.1, 0.4]],
    };
    let components = variance_components(&paths).expect("components");
    let r = component_correlations(&components).expect("correlations");

    assert!(!r.is_computable(Component::C));
    assert!(r.rc.iter().all(|v| v.is_nan()));
    assert!(r.is_computable(Component::A));
    assert!(r.is_computable(Component::E));
    assert_close(r.ra[(0, 1)], 0.18 / (0.36f64 * 0.25).sqrt(), 1e-12);
}

#[test]
fn one_zero_diagonal_entry_is_enough_for_na() {
    let a = array![[0.36, 0.0], [0.0, 0.0]];
    let ce = Array2::<f64>::eye(2);
    let r = correlations(&a, &ce, &ce).expect("correlations");
    assert!(r.ra.iter().all(|v| v.is_nan()));
    assert_close(r.rc[(0, 0)], 1.0, 1e-12);
}

#[test]
fn blocks_must_share_dimension() {
    let a = Array2::<f64>::eye(2);
    let c = Array2::<f64>::eye(3);
    assert!(correlations(&a, &c, &a).is_err());
}
