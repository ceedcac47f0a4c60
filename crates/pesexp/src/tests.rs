use approx::assert_abs_diff_eq;

use super::*;

fn harmonic() -> Config {
    Config::load("testfiles/harmonic.toml")
}

fn coefficient(out: &Output, multiplicity: &[u8]) -> f64 {
    out.expansion
        .get(multiplicity)
        .and_then(|t| t.coefficient())
        .unwrap_or_else(|| panic!("no coefficient for {multiplicity:?}"))
}

/// every term of both expansions has a coefficient, and they agree
fn same_coefficients(a: &Output, b: &Output) {
    assert_eq!(a.expansion.len(), b.expansion.len());
    for (x, y) in a.expansion.iter().zip(&b.expansion) {
        let (Some(cx), Some(cy)) = (x.coefficient(), y.coefficient()) else {
            panic!("missing coefficient for `{x}` or `{y}`");
        };
        assert_abs_diff_eq!(cx, cy, epsilon = 1e-12);
    }
}

#[test]
fn harmonic_recovers_inputs() {
    let mut w = Vec::new();
    let out = run(&mut w, &harmonic()).unwrap();
    assert_abs_diff_eq!(
        &out.eigenvalues[..],
        &[0.0, 0.0, 0.0, 2.0, 2.0, 2.0][..],
        epsilon = 1e-10
    );
    assert_eq!(out.expansion.len(), 5);
    assert_eq!(out.expansion.resolved(), 5);

    // the elastic constant and the eigenvalue come straight back
    assert_abs_diff_eq!(coefficient(&out, &[2, 0]), 10.0, epsilon = 1e-6);
    assert_abs_diff_eq!(coefficient(&out, &[0, 2]), 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(coefficient(&out, &[1, 1]), 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coefficient(&out, &[1, 0]), 0.0, epsilon = 1e-8);
    assert_eq!(coefficient(&out, &[0, 1]), 0.0);

    let value = out.expansion.get(&[0, 2]).unwrap().value().unwrap();
    assert_abs_diff_eq!(value, 1.0, epsilon = 1e-6);

    let got = String::from_utf8(w).unwrap();
    assert!(got.contains("Taylor Expansion:"));
    assert!(got.contains("5 of 5 terms resolved"));
}

#[test]
fn checkpoint_resume() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = harmonic();
    config.checkpoint = Some(tmp.path().join("samples.json"));
    let first = run(&mut std::io::sink(), &config).unwrap();
    assert!(tmp.path().join("samples.json").exists());

    // nothing is left to compute, so nothing is written for the external
    // program
    let pts = tmp.path().join("pts");
    config.oracle = OracleKind::Directory { dir: pts.clone() };
    let second = run(&mut std::io::sink(), &config).unwrap();
    assert_eq!(first, second);
    same_coefficients(&first, &second);
    assert_eq!(std::fs::read_dir(&pts).unwrap().count(), 0);
}

#[test]
fn pure_terms() {
    let mut config = harmonic();
    config.modes = None;
    config.pure_only = true;
    config.max_order = 4;
    let out = run(&mut std::io::sink(), &config).unwrap();
    // e_xx and the three stretching modes, each through fourth order
    assert_eq!(out.expansion.len(), 16);
    assert!(out.expansion.iter().all(|t| t.is_single()));
    assert_eq!(out.expansion.resolved(), 16);
    for mult in [[0, 2, 0, 0], [0, 0, 2, 0], [0, 0, 0, 2]] {
        assert_abs_diff_eq!(coefficient(&out, &mult), 2.0, epsilon = 1e-6);
    }
    assert_abs_diff_eq!(coefficient(&out, &[0, 4, 0, 0]), 0.0, epsilon = 1e-4);
}

#[test]
fn centrosymmetric_pruning() {
    let mut config = harmonic();
    config.strains = Vec::new();
    config.modes = Some(vec![3, 4]);
    config.centrosymmetric = vec![4];
    let out = run(&mut std::io::sink(), &config).unwrap();
    let got: Vec<_> = out
        .expansion
        .iter()
        .map(|t| t.multiplicity().to_vec())
        .collect();
    assert_eq!(got, vec![vec![1, 0], vec![2, 0], vec![0, 2]]);
}

#[test]
fn bad_mode() {
    let mut config = harmonic();
    config.modes = Some(vec![6]);
    let got = run(&mut std::io::sink(), &config);
    assert!(matches!(got, Err(RunError::Basis(BasisError::Index(_)))));
}

#[test]
fn output_round_trip() {
    let out = run(&mut std::io::sink(), &harmonic()).unwrap();
    let s = serde_json::to_string_pretty(&out).unwrap();
    let got: Output = serde_json::from_str(&s).unwrap();
    assert_eq!(got.expansion, out.expansion);
    assert_abs_diff_eq!(
        &got.eigenvalues[..],
        &out.eigenvalues[..],
        epsilon = 1e-12
    );
    same_coefficients(&got, &out);
}
