use approx::assert_abs_diff_eq;
use test_case::test_case;

use super::*;

fn strains_and_modes(nmodes: usize) -> Vec<Variable> {
    (0..NSTRAIN)
        .map(Variable::strain)
        .chain((0..nmodes).map(Variable::displacement))
        .collect()
}

#[test]
fn variables() {
    let vars = strains_and_modes(2);
    assert!(vars[..NSTRAIN].iter().all(Variable::is_strain));
    assert!(vars[NSTRAIN..].iter().all(Variable::is_displacement));
    let flat: Vec<_> = vars.iter().map(Variable::flat_index).collect();
    assert_eq!(flat, (0..NSTRAIN + 2).collect::<Vec<_>>());
    let labels: Vec<_> = vars.iter().map(Variable::to_string).collect();
    assert_eq!(
        labels,
        ["e_xx", "e_yy", "e_zz", "e_yz", "e_xz", "e_xy", "u_0", "u_1"]
    );
    assert!(Variable::displacement(3).centrosymmetric().centrosymmetric);
}

#[test]
fn enumeration_order() {
    let vars = vec![Variable::strain(0), Variable::displacement(0)];
    let got: Vec<_> = TaylorExpansion::populate(vars, |t| t.order() <= 3)
        .unwrap()
        .iter()
        .map(|t| t.multiplicity().to_vec())
        .collect();
    #[rustfmt::skip]
    let want = vec![
        vec![1, 0], vec![0, 1],
        vec![2, 0], vec![1, 1], vec![0, 2],
        vec![3, 0], vec![2, 1], vec![1, 2], vec![0, 3],
    ];
    assert_eq!(got, want);
}

#[test]
fn enumeration_count() {
    let got =
        TaylorExpansion::populate(strains_and_modes(2), |t| t.order() <= 2)
            .unwrap();
    let first = got.iter().filter(|t| t.order() == 1).count();
    assert_eq!(first, 8);
    assert_eq!(got.len() - first, 36);
    assert_eq!(got.len(), 44);
}

#[test]
fn full_count() {
    // C(n + k - 1, k) terms of order k over n variables
    let got = TaylorExpansion::populate(strains_and_modes(2), |_| true)
        .unwrap()
        .len();
    assert_eq!(got, 8 + 36 + 120 + 330);
}

#[test]
fn centrosymmetric_pruning() {
    let u1 = Variable::displacement(0).centrosymmetric();
    let u2 = Variable::displacement(1).centrosymmetric();
    let got = TaylorExpansion::populate(vec![u1, u2], |_| true).unwrap();
    assert!(got.get(&[1, 0]).is_none());
    assert!(got.get(&[0, 1]).is_none());
    assert!(got.get(&[1, 1]).is_some());
    assert!(got.get(&[2, 1]).is_none());
    assert!(got.get(&[3, 1]).is_some());
    assert!(got.iter().all(|t| !t.is_centrosymmetric_forbidden()));
}

#[test]
fn centrosymmetric_mixed() {
    let vars = vec![Variable::strain(0), Variable::displacement(0).centrosymmetric()];
    let got = TaylorExpansion::populate(vars, |_| true).unwrap();
    // strain is even, so only the parity of the displacement matters
    assert!(got.get(&[1, 0]).is_some());
    assert!(got.get(&[1, 1]).is_none());
    assert!(got.get(&[1, 2]).is_some());
    assert!(got.get(&[0, 3]).is_none());
}

#[test_case(&[1], 1 ; "1")]
#[test_case(&[2], 2 ; "2")]
#[test_case(&[1, 1], 1 ; "11")]
#[test_case(&[3], 6 ; "3")]
#[test_case(&[1, 2], 2 ; "12")]
#[test_case(&[2, 1], 2 ; "21")]
#[test_case(&[1, 1, 1], 1 ; "111")]
#[test_case(&[4], 24 ; "4")]
#[test_case(&[1, 3], 6 ; "13")]
#[test_case(&[2, 2], 4 ; "22")]
#[test_case(&[1, 2, 1], 2 ; "121")]
#[test_case(&[1, 1, 1, 1], 1 ; "1111")]
fn prefactor(shape: &[u8], denom: u32) {
    let got = Shape::of(shape).prefactor().unwrap();
    assert_eq!(got.denominator(), denom);
    assert_eq!(got.value(), 1.0 / denom as f64);
}

#[test]
fn prefactor_exact() {
    let p = |s: &[u8]| Shape::of(s).prefactor().unwrap().value();
    assert_eq!(p(&[1]), 1.0);
    assert_eq!(p(&[2]), 0.5);
    assert_eq!(p(&[1, 1]), 1.0);
    assert_eq!(p(&[1, 1, 1, 1]), 1.0);
}

/// the [2, 2] entry is printed as 1/12 in some tables but valued at 1/4. 1/4
/// is 1/(2!·2!) and is the value used, and it prints as such
#[test]
fn prefactor_two_two() {
    let got = Shape::of(&[0, 2, 0, 2]).prefactor().unwrap();
    assert_eq!(got.value(), 0.25);
    assert_eq!(got.to_string(), "1/4");
    assert_ne!(got.to_string(), "1/12");
}

#[test_case(&[5] ; "fifth order")]
#[test_case(&[3, 2] ; "fifth order mixed")]
#[test_case(&[0, 0] ; "zeroth order")]
fn unknown_shape(shape: &[u8]) {
    assert!(matches!(
        Shape::of(shape).prefactor(),
        Err(TaylorError::UnknownShape(_))
    ));
}

#[test]
fn term_errors() {
    let vars: Arc<[Variable]> = strains_and_modes(1).into();
    assert_eq!(
        ExpansionTerm::new(vars.clone(), vec![1, 0]),
        Err(TaylorError::Length {
            expected: 7,
            got: 2
        })
    );
    assert_eq!(
        ExpansionTerm::from_indices(vars.clone(), &[9]),
        Err(TaylorError::Index(9))
    );
    assert!(ExpansionTerm::from_indices(vars, &[0, 0, 1, 1, 2]).is_err());
}

#[test]
fn term_queries() {
    let vars: Arc<[Variable]> = strains_and_modes(2).into();
    let t = ExpansionTerm::from_indices(vars.clone(), &[6, 6, 7]).unwrap();
    assert_eq!(t.order(), 3);
    assert!(t.is_pure(Kind::Displacement));
    assert!(!t.is_pure(Kind::Strain));
    assert!(!t.is_single());
    assert_eq!(t.signature(), Signature(vec![2, 1]));
    assert_eq!(t.signature().to_string(), "21");
    assert_eq!(t.active_positions(), vec![6, 7]);
    assert_eq!(t.to_string(), "1/2 u_0^2 u_1");

    let t = ExpansionTerm::from_indices(vars.clone(), &[2, 7]).unwrap();
    assert_eq!(t.signature().to_string(), "11");
    assert_eq!(t.to_string(), "1 e_zz u_1");

    let t = ExpansionTerm::from_indices(vars.clone(), &[3, 3]).unwrap();
    assert!(t.is_single());
    assert!(t.is_pure(Kind::Strain));
}

#[test]
fn term_equality() {
    let vars: Arc<[Variable]> = strains_and_modes(1).into();
    let mut a = ExpansionTerm::from_indices(vars.clone(), &[0, 6]).unwrap();
    let b = ExpansionTerm::from_indices(vars.clone(), &[6, 0]).unwrap();
    a.set_coefficient(1.5);
    assert_eq!(a, b);
    let c = ExpansionTerm::from_indices(vars, &[0, 0]).unwrap();
    assert_ne!(a, c);
}

#[test]
fn accept_predicates() {
    let got = TaylorExpansion::populate(strains_and_modes(2), |t| {
        t.is_pure(Kind::Displacement) && t.is_single()
    })
    .unwrap();
    let want: Vec<_> = [[1, 0], [0, 1], [2, 0], [0, 2], [3, 0], [0, 3], [4, 0], [0, 4]]
        .iter()
        .map(|m| {
            let mut v = vec![0; NSTRAIN];
            v.extend(m);
            v
        })
        .collect();
    let got: Vec<_> = got.iter().map(|t| t.multiplicity().to_vec()).collect();
    assert_eq!(got, want);
}

#[test]
fn energy() {
    let vars = vec![Variable::strain(0), Variable::displacement(0)];
    let mut exp = TaylorExpansion::populate(vars, |t| t.order() == 2).unwrap();
    // E = 1/2 · 2 e² + 3 e u + 1/2 · 4 u²
    for (t, c) in exp.terms_mut().iter_mut().zip([2.0, 3.0, 4.0]) {
        t.set_coefficient(c);
    }
    let mut flat = vec![0.0; NSTRAIN + 1];
    flat[0] = 0.1;
    flat[NSTRAIN] = -0.2;
    let want = 0.1 * 0.1 + 3.0 * 0.1 * -0.2 + 2.0 * 0.04;
    assert_abs_diff_eq!(exp.energy(&flat).unwrap(), want, epsilon = 1e-14);
    assert_eq!(exp.resolved(), 3);
}

#[test]
fn unresolved_terms_are_skipped() {
    let vars = vec![Variable::displacement(0)];
    let mut exp = TaylorExpansion::populate(vars, |t| t.order() <= 2).unwrap();
    exp.terms_mut()[1].set_coefficient(2.0);
    let mut flat = vec![0.0; NSTRAIN + 1];
    flat[NSTRAIN] = 0.5;
    assert_abs_diff_eq!(exp.energy(&flat).unwrap(), 0.25, epsilon = 1e-14);
    assert_eq!(exp.resolved(), 1);
}

#[test]
fn short_coordinate() {
    let vars = vec![Variable::strain(0), Variable::displacement(0)];
    let mut exp = TaylorExpansion::populate(vars, |t| t.order() == 2).unwrap();
    exp.terms_mut()[0].set_coefficient(2.0);
    // only e² is resolved, so the missing mode is never read
    assert_abs_diff_eq!(exp.energy(&[0.5; NSTRAIN]).unwrap(), 0.25);

    exp.terms_mut()[2].set_coefficient(1.0);
    assert_eq!(
        exp.energy(&[0.0; NSTRAIN]),
        Err(TaylorError::Coordinate {
            index: NSTRAIN,
            len: NSTRAIN
        })
    );
}

#[test]
fn serde_round_trip() {
    let vars = vec![
        Variable::strain(0),
        Variable::displacement(3).centrosymmetric(),
    ];
    let mut exp = TaylorExpansion::populate(vars, |t| t.order() <= 2).unwrap();
    exp.terms_mut()[0].set_coefficient(-1.25);
    let s = serde_json::to_string(&exp).unwrap();
    let got: TaylorExpansion = serde_json::from_str(&s).unwrap();
    assert_eq!(got, exp);
    assert_eq!(got.terms()[0].coefficient(), Some(-1.25));
    assert!(s.contains("\"label\":\"1 e_xx\""));
}

#[test]
fn checks_groups() {
    let checks = Checks(vec![vec![0, 2], vec![1]]);
    assert!(checks.mod_check(&[1, 0, 1]));
    assert!(!checks.mod_check(&[1, 0, 0]));
    assert!(!checks.mod_check(&[0, 1, 0]));
    assert!(checks.mod_check(&[2, 2, 0]));
    assert_eq!(checks.0[0], vec![0, 2]);
    assert!(Checks::centrosymmetric(&[Variable::strain(0)]).is_empty());
}
