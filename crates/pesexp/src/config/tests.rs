use super::*;

#[test]
fn config() {
    let got = Config::load("testfiles/full.toml");
    let want = Config {
        structure: PathBuf::from("testfiles/nacl.txt"),
        force_constants: PathBuf::from("testfiles/nacl.fc"),
        strains: vec![0, 1, 5],
        modes: Some(vec![3, 4]),
        centrosymmetric: vec![4],
        max_order: 4,
        pure_only: true,
        evaluator: EvaluatorConfig {
            h_strain: 0.005,
            h_displacement: 0.02,
            product_stencils: false,
            resolution: 1e-10,
        },
        oracle: OracleKind::Directory {
            dir: PathBuf::from("pts"),
        },
        sleep_int: 5,
        checkpoint: Some(PathBuf::from("samples.json")),
        tolerances: BasisConfig {
            orthonormality: 1e-6,
            translation: 1e-4,
            translational_eigenvalue: 1e-2,
            snap: 1e-12,
        },
    };
    assert_eq!(got, want);
}

#[test]
fn defaults() {
    let got = Config::load("testfiles/harmonic.toml");
    assert_eq!(got.strains, vec![0]);
    assert!(got.centrosymmetric.is_empty());
    assert!(!got.pure_only);
    assert_eq!(got.evaluator, EvaluatorConfig::default());
    assert_eq!(got.tolerances, BasisConfig::default());
    assert_eq!(got.checkpoint, None);
    assert_eq!(
        got.oracle,
        OracleKind::Harmonic {
            elastic: [10.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        }
    );
    assert!(got.check().is_none());
}

#[test]
fn all_strains() {
    let got: Config = toml::from_str(
        r#"
structure = "s.json"
force_constants = "fc.json"
max_order = 3
sleep_int = 1
oracle = { type = "harmonic" }
"#,
    )
    .unwrap();
    assert_eq!(got.strains, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(got.modes, None);
    assert_eq!(got.oracle, OracleKind::Harmonic { elastic: [0.0; 6] });
}

#[test]
fn unknown_field() {
    let got: Result<Config, _> = toml::from_str(
        r#"
structure = "s.json"
force_constants = "fc.json"
max_order = 3
sleep_int = 1
step_size = 0.005
oracle = { type = "harmonic" }
"#,
    );
    assert!(got.is_err());
}

#[test]
fn check() {
    let mut config = Config::load("testfiles/harmonic.toml");
    config.max_order = 5;
    assert!(config.check().unwrap().contains("max_order"));
    config.max_order = 2;
    config.strains = vec![6];
    assert!(config.check().unwrap().contains("strain index 6"));
    config.strains = vec![0];
    config.evaluator.h_displacement = 0.0;
    assert!(config.check().unwrap().contains("step sizes"));
}

#[test]
fn display() {
    let got = Config::load("testfiles/full.toml").to_string();
    assert!(got.contains("Configuration Options:"));
    assert!(got.contains("modes = [3, 4]"));
    assert!(got.contains("oracle = directory, dir = pts"));
    assert!(got.contains("checkpoint = samples.json"));
}
