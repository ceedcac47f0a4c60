use std::{fs::read_to_string, path::Path};

use approx::assert_abs_diff_eq;
use assert_cmd::Command;
use pesexp::Output;
use tempfile::tempdir;
use test_case::test_case;

const INPUTS: [&str; 2] = ["testfiles/nacl.txt", "testfiles/nacl.fc"];

fn setup(config: &str) -> std::io::Result<tempfile::TempDir> {
    let dir = tempdir()?;
    std::fs::copy(config, dir.path().join("pesexp.toml"))?;
    for file in INPUTS {
        let filename = Path::new(file).file_name().unwrap();
        std::fs::copy(file, dir.path().join(filename))?;
    }
    Ok(dir)
}

#[test]
fn run() -> std::io::Result<()> {
    let dir = setup("testfiles/harmonic.toml")?;
    let mut cmd = Command::cargo_bin("pesexp").unwrap();
    let assert = cmd.arg("pesexp.toml").current_dir(&dir).assert();
    let output = assert.get_output();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration Options:"));
    assert!(stdout.contains("normal termination of pesexp"));

    let contents = read_to_string(dir.path().join("expansion.json"))?;
    let got: Output = serde_json::from_str(&contents)?;
    let term = got.expansion.get(&[0, 2]).unwrap();
    assert_abs_diff_eq!(term.coefficient().unwrap(), 2.0, epsilon = 1e-6);

    // a second run refuses to clobber the first
    Command::cargo_bin("pesexp")
        .unwrap()
        .current_dir(&dir)
        .assert()
        .failure();
    Ok(())
}

#[test_case(&["-j"], "\"max_order\":2" ; "json")]
#[test_case(&["-j", "-o"], "\"sleep_int\":0" ; "json overwrite")]
fn json(args: &[&str], want: &str) -> std::io::Result<()> {
    let dir = setup("testfiles/harmonic.toml")?;
    let assert = Command::cargo_bin("pesexp")
        .unwrap()
        .args(args)
        .current_dir(&dir)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains(want), "{stdout}");
    assert!(!dir.path().join("expansion.json").exists());
    Ok(())
}
