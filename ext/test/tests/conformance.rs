//! Conformance tests that run YAML fixtures through the generator
//!
//! Run with: cargo test -p sumgen-test --test conformance

#![cfg(feature = "fixtures")]

use std::fs;
use std::path::{Path, PathBuf};
use sumgen_test::fixture::Fixture;

/// The fixtures/conformance directory at the workspace root
fn fixtures_dir() -> PathBuf {
    // The manifest dir is ext/test
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let root = manifest_dir
        .parent() // ext
        .and_then(Path::parent) // workspace root
        .expect("Could not find workspace root");

    root.join("fixtures").join("conformance")
}

/// Load and run every fixture in one file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    // Parse potentially multiple fixtures (separated by ---)
    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {e}", path.display());
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_eligibility() {
    run_fixture_file("01_eligibility.yaml");
}

#[test]
fn test_members() {
    run_fixture_file("02_members.yaml");
}

#[test]
fn test_gate() {
    run_fixture_file("03_gate.yaml");
}

#[test]
fn test_emission() {
    run_fixture_file("04_emission.yaml");
}

#[test]
fn every_fixture_file_is_listed() {
    let mut files: Vec<_> = fs::read_dir(fixtures_dir())
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".yaml") || name.ends_with(".yml"))
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "01_eligibility.yaml",
            "02_members.yaml",
            "03_gate.yaml",
            "04_emission.yaml"
        ]
    );
}
