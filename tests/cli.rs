// Command line behavior of the thumbnailer binary

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn thumbnailer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_appimage-thumbnailer"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run the thumbnailer")
}

#[test]
fn test_missing_size_argument() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.AppImage");
    fs::write(&input, b"\x7fELF").unwrap();
    let out = dir.path().join("out.png");

    let output = thumbnailer(&[input.to_str().unwrap(), out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
    assert!(!out.exists());
}

#[test]
fn test_too_many_arguments() {
    let output = thumbnailer(&["in.AppImage", "out.png", "64", "extra"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_non_numeric_size() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.AppImage");
    fs::write(&input, b"\x7fELF").unwrap();
    let out = dir.path().join("out.png");

    let output = thumbnailer(&[input.to_str().unwrap(), out.to_str().unwrap(), "large"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_size_above_limit() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.AppImage");
    fs::write(&input, b"\x7fELF").unwrap();
    let out = dir.path().join("out.png");

    let output = thumbnailer(&[input.to_str().unwrap(), out.to_str().unwrap(), "5000"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: size must be between 1 and"));
    assert!(!out.exists());
}

#[test]
fn test_input_is_not_an_appimage() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, b"plain text").unwrap();
    let out = dir.path().join("out.png");

    let output = thumbnailer(&[input.to_str().unwrap(), out.to_str().unwrap(), "64"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not an ELF executable"));
    assert!(!out.exists());
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("missing.AppImage");
    let out = dir.path().join("out.png");

    let output = thumbnailer(&[input.to_str().unwrap(), out.to_str().unwrap(), "64"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_version_and_help() {
    let version = thumbnailer(&["--version"]);
    assert!(version.status.success());
    assert!(String::from_utf8_lossy(&version.stdout).contains(env!("CARGO_PKG_VERSION")));

    let help = thumbnailer(&["--help"]);
    assert!(help.status.success());
}
