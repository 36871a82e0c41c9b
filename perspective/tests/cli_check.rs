//! CLI tests for `perspective check` and `perspective init`.
//!
//! Spawns the binary and verifies exit codes for valid, broken and
//! unreadable tree files.

use std::fs;
use std::process::Command;

use perspective::core::fallback::fallback_tree;
use perspective::exit_codes;
use perspective::io::config::load_config;
use perspective::io::tree_store::save_tree;

#[test]
fn check_valid_tree_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    let tree = fallback_tree("tree_cli", "2026-10-18_09-30-00");
    let path = save_tree(temp.path(), &tree).expect("save tree");

    let output = Command::new(env!("CARGO_BIN_EXE_perspective"))
        .current_dir(temp.path())
        .args(["check", "--tree"])
        .arg(&path)
        .output()
        .expect("perspective check");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
}

#[test]
fn check_broken_tree_exits_with_violations() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut tree = fallback_tree("tree_cli", "2026-10-18_09-30-00");
    if let Some(node) = tree.nodes.get_mut("N1") {
        node.children.push("N9".to_string());
    }
    tree.current_node_id = "missing".to_string();
    let path = save_tree(temp.path(), &tree).expect("save tree");

    let output = Command::new(env!("CARGO_BIN_EXE_perspective"))
        .current_dir(temp.path())
        .args(["check", "--tree"])
        .arg(&path)
        .output()
        .expect("perspective check");

    assert_eq!(output.status.code(), Some(exit_codes::VIOLATIONS));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("child 'N9' does not exist"));
    assert!(stdout.contains("current_node_id 'missing'"));
}

#[test]
fn check_unparseable_tree_exits_with_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("tree.json");
    fs::write(&path, "not json").expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_perspective"))
        .current_dir(temp.path())
        .args(["check", "--tree"])
        .arg(&path)
        .output()
        .expect("perspective check");

    assert_eq!(output.status.code(), Some(exit_codes::ERROR));
    assert!(String::from_utf8_lossy(&output.stderr).contains("parse tree"));
}

#[test]
fn init_writes_default_config_and_tree_dir() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = Command::new(env!("CARGO_BIN_EXE_perspective"))
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("perspective init");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let config = load_config(&temp.path().join("perspective.toml")).expect("config");
    assert!(temp.path().join(&config.tree_dir).is_dir());
}

#[test]
fn init_keeps_existing_config_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("perspective.toml");
    fs::write(&config_path, "tree_dir = \"custom_trees\"\n").expect("write");

    let status = Command::new(env!("CARGO_BIN_EXE_perspective"))
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("perspective init");

    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(&config_path).expect("read"),
        "tree_dir = \"custom_trees\"\n"
    );
    assert!(temp.path().join("custom_trees").is_dir());
}
