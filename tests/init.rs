use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_todolens"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "todolens init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".todolens.toml");
    assert!(config_path.exists(), ".todolens.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[walk]"));
    assert!(content.contains("[run]"));
    assert!(content.contains("[aggregate]"));

    // Verify it's valid TOML that todolens-core can parse
    let config: todolens_core::LensConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.walk.max_commits, -1);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".todolens.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_todolens"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".todolens.toml")).unwrap();
    assert_eq!(content, "# existing");
}
