// Checks on the shipped default config files.

/// Verify that defaults/playerport.toml is valid TOML.
#[test]
fn playerport_toml_is_valid() {
    let content = std::fs::read_to_string("defaults/playerport.toml")
        .expect("defaults/playerport.toml should exist");
    let parsed: Result<toml::Value, _> = toml::from_str(&content);
    assert!(parsed.is_ok(), "defaults/playerport.toml is not valid TOML: {:?}", parsed.err());
}

/// Verify that defaults/credentials.toml.example is valid TOML.
#[test]
fn credentials_example_is_valid_toml() {
    let content = std::fs::read_to_string("defaults/credentials.toml.example")
        .expect("defaults/credentials.toml.example should exist");
    let parsed: Result<toml::Value, _> = toml::from_str(&content);
    assert!(
        parsed.is_ok(),
        "defaults/credentials.toml.example is not valid TOML: {:?}",
        parsed.err()
    );
}

/// The default config loads without edits once copied into config/.
#[test]
fn defaults_load_through_ensure_config_files() {
    let tmp = std::env::temp_dir().join(format!("playerport_defaults_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&tmp);
    std::fs::create_dir_all(tmp.join("defaults")).unwrap();
    std::fs::copy("defaults/playerport.toml", tmp.join("defaults/playerport.toml")).unwrap();

    let config = playerport_cli::config::load_config(Some(&tmp)).expect("defaults should load");
    assert_eq!(config.organization_id, "demo-club");
    assert!(tmp.join("config/playerport.toml").exists());

    let _ = std::fs::remove_dir_all(&tmp);
}
