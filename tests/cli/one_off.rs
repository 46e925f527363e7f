use crate::cli::*;

const TAGS: &str = r#"{"collection": "tags", "fields": [{"field": "label", "datatype": "string", "note": "Tag label", "primary_key": true}], "note": "Labels"}"#;

#[test]
fn test_one_off_create() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config_and_data_dir()?;

    let output = catalogd()
        .arg("--one-off")
        .arg(TAGS)
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .output()?;

    assert!(output.status.success());

    // Logs go to stderr, stdout only has the result
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["collection"], "tags");
    assert_eq!(summary["note"], "Labels");
    assert_eq!(summary["fields"][0]["field"], "label");

    // The collection is there for the next run: creating it again conflicts
    let output = catalogd()
        .arg("--one-off")
        .arg(TAGS)
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

    Ok(())
}

#[test]
fn test_one_off_invalid_definition() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config_and_data_dir()?;

    let output = catalogd()
        .arg("--one-off")
        .arg(r#"{"collection": "tags", "fields": []}"#)
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .output()?;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least one field"));

    Ok(())
}

#[test]
fn test_default_config_written() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;

    let output = catalogd()
        .current_dir(temp_dir.path())
        .arg("--one-off")
        .arg(TAGS)
        .output()?;

    assert!(output.status.success());

    let config = fs::read_to_string(temp_dir.path().join("catalogd.toml"))?;
    assert!(config.contains(r#"type = "sqlite""#));
    assert!(temp_dir.path().join("catalogd.sqlite").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Write access requires this password"));

    Ok(())
}
