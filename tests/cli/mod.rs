use assert_cmd::prelude::*; // Add methods on commands
use std::fs;
use std::process::Command; // Run programs
use tempfile::{Builder, TempDir};

use crate::sqlite_config;

mod one_off;

const TEST_CONFIG_FILE: &str = "catalogd-test.toml";

fn setup_temp_config_and_data_dir() -> std::io::Result<TempDir> {
    let temp_dir = Builder::new()
        .prefix("catalogd-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    let dsn = temp_dir.path().join("catalogd.sqlite");
    fs::write(
        temp_dir.path().join(TEST_CONFIG_FILE),
        sqlite_config(&dsn.to_string_lossy()),
    )?;

    Ok(temp_dir)
}

fn catalogd() -> Command {
    Command::cargo_bin("catalogd").expect("catalogd bin exists")
}
