//! Loading must fail loudly when configuration files are malformed.

use std::ffi::OsString;
use std::fs;

use ortho_config::{OrthoConfig, OrthoError};
use sbt_client_config::Config;
use tempfile::TempDir;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config_path = temp_dir.path().join("sbtc.toml");
    fs::write(&config_path, "startup_timeout_secs = not_a_number\n")
        .expect("write malformed config");

    let args = vec![
        OsString::from("sbtc"),
        OsString::from("--config-path"),
        config_path.clone().into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    let mentions_path = match error.as_ref() {
        OrthoError::File { path, .. } => path == &config_path,
        OrthoError::Aggregate(aggregate) => aggregate
            .iter()
            .any(|err| matches!(err, OrthoError::File { path, .. } if path == &config_path)),
        _ => false,
    };
    assert!(
        mentions_path,
        "expected the malformed file to be reported, got {error:?}"
    );
}
