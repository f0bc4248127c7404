//! Loading publisher configuration from INI files.

use std::{io::Write, time::Duration};

use femtopublish::{ConfigError, PayloadFormat, file_config::from_ini_file};
use rstest::rstest;
use tempfile::NamedTempFile;

fn write_config(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write config");
    file.flush().expect("flush config");
    file
}

#[rstest]
fn loads_builder_from_utf8_file() {
    let file = write_config(
        b"[publisher]\n\
          endpoint = http://localhost:8080/ingest\n\
          max_retry_count = 4\n\
          max_backoff_ms = 2500\n\
          format = json\n",
    );

    let config = from_ini_file(file.path(), None)
        .and_then(|builder| builder.build_config())
        .expect("config");

    assert_eq!(config.endpoint, "http://localhost:8080/ingest");
    assert_eq!(config.backoff.max_retry_count, 4);
    assert_eq!(config.backoff.max_backoff, Duration::from_millis(2500));
    assert_eq!(config.format, PayloadFormat::Json);
}

#[rstest]
fn decodes_files_in_the_given_encoding() {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252
        .encode("[publisher]\nendpoint = http://localhost/caf\u{e9}\n");
    let file = write_config(&bytes);

    let config = from_ini_file(file.path(), Some("latin1"))
        .and_then(|builder| builder.build_config())
        .expect("config");

    assert_eq!(config.endpoint, "http://localhost/caf\u{e9}");
}

#[rstest]
fn empty_file_is_rejected() {
    let file = write_config(b"");
    let err = from_ini_file(file.path(), None).expect_err("empty");
    assert!(err.to_string().contains("is an empty file"), "{err}");
}

#[rstest]
fn missing_file_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = from_ini_file(dir.path().join("absent.ini"), None).expect_err("missing");
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
    assert!(err.to_string().contains("doesn't exist"), "{err}");
}

#[rstest]
fn endpoint_is_required_when_building() {
    let file = write_config(b"[publisher]\nmax_retry_count = 1\n");
    let builder = from_ini_file(file.path(), None).expect("parses");
    let err = builder.build_config().expect_err("no endpoint");
    assert!(err.to_string().contains("requires an endpoint"), "{err}");
}
