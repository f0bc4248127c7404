//! INI configuration files.
//!
//! A configuration file holds a single `[publisher]` section whose keys map
//! onto [`PublisherBuilder`] setters. Durations are given in milliseconds.
//!
//! ```ini
//! [publisher]
//! endpoint = https://ingest.example.com/v1/records
//! max_retry_count = 3
//! min_backoff_ms = 500
//! format = json
//! ```

use std::{fs, io::ErrorKind, path::Path, str::FromStr};

use encoding_rs::Encoding;
use ini::Ini;

use crate::{
    batch::SizeAccounting,
    error::ConfigError,
    publisher::PublisherBuilder,
    serialise::{PayloadFormat, TextEncoding},
};

/// Name of the section read from configuration files.
pub const PUBLISHER_SECTION: &str = "publisher";

/// Load a builder from the INI file at `path`.
///
/// `encoding` is a WHATWG label for the file's charset; UTF-8 is assumed
/// when absent.
pub fn from_ini_file(
    path: impl AsRef<Path>,
    encoding: Option<&str>,
) -> Result<PublisherBuilder, ConfigError> {
    let path = path.as_ref();
    let bytes = read_file_bytes(path)?;
    if bytes.is_empty() {
        return Err(ConfigError::InvalidConfig(format!(
            "{} is an empty file",
            path.display()
        )));
    }
    let text = decode_with_encoding(&bytes, encoding.unwrap_or("utf-8"))?;
    from_ini_str(&text)
}

/// Load a builder from INI text.
pub fn from_ini_str(text: &str) -> Result<PublisherBuilder, ConfigError> {
    let ini = Ini::load_from_str(text)
        .map_err(|err| ConfigError::InvalidConfig(format!("invalid INI: {err}")))?;
    let section = ini.section(Some(PUBLISHER_SECTION)).ok_or_else(|| {
        ConfigError::InvalidConfig(format!("missing [{PUBLISHER_SECTION}] section"))
    })?;
    section
        .iter()
        .try_fold(PublisherBuilder::new(), |builder, (key, value)| {
            apply_key(builder, key, value)
        })
}

fn read_file_bytes(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => {
            ConfigError::InvalidConfig(format!("{} doesn't exist", path.display()))
        }
        _ => ConfigError::Io(err),
    })
}

fn decode_with_encoding(bytes: &[u8], label: &str) -> Result<String, ConfigError> {
    let normalized_label = label.trim().to_ascii_lowercase();
    let encoding = Encoding::for_label(normalized_label.as_bytes())
        .ok_or_else(|| ConfigError::InvalidConfig(format!("unknown encoding {label}")))?;
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ConfigError::InvalidConfig(format!(
            "configuration is not valid {}",
            encoding.name()
        )));
    }
    Ok(decoded.into_owned())
}

fn apply_key(
    builder: PublisherBuilder,
    key: &str,
    value: &str,
) -> Result<PublisherBuilder, ConfigError> {
    let value = value.trim();
    Ok(match key.trim().to_ascii_lowercase().as_str() {
        "endpoint" => builder.with_endpoint(value),
        "max_retry_count" => builder.with_max_retry_count(parse_number(key, value)?),
        "min_backoff_ms" => builder.with_min_backoff_ms(parse_number(key, value)?),
        "max_backoff_ms" => builder.with_max_backoff_ms(parse_number(key, value)?),
        "delta_backoff_ms" => builder.with_delta_backoff_ms(parse_number(key, value)?),
        "operation_timeout_ms" => builder.with_operation_timeout_ms(parse_number(key, value)?),
        "connect_timeout_ms" => builder.with_connect_timeout_ms(parse_number(key, value)?),
        "max_batch_bytes" => builder.with_max_batch_bytes(parse_number(key, value)?),
        "capacity" => builder.with_capacity(parse_number(key, value)?),
        "format" => builder.with_format(PayloadFormat::from_str(value)?),
        "encoding" => builder.with_encoding(TextEncoding::from_str(value)?),
        "size_accounting" => builder.with_size_accounting(SizeAccounting::from_str(value)?),
        other => {
            return Err(ConfigError::InvalidConfig(format!(
                "unknown key '{other}' in [{PUBLISHER_SECTION}]"
            )));
        }
    })
}

fn parse_number<N: FromStr>(key: &str, value: &str) -> Result<N, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::InvalidConfig(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn parses_full_section() {
        let config = from_ini_str(
            "[publisher]\n\
             endpoint = http://localhost:9/ingest\n\
             max_retry_count = 3\n\
             min_backoff_ms = 250\n\
             max_backoff_ms = 4000\n\
             delta_backoff_ms = 100\n\
             operation_timeout_ms = 60000\n\
             max_batch_bytes = 1024\n\
             format = msgpack\n\
             encoding = latin1\n\
             size_accounting = framed\n",
        )
        .and_then(|builder| builder.build_config())
        .expect("valid configuration");
        assert_eq!(config.endpoint, "http://localhost:9/ingest");
        assert_eq!(config.backoff.max_retry_count, 3);
        assert_eq!(config.backoff.min_backoff, Duration::from_millis(250));
        assert_eq!(config.backoff.max_backoff, Duration::from_secs(4));
        assert_eq!(config.backoff.delta_backoff, Duration::from_millis(100));
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.max_batch_bytes, 1024);
        assert_eq!(config.format, PayloadFormat::MessagePack);
        assert_eq!(config.encoding.name(), "windows-1252");
        assert_eq!(config.size_accounting, SizeAccounting::Framed);
    }

    #[rstest]
    #[case("[publisher]\nendpoint = x\nretries = 2\n", "unknown key")]
    #[case("[other]\nendpoint = x\n", "missing [publisher]")]
    #[case("[publisher]\nmax_retry_count = -1\n", "non-negative integer")]
    #[case("[publisher]\nformat = xml\n", "invalid payload format")]
    #[case("[publisher]\nencoding = utf-16le\n", "encoding")]
    fn rejects_invalid_sections(#[case] text: &str, #[case] needle: &str) {
        let err = from_ini_str(text).expect_err("configuration must be rejected");
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[rstest]
    fn decodes_non_utf8_bytes() {
        let (bytes, _, _) =
            encoding_rs::WINDOWS_1252.encode("[publisher]\nendpoint = http://caf\u{e9}/\n");
        let text = decode_with_encoding(&bytes, "latin1").expect("decodes");
        assert!(text.contains("caf\u{e9}"));
        assert!(decode_with_encoding(&bytes, "utf-8").is_err());
    }

    #[rstest]
    fn unknown_file_encoding_is_rejected() {
        let err = decode_with_encoding(b"x", "klingon").expect_err("unknown label");
        assert!(err.to_string().contains("unknown encoding klingon"));
    }
}
