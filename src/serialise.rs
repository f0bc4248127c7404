//! Payload serialisation helpers.
//!
//! The same [`PayloadCodec`] measures individual records for the partitioner
//! and encodes whole batches for the transport, so the byte counts used for
//! grouping match what goes on the wire.
//!
//! # Formats
//!
//! - **JSON** (default): compact JSON text, transcoded from UTF-8 into the
//!   configured [`TextEncoding`].
//! - **MessagePack**: struct-map MessagePack. The text encoding is ignored.

use std::{borrow::Cow, str::FromStr};

use encoding_rs::{Encoding, UTF_8};
use rmp_serde::Serializer;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::ConfigError;

/// Errors raised while turning records into payload bytes.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// JSON serialisation or parsing failed.
    #[error("JSON serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
    /// MessagePack serialisation failed.
    #[error("MessagePack serialisation failed: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),
    /// The text contains characters the configured charset cannot represent.
    #[error("payload is not representable in {encoding}")]
    Unmappable { encoding: &'static str },
    /// Pre-serialised input was valid JSON but not an array of records.
    #[error("expected a JSON array of records")]
    NotAnArray,
}

/// Wire format used for batch payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Compact JSON array.
    #[default]
    Json,
    /// MessagePack array of struct maps.
    MessagePack,
}

impl PayloadFormat {
    /// MIME type advertised for payloads in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::MessagePack => "application/msgpack",
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "messagepack" => Ok(Self::MessagePack),
            other => Err(ConfigError::InvalidConfig(format!(
                "invalid payload format '{other}'. Valid options are: json, msgpack"
            ))),
        }
    }
}

/// Character set applied to text payloads.
///
/// Only charsets that `encoding_rs` can encode into are accepted, so labels
/// such as `utf-16le` (decode-only) are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl Default for TextEncoding {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl TextEncoding {
    /// Look up an encoding by its WHATWG label.
    pub fn for_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        let encoding = Encoding::for_label(normalized.as_bytes())?;
        (encoding.output_encoding() == encoding).then_some(Self(encoding))
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Encode UTF-8 text into this charset.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>, SerializationError> {
        if self.0 == UTF_8 {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }
        let (bytes, _, unmappable) = self.0.encode(text);
        if unmappable {
            return Err(SerializationError::Unmappable {
                encoding: self.0.name(),
            });
        }
        Ok(bytes)
    }
}

impl FromStr for TextEncoding {
    type Err = ConfigError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::for_label(label).ok_or_else(|| {
            ConfigError::InvalidConfig(format!("unknown or decode-only encoding {label}"))
        })
    }
}

/// Measures records and encodes batches for one format/charset pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayloadCodec {
    format: PayloadFormat,
    encoding: TextEncoding,
}

impl PayloadCodec {
    pub fn new(format: PayloadFormat, encoding: TextEncoding) -> Self {
        Self { format, encoding }
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Charset label attached to the payload, if the format is textual.
    pub fn charset(&self) -> Option<&'static str> {
        match self.format {
            PayloadFormat::Json => Some(self.encoding.name()),
            PayloadFormat::MessagePack => None,
        }
    }

    /// Byte length of a single record once encoded.
    pub fn record_size<T: Serialize>(&self, record: &T) -> Result<usize, SerializationError> {
        Ok(self.encode_value(record)?.len())
    }

    /// Bytes added by the array framing around `count` records.
    ///
    /// JSON adds the brackets plus one separator between neighbours.
    /// MessagePack adds the array length header.
    pub fn framing_overhead(&self, count: usize) -> usize {
        match self.format {
            PayloadFormat::Json => 2 + count.saturating_sub(1),
            PayloadFormat::MessagePack => match count {
                0..=15 => 1,
                16..=0xffff => 3,
                _ => 5,
            },
        }
    }

    /// Encode a batch of records as one array payload.
    pub fn encode_batch<T: Serialize>(&self, records: &[T]) -> Result<Vec<u8>, SerializationError> {
        self.encode_value(&records)
    }

    fn encode_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        match self.format {
            PayloadFormat::Json => {
                let text = serde_json::to_string(value)?;
                Ok(self.encoding.encode(&text)?.into_owned())
            }
            PayloadFormat::MessagePack => {
                let mut buf = Vec::with_capacity(128);
                value.serialize(&mut Serializer::new(&mut buf).with_struct_map())?;
                Ok(buf)
            }
        }
    }
}

/// Parse a pre-serialised JSON array into individual records.
///
/// `null` and blank input are treated as an empty list.
pub fn parse_json_array(text: &str) -> Result<Vec<Value>, SerializationError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(records) => Ok(records),
        _ => Err(SerializationError::NotAnArray),
    }
}
