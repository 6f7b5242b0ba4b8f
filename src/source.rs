// Input normalization.
//
// Everything the caller can hand in (text, bytes, a live reader) is reduced
// to a single `ByteStream`. Borrowed readers stay owned by the caller; this
// module never opens or closes anything.

use std::borrow::Cow;
use std::fmt;
use std::io::{Cursor, Read};

use crate::error::ConfigError;

/// A readable source of bytes, consumed once by a strategy.
pub type ByteStream<'a> = Box<dyn Read + Send + 'a>;

/// Source code to compress.
pub enum Input<'a> {
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Stream(ByteStream<'a>),
}

impl<'a> Input<'a> {
    /// Wrap any reader. Pass `&mut reader` to keep ownership.
    pub fn reader<R: Read + Send + 'a>(reader: R) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Accept a dynamically typed value. Only strings are source code;
    /// anything else is rejected.
    pub fn from_value(value: serde_json::Value) -> Result<Input<'static>, ConfigError> {
        match value {
            serde_json::Value::String(s) => Ok(Input::Text(Cow::Owned(s))),
            _ => Err(ConfigError::InvalidInput),
        }
    }

    /// Normalize into a stream positioned at the start of the source.
    pub fn into_stream(self) -> ByteStream<'a> {
        match self {
            Self::Text(Cow::Borrowed(s)) => Box::new(Cursor::new(s.as_bytes())),
            Self::Text(Cow::Owned(s)) => Box::new(Cursor::new(s.into_bytes())),
            Self::Bytes(Cow::Borrowed(b)) => Box::new(Cursor::new(b)),
            Self::Bytes(Cow::Owned(b)) => Box::new(Cursor::new(b)),
            Self::Stream(s) => s,
        }
    }
}

impl fmt::Debug for Input<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(Cow::Borrowed(s))
    }
}

impl From<String> for Input<'_> {
    fn from(s: String) -> Self {
        Self::Text(Cow::Owned(s))
    }
}

impl<'a> From<&'a String> for Input<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(Cow::Borrowed(s.as_str()))
    }
}

impl<'a> From<&'a [u8]> for Input<'a> {
    fn from(b: &'a [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(b))
    }
}

impl From<Vec<u8>> for Input<'_> {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(b))
    }
}

impl<'a> From<ByteStream<'a>> for Input<'a> {
    fn from(s: ByteStream<'a>) -> Self {
        Self::Stream(s)
    }
}

/// Normalize `input` into a [`ByteStream`].
pub fn streamify<'a>(input: impl Into<Input<'a>>) -> ByteStream<'a> {
    input.into().into_stream()
}
