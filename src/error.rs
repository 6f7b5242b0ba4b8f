// Error taxonomy.
//
// Two families reach callers:
//   - Configuration: bad or missing options, unsupported input. Raised before
//     any process is spawned or native call is made.
//   - Compression: anything that goes wrong once the minifier is running.
//     Always rendered with the `compression failed: ` prefix.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error returned by every public compression entry point.
#[derive(Debug, Error)]
pub enum Error {
    /// Options or input were rejected before compression started.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The minifier failed: native error, non-zero exit, or a pipe fault.
    #[error("compression failed: {0}")]
    Compression(String),
}

impl Error {
    pub(crate) fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// `true` for errors raised while validating options or input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// `true` for errors raised by the minifier or the plumbing around it.
    pub fn is_compression(&self) -> bool {
        matches!(self, Self::Compression(_))
    }
}

/// Reasons an option set or input value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("type required")]
    MissingType,

    #[error("unknown resource type: {0}")]
    UnknownType(String),

    #[error("stream or string required")]
    InvalidInput,

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_errors_carry_uniform_prefix() {
        let e = Error::compression("exit status: 2");
        assert_eq!(e.to_string(), "compression failed: exit status: 2");
        assert!(e.is_compression());
        assert!(!e.is_configuration());
    }

    #[test]
    fn config_errors_convert() {
        let e: Error = ConfigError::UnknownType("html".into()).into();
        assert!(e.is_configuration());
        assert_eq!(
            e.to_string(),
            "configuration error: unknown resource type: html"
        );
    }
}
