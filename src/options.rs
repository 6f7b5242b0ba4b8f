// Option resolution.
//
// `CompressOptions` is what callers hand in: every field optional, loadable
// from JSON/TOML with camelCase keys. `resolve()` merges it with the
// per-language defaults table into a `CompressionRequest`, which is what the
// strategies consume.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default character set passed to the minifier.
pub const DEFAULT_CHARSET: &str = "utf-8";

// ---------------------------------------------------------------------------
// Source type
// ---------------------------------------------------------------------------

/// The kind of resource being compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Css,
    Js,
}

impl SourceType {
    /// Name as understood by the minifier's `--type` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "css" => Ok(Self::Css),
            "js" => Ok(Self::Js),
            _ => Err(ConfigError::UnknownType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw options
// ---------------------------------------------------------------------------

/// User-supplied options. Unset fields fall back to the defaults for the
/// resource type when resolved.
///
/// The serialized form uses the keys `type`, `charset`, `lineBreak`, `munge`,
/// `preserveSemicolons`, `optimize` and `java`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressOptions {
    /// `"css"` or `"js"`. Kept as a string so unknown values surface as a
    /// configuration error at resolve time rather than at parse time.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Character encoding of the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Insert a line break after this many columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_break: Option<u32>,
    /// Shorten local variable names (js only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub munge: Option<bool>,
    /// Keep every semicolon (js only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_semicolons: Option<bool>,
    /// Enable micro optimizations (js only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize: Option<bool>,
    /// Interpreter used to launch the jar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,
}

impl CompressOptions {
    /// Options with only the resource type set.
    pub fn for_type(source_type: SourceType) -> Self {
        Self {
            source_type: Some(source_type.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Parse the dynamic mapping form, e.g. `{"type": "js", "munge": true}`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidOptions(e.to_string()))
    }

    /// Return a copy with the resource type forced to `source_type`.
    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type.as_str().to_string());
        self
    }

    /// Overlay `other` on top of `self`: every field set in `other` wins.
    pub fn merge(self, other: CompressOptions) -> Self {
        Self {
            source_type: other.source_type.or(self.source_type),
            charset: other.charset.or(self.charset),
            line_break: other.line_break.or(self.line_break),
            munge: other.munge.or(self.munge),
            preserve_semicolons: other.preserve_semicolons.or(self.preserve_semicolons),
            optimize: other.optimize.or(self.optimize),
            java: other.java.or(self.java),
        }
    }

    /// Merge with the defaults for the requested type.
    ///
    /// Fails with [`ConfigError::MissingType`] when no type was given and
    /// [`ConfigError::UnknownType`] when it is neither `css` nor `js`.
    pub fn resolve(&self) -> Result<CompressionRequest, ConfigError> {
        let raw = self.source_type.as_deref().ok_or(ConfigError::MissingType)?;
        let source_type: SourceType = raw.parse()?;
        let defaults = CompressionRequest::defaults(source_type);

        Ok(CompressionRequest {
            source_type,
            charset: self.charset.clone().unwrap_or(defaults.charset),
            line_break: self.line_break.or(defaults.line_break),
            munge: self.munge.unwrap_or(defaults.munge),
            preserve_semicolons: self
                .preserve_semicolons
                .unwrap_or(defaults.preserve_semicolons),
            optimize: self.optimize.unwrap_or(defaults.optimize),
            java: self.java.clone().or(defaults.java),
        })
    }
}

// ---------------------------------------------------------------------------
// Resolved request
// ---------------------------------------------------------------------------

/// A fully resolved compression request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    pub source_type: SourceType,
    pub charset: String,
    pub line_break: Option<u32>,
    pub munge: bool,
    pub preserve_semicolons: bool,
    pub optimize: bool,
    /// Per-call interpreter override; `None` uses the strategy's default.
    pub java: Option<PathBuf>,
}

impl CompressionRequest {
    /// The defaults table. CSS carries the js-only fields too, but they are
    /// never forwarded for CSS.
    pub fn defaults(source_type: SourceType) -> Self {
        Self {
            source_type,
            charset: DEFAULT_CHARSET.to_string(),
            line_break: None,
            munge: false,
            preserve_semicolons: false,
            optimize: true,
            java: None,
        }
    }

    pub fn is_js(&self) -> bool {
        self.source_type == SourceType::Js
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn js() -> CompressOptions {
        CompressOptions::for_type(SourceType::Js)
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = CompressOptions::default().resolve().unwrap_err();
        assert_eq!(err, ConfigError::MissingType);
        assert_eq!(err.to_string(), "type required");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let opts = CompressOptions {
            source_type: Some("html".into()),
            ..Default::default()
        };
        assert_eq!(
            opts.resolve().unwrap_err(),
            ConfigError::UnknownType("html".into())
        );
    }

    #[test]
    fn type_names_must_match_exactly() {
        assert_eq!("js".parse::<SourceType>().unwrap(), SourceType::Js);
        assert_eq!("css".parse::<SourceType>().unwrap(), SourceType::Css);
        for name in ["JS", " css ", "Css"] {
            let opts = CompressOptions {
                source_type: Some(name.into()),
                ..Default::default()
            };
            assert_eq!(
                opts.resolve().unwrap_err(),
                ConfigError::UnknownType(name.into())
            );
        }
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let req = js().resolve().unwrap();
        assert_eq!(req, CompressionRequest::defaults(SourceType::Js));
        assert_eq!(req.charset, "utf-8");
        assert_eq!(req.line_break, None);
        assert!(!req.munge);
        assert!(!req.preserve_semicolons);
        assert!(req.optimize);
    }

    #[test]
    fn charset_override_alone() {
        let req = CompressOptions {
            charset: Some("iso-8859-1".into()),
            ..js()
        }
        .resolve()
        .unwrap();
        assert_eq!(req.charset, "iso-8859-1");
        assert_eq!(
            req,
            CompressionRequest {
                charset: "iso-8859-1".into(),
                ..CompressionRequest::defaults(SourceType::Js)
            }
        );
    }

    #[test]
    fn line_break_override_alone() {
        let req = CompressOptions {
            line_break: Some(0),
            ..js()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            req,
            CompressionRequest {
                line_break: Some(0),
                ..CompressionRequest::defaults(SourceType::Js)
            }
        );
    }

    #[test]
    fn munge_override_alone() {
        let req = CompressOptions {
            munge: Some(true),
            ..js()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            req,
            CompressionRequest {
                munge: true,
                ..CompressionRequest::defaults(SourceType::Js)
            }
        );
    }

    #[test]
    fn preserve_semicolons_override_alone() {
        let req = CompressOptions {
            preserve_semicolons: Some(true),
            ..js()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            req,
            CompressionRequest {
                preserve_semicolons: true,
                ..CompressionRequest::defaults(SourceType::Js)
            }
        );
    }

    #[test]
    fn optimize_override_alone() {
        let req = CompressOptions {
            optimize: Some(false),
            ..js()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            req,
            CompressionRequest {
                optimize: false,
                ..CompressionRequest::defaults(SourceType::Js)
            }
        );
    }

    #[test]
    fn mapping_form_uses_camel_case_keys() {
        let opts = CompressOptions::from_value(json!({
            "type": "js",
            "lineBreak": 80,
            "preserveSemicolons": true,
            "munge": true,
            "java": "/opt/jdk/bin/java",
        }))
        .unwrap();
        let req = opts.resolve().unwrap();
        assert_eq!(req.line_break, Some(80));
        assert!(req.preserve_semicolons);
        assert!(req.munge);
        assert_eq!(req.java, Some(PathBuf::from("/opt/jdk/bin/java")));
    }

    #[test]
    fn mapping_form_rejects_negative_line_break() {
        let err = CompressOptions::from_value(json!({"type": "css", "lineBreak": -1})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
    }

    #[test]
    fn mapping_form_rejects_non_objects() {
        assert!(CompressOptions::from_value(json!(42)).is_err());
    }

    #[test]
    fn merge_prefers_overlay() {
        let base = CompressOptions {
            charset: Some("ascii".into()),
            munge: Some(true),
            ..js()
        };
        let overlay = CompressOptions {
            munge: Some(false),
            line_break: Some(120),
            ..Default::default()
        };
        let merged = base.merge(overlay);
        assert_eq!(merged.source_type.as_deref(), Some("js"));
        assert_eq!(merged.charset.as_deref(), Some("ascii"));
        assert_eq!(merged.munge, Some(false));
        assert_eq!(merged.line_break, Some(120));
    }

    #[test]
    fn with_type_overrides_given_type() {
        let opts = CompressOptions {
            source_type: Some("bogus".into()),
            ..Default::default()
        }
        .with_type(SourceType::Css);
        assert_eq!(opts.resolve().unwrap().source_type, SourceType::Css);
    }
}
