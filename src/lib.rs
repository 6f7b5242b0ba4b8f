//! YUI Compressor front end: compress CSS and JavaScript by delegating to the
//! YUI Compressor minifier.
//!
//! The crate provides:
//! - Option resolution against per-language defaults (`options`)
//! - Command-line synthesis for the minifier jar (`args`)
//! - Input normalization (`source`)
//! - Two execution strategies (`strategy`): an in-process binding, or a
//!   `java -jar` child process with piped stdio
//! - An optional CLI (`cli` feature)
//!
//! The process-wide strategy is picked once, on first use: native if a
//! binding was registered with [`register_native`], subprocess otherwise.
//!
//! # Quick Start
//!
//! ```no_run
//! use yuicompressor::CompressOptions;
//!
//! let css = yuicompressor::compress_css(".a { color: red; }", &CompressOptions::default()).unwrap();
//!
//! let js = yuicompressor::compress_js(
//!     "var longVariableName = 1;",
//!     &CompressOptions { munge: Some(true), ..Default::default() },
//! )
//! .unwrap();
//! # let _ = (css, js);
//! ```
//!
//! Output can also be streamed instead of buffered:
//!
//! ```no_run
//! use std::io;
//! use yuicompressor::CompressOptions;
//!
//! let mut file = std::fs::File::open("app.js").unwrap();
//! yuicompressor::compress_js_with(
//!     yuicompressor::Input::reader(&mut file),
//!     &CompressOptions::default(),
//!     |out| io::copy(out, &mut io::stdout().lock()),
//! )
//! .unwrap();
//! ```

use std::io::{self, Read};
use std::sync::OnceLock;

pub mod args;
pub mod error;
pub mod options;
pub mod source;
pub mod strategy;

#[cfg(feature = "cli")]
pub mod cli;

pub use args::command_arguments;
pub use error::{ConfigError, Error, Result};
pub use options::{CompressOptions, CompressionRequest, SourceType};
pub use source::{ByteStream, Input, streamify};
pub use strategy::{NativeMinifier, NativeStrategy, Strategy, SubprocessStrategy};

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Runs compressions through one fixed strategy.
pub struct Compressor {
    strategy: Box<dyn Strategy>,
}

impl Compressor {
    pub fn new(strategy: impl Strategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Probe the host: native if a binding is registered, subprocess otherwise.
    pub fn detect() -> Self {
        Self {
            strategy: strategy::detect(),
        }
    }

    /// Name of the strategy in use (`"native"` or `"subprocess"`).
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Compress and return the output as a string.
    ///
    /// `options.source_type` must be set; see [`Compressor::compress_css`] and
    /// [`Compressor::compress_js`] for the typed shortcuts.
    pub fn compress<'a>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
    ) -> Result<String> {
        self.compress_with(input, options, |out| {
            let mut text = String::new();
            out.read_to_string(&mut text)?;
            Ok(text)
        })
    }

    /// Compress and hand the output stream to `consumer`.
    pub fn compress_with<'a, T, F>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
        consumer: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let req = options.resolve()?;
        let stream = input.into().into_stream();

        let mut consumer = Some(consumer);
        let mut produced = None;
        self.strategy.run(&req, stream, &mut |out| {
            let f = consumer
                .take()
                .ok_or_else(|| io::Error::other("output already consumed"))?;
            produced = Some(f(out)?);
            Ok(())
        })?;

        produced.ok_or_else(|| Error::compression("minifier produced no output stream"))
    }

    pub fn compress_css<'a>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
    ) -> Result<String> {
        self.compress(input, &options.clone().with_type(SourceType::Css))
    }

    pub fn compress_css_with<'a, T, F>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
        consumer: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        self.compress_with(input, &options.clone().with_type(SourceType::Css), consumer)
    }

    pub fn compress_js<'a>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
    ) -> Result<String> {
        self.compress(input, &options.clone().with_type(SourceType::Js))
    }

    pub fn compress_js_with<'a, T, F>(
        &self,
        input: impl Into<Input<'a>>,
        options: &CompressOptions,
        consumer: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        self.compress_with(input, &options.clone().with_type(SourceType::Js), consumer)
    }
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Process-wide default
// ---------------------------------------------------------------------------

static DEFAULT: OnceLock<Compressor> = OnceLock::new();

/// The process-wide compressor, chosen on first use and never re-evaluated.
pub fn default_compressor() -> &'static Compressor {
    DEFAULT.get_or_init(|| Compressor {
        strategy: strategy::select_default(),
    })
}

/// Register an in-process minifier binding.
///
/// Returns `false` if a binding was already registered or the default
/// compressor has already been chosen.
pub fn register_native(binding: impl NativeMinifier + 'static) -> bool {
    strategy::native::register(binding)
}

/// Compress with the default compressor. `options.source_type` is required.
pub fn compress<'a>(input: impl Into<Input<'a>>, options: &CompressOptions) -> Result<String> {
    default_compressor().compress(input, options)
}

/// Streaming form of [`compress`].
pub fn compress_with<'a, T, F>(
    input: impl Into<Input<'a>>,
    options: &CompressOptions,
    consumer: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn Read) -> io::Result<T>,
{
    default_compressor().compress_with(input, options, consumer)
}

/// Compress CSS. Options `charset` and `lineBreak` apply.
pub fn compress_css<'a>(input: impl Into<Input<'a>>, options: &CompressOptions) -> Result<String> {
    default_compressor().compress_css(input, options)
}

/// Streaming form of [`compress_css`].
pub fn compress_css_with<'a, T, F>(
    input: impl Into<Input<'a>>,
    options: &CompressOptions,
    consumer: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn Read) -> io::Result<T>,
{
    default_compressor().compress_css_with(input, options, consumer)
}

/// Compress JavaScript. Besides `charset` and `lineBreak`, `munge` (default
/// off), `preserveSemicolons` (default off) and `optimize` (default on) apply.
pub fn compress_js<'a>(input: impl Into<Input<'a>>, options: &CompressOptions) -> Result<String> {
    default_compressor().compress_js(input, options)
}

/// Streaming form of [`compress_js`].
pub fn compress_js_with<'a, T, F>(
    input: impl Into<Input<'a>>,
    options: &CompressOptions,
    consumer: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn Read) -> io::Result<T>,
{
    default_compressor().compress_js_with(input, options, consumer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
