// In-process strategy.
//
// Used when the host can call the minifier directly. The binding is
// registered once per process, and only until the default compressor has
// been chosen.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::options::{CompressionRequest, SourceType};
use crate::source::ByteStream;

use super::{OutputConsumer, Strategy};

/// Error type returned by native bindings.
pub type NativeError = Box<dyn std::error::Error + Send + Sync>;

/// Settings forwarded to the CSS compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssSettings<'a> {
    pub charset: &'a str,
    pub line_break: Option<u32>,
}

/// Settings forwarded to the JavaScript compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsSettings<'a> {
    pub charset: &'a str,
    pub line_break: Option<u32>,
    pub munge: bool,
    pub preserve_semicolons: bool,
    pub optimize: bool,
}

/// The minifier's in-process API.
pub trait NativeMinifier: Send + Sync {
    fn compress_css(
        &self,
        source: &[u8],
        settings: &CssSettings<'_>,
    ) -> Result<Vec<u8>, NativeError>;

    fn compress_js(&self, source: &[u8], settings: &JsSettings<'_>)
    -> Result<Vec<u8>, NativeError>;
}

struct Registry {
    binding: Option<Arc<dyn NativeMinifier>>,
    // Set once the process-wide strategy has been chosen.
    sealed: bool,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    binding: None,
    sealed: false,
});

fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register the process-wide native binding. Returns `false` if one was
/// already registered or the process-wide strategy has been chosen.
pub fn register(binding: impl NativeMinifier + 'static) -> bool {
    let mut reg = registry();
    if reg.sealed || reg.binding.is_some() {
        return false;
    }
    reg.binding = Some(Arc::new(binding));
    true
}

/// The registered binding, if any.
pub fn probe() -> Option<Arc<dyn NativeMinifier>> {
    registry().binding.clone()
}

/// Like [`probe`], but also closes registration. Checking and sealing happen
/// under the same lock as [`register`].
pub(crate) fn seal() -> Option<Arc<dyn NativeMinifier>> {
    let mut reg = registry();
    reg.sealed = true;
    reg.binding.clone()
}

// ---------------------------------------------------------------------------
// NativeStrategy
// ---------------------------------------------------------------------------

/// Calls a [`NativeMinifier`] directly. No command line is built.
#[derive(Clone)]
pub struct NativeStrategy {
    binding: Arc<dyn NativeMinifier>,
}

impl NativeStrategy {
    pub fn new(binding: impl NativeMinifier + 'static) -> Self {
        Self::from_shared(Arc::new(binding))
    }

    pub fn from_shared(binding: Arc<dyn NativeMinifier>) -> Self {
        Self { binding }
    }
}

impl Strategy for NativeStrategy {
    fn name(&self) -> &'static str {
        "native"
    }

    fn run(
        &self,
        req: &CompressionRequest,
        mut input: ByteStream<'_>,
        consumer: &mut OutputConsumer<'_>,
    ) -> Result<()> {
        // Single synchronous call, so the whole source is read up front.
        let mut source = Vec::new();
        input
            .read_to_end(&mut source)
            .map_err(|e| Error::compression(format!("reading input: {e}")))?;

        let result = match req.source_type {
            SourceType::Css => self.binding.compress_css(
                &source,
                &CssSettings {
                    charset: &req.charset,
                    line_break: req.line_break,
                },
            ),
            SourceType::Js => self.binding.compress_js(
                &source,
                &JsSettings {
                    charset: &req.charset,
                    line_break: req.line_break,
                    munge: req.munge,
                    preserve_semicolons: req.preserve_semicolons,
                    optimize: req.optimize,
                },
            ),
        };
        let output = result.map_err(|e| Error::compression(e.to_string()))?;
        log::trace!(
            "native {}: {} bytes in, {} bytes out",
            req.source_type,
            source.len(),
            output.len()
        );

        consumer(&mut Cursor::new(output))
            .map_err(|e| Error::compression(format!("reading output: {e}")))
    }
}
