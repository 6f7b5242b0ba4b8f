// Execution strategies.
//
// - `native`     — NativeStrategy: in-process call through a registered binding
// - `subprocess` — SubprocessStrategy: `java -jar` child with piped stdio
//
// A strategy receives a resolved request plus the normalized input and hands
// the compressed output to a consumer exactly once.

use std::io::{self, Read};

use crate::error::Result;
use crate::options::CompressionRequest;
use crate::source::ByteStream;

pub mod native;
pub mod subprocess;

pub use native::{CssSettings, JsSettings, NativeError, NativeMinifier, NativeStrategy};
pub use subprocess::{DEFAULT_JAVA, JAR_FILE_NAME, SubprocessStrategy};

/// Receives the compressed output as a stream.
pub type OutputConsumer<'c> = dyn FnMut(&mut dyn Read) -> io::Result<()> + 'c;

/// A way of running the minifier.
///
/// Implementations must call `consumer` exactly once on success and must
/// turn every failure into [`Error::Compression`](crate::Error::Compression).
pub trait Strategy: Send + Sync {
    /// Short name for diagnostics (`"native"`, `"subprocess"`).
    fn name(&self) -> &'static str;

    /// Compress `input` according to `req`, streaming the result into
    /// `consumer`.
    fn run(
        &self,
        req: &CompressionRequest,
        input: ByteStream<'_>,
        consumer: &mut OutputConsumer<'_>,
    ) -> Result<()>;
}

/// Pick a strategy: native when a binding has been registered, the
/// subprocess otherwise.
pub fn detect() -> Box<dyn Strategy> {
    from_binding(native::probe())
}

/// [`detect`] for the process-wide default. Registration is closed in the
/// same step, so a binding is either seen here or refused.
pub(crate) fn select_default() -> Box<dyn Strategy> {
    from_binding(native::seal())
}

fn from_binding(binding: Option<std::sync::Arc<dyn NativeMinifier>>) -> Box<dyn Strategy> {
    match binding {
        Some(binding) => {
            log::debug!("native minifier binding available, using in-process strategy");
            Box::new(NativeStrategy::from_shared(binding))
        }
        None => {
            let strategy = SubprocessStrategy::new();
            log::debug!(
                "no native minifier binding, using subprocess strategy ({} -jar {})",
                strategy.java().display(),
                strategy.jar().display()
            );
            Box::new(strategy)
        }
    }
}
