// Subprocess strategy.
//
// Runs `<java> -jar <jar> <flags>` and streams the source through the
// child's stdin. Per call, inside one thread scope:
//   - a writer thread copies the input to stdin in 4 KiB chunks, then closes it
//   - a second thread drains stderr, keeping the last 64 KiB
//   - the calling thread hands stdout to the consumer, then drains the rest
// so a child blocked on a full stdout or stderr pipe can never stall the
// writer. The child is reaped before returning.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStderr, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;

use crate::args::command_arguments;
use crate::error::{Error, Result};
use crate::options::CompressionRequest;
use crate::source::ByteStream;

use super::{OutputConsumer, Strategy};

/// File name of the bundled YUI Compressor jar.
pub const JAR_FILE_NAME: &str = "yuicompressor-2.4.2.jar";

/// Interpreter used when neither the strategy nor the request names one.
pub const DEFAULT_JAVA: &str = "java";

const CHUNK_SIZE: usize = 4096;

/// Most stderr kept per call; older output is dropped.
const STDERR_LIMIT: usize = 64 * 1024;

/// Location of the bundled jar: next to the running executable if present,
/// otherwise `vendor/` in the crate directory.
pub fn bundled_jar_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let beside = dir.join(JAR_FILE_NAME);
        if beside.is_file() {
            return beside;
        }
    }
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("vendor")
        .join(JAR_FILE_NAME)
}

// ---------------------------------------------------------------------------
// SubprocessStrategy
// ---------------------------------------------------------------------------

/// Launches the jar as a child process for every call.
#[derive(Debug, Clone)]
pub struct SubprocessStrategy {
    java: PathBuf,
    jar: PathBuf,
}

impl Default for SubprocessStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessStrategy {
    /// `java` from `PATH` and the bundled jar.
    pub fn new() -> Self {
        Self {
            java: PathBuf::from(DEFAULT_JAVA),
            jar: bundled_jar_path(),
        }
    }

    /// Default interpreter for requests that don't override it.
    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }

    pub fn with_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.jar = jar.into();
        self
    }

    pub fn java(&self) -> &Path {
        &self.java
    }

    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// Full argv for `req`, interpreter first.
    pub fn command_line(&self, req: &CompressionRequest) -> Vec<OsString> {
        let java = req.java.as_deref().unwrap_or(&self.java);
        let mut argv = vec![
            java.as_os_str().to_os_string(),
            OsString::from("-jar"),
            self.jar.as_os_str().to_os_string(),
        ];
        argv.extend(command_arguments(req).into_iter().map(OsString::from));
        argv
    }
}

/// What each side of the pipe reported.
struct Outcome {
    consumed: io::Result<()>,
    killed: bool,
    written: io::Result<u64>,
    diagnostics: io::Result<Vec<u8>>,
}

impl Strategy for SubprocessStrategy {
    fn name(&self) -> &'static str {
        "subprocess"
    }

    fn run(
        &self,
        req: &CompressionRequest,
        input: ByteStream<'_>,
        consumer: &mut OutputConsumer<'_>,
    ) -> Result<()> {
        let argv = self.command_line(req);
        log::debug!("spawning {argv:?}");

        let program = Path::new(&argv[0]);
        let mut child = Command::new(program)
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::compression(format!("{}: {e}", program.display())))?;

        let (Some(stdin), Some(mut stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::compression("child process streams unavailable"));
        };

        let outcome = thread::scope(|scope| {
            let writer = scope.spawn(move || pump_input(input, stdin));
            let errors = scope.spawn(move || drain(stderr));

            let consumed = consumer(&mut stdout);
            let killed = consumed.is_err() && child.kill().is_ok();
            // Whatever the consumer left behind still has to leave the pipe.
            let drained = io::copy(&mut stdout, &mut io::sink());

            Outcome {
                consumed: consumed.and(drained.map(|_| ())),
                killed,
                written: join(writer, "input writer"),
                diagnostics: join(errors, "stderr reader"),
            }
        });

        let status = child
            .wait()
            .map_err(|e| Error::compression(format!("waiting for child: {e}")))?;

        finish(status, outcome)
    }
}

/// Decide the call's result. A consumer failure that made us kill the child
/// wins; then a failed exit (stderr as the message); then pipe faults.
fn finish(status: ExitStatus, outcome: Outcome) -> Result<()> {
    let stderr = match &outcome.diagnostics {
        Ok(bytes) => String::from_utf8_lossy(bytes).trim().to_string(),
        Err(_) => String::new(),
    };

    if outcome.killed
        && let Err(e) = &outcome.consumed
    {
        return Err(Error::compression(format!("reading output: {e}")));
    }

    if !status.success() {
        let msg = if stderr.is_empty() {
            status.to_string()
        } else {
            stderr
        };
        return Err(Error::compression(msg));
    }

    outcome
        .consumed
        .map_err(|e| Error::compression(format!("reading output: {e}")))?;
    let written = outcome
        .written
        .map_err(|e| Error::compression(format!("writing input: {e}")))?;
    outcome
        .diagnostics
        .map_err(|e| Error::compression(format!("reading stderr: {e}")))?;

    if !stderr.is_empty() {
        log::warn!("minifier reported: {stderr}");
    }
    log::trace!("subprocess: {written} bytes written, {status}");
    Ok(())
}

fn pump_input(mut input: ByteStream<'_>, mut stdin: ChildStdin) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io::Error::new(e.kind(), format!("source: {e}"))),
        };
        stdin.write_all(&buf[..n])?;
        total += n as u64;
    }
    stdin.flush()?;
    // Dropping stdin here signals end-of-input.
    Ok(total)
}

fn drain(stderr: ChildStderr) -> io::Result<Vec<u8>> {
    keep_tail(stderr, STDERR_LIMIT)
}

/// Read `r` to the end, keeping only its last `limit` bytes.
fn keep_tail(mut r: impl Read, limit: usize) -> io::Result<Vec<u8>> {
    let mut kept = Vec::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match r.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        kept.extend_from_slice(&buf[..n]);
        if kept.len() > limit * 2 {
            kept.drain(..kept.len() - limit);
        }
    }
    if kept.len() > limit {
        kept.drain(..kept.len() - limit);
    }
    Ok(kept)
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, io::Result<T>>, what: &str) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other(format!("{what} panicked"))))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CompressOptions, SourceType};
    use crate::source::{Input, streamify};

    #[test]
    fn command_line_layout() {
        let s = SubprocessStrategy::new()
            .with_java("/usr/bin/java")
            .with_jar("/opt/yui.jar");
        let req = CompressOptions::for_type(SourceType::Css).resolve().unwrap();
        let argv: Vec<String> = s
            .command_line(&req)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            argv,
            [
                "/usr/bin/java",
                "-jar",
                "/opt/yui.jar",
                "--type",
                "css",
                "--charset",
                "utf-8"
            ]
        );
    }

    #[test]
    fn request_java_overrides_strategy_default() {
        let s = SubprocessStrategy::new().with_java("java");
        let req = CompressOptions {
            java: Some("/opt/jdk/bin/java".into()),
            ..CompressOptions::for_type(SourceType::Js)
        }
        .resolve()
        .unwrap();
        assert_eq!(s.command_line(&req)[0], OsString::from("/opt/jdk/bin/java"));
    }

    #[test]
    fn stderr_tail_is_capped() {
        let mut noise = vec![b'a'; 10_000];
        noise.extend_from_slice(b"last words");
        let kept = keep_tail(io::Cursor::new(noise), 100).unwrap();
        assert_eq!(kept.len(), 100);
        assert!(kept.ends_with(b"last words"));

        let short = keep_tail(io::Cursor::new(b"brief".to_vec()), 100).unwrap();
        assert_eq!(short, b"brief");
    }

    #[test]
    fn bundled_jar_has_expected_name() {
        assert!(bundled_jar_path().ends_with(JAR_FILE_NAME));
    }

    #[test]
    fn missing_interpreter_is_a_compression_error() {
        let s = SubprocessStrategy::new().with_java("/nonexistent/bin/java-does-not-exist");
        let req = CompressOptions::for_type(SourceType::Css).resolve().unwrap();
        let err = s
            .run(&req, streamify("a{}"), &mut |r| {
                io::copy(r, &mut io::sink()).map(|_| ())
            })
            .unwrap_err();
        assert!(err.is_compression());
        assert!(err.to_string().starts_with("compression failed: "));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script that stands in for `java`.
        fn fake_java(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-java");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn run(s: &SubprocessStrategy, input: Input<'_>) -> Result<Vec<u8>> {
            let req = CompressOptions::for_type(SourceType::Js).resolve()?;
            let mut out = Vec::new();
            s.run(&req, input.into_stream(), &mut |r| {
                r.read_to_end(&mut out).map(|_| ())
            })?;
            Ok(out)
        }

        #[test]
        fn output_is_the_childs_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "tr -d ' '"));
            let out = run(&s, "var a = 1 ;".into()).unwrap();
            assert_eq!(out, b"vara=1;");
        }

        #[test]
        fn large_input_does_not_deadlock() {
            // Well beyond any pipe buffer, echoed back while still being written.
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "cat"));
            let data: Vec<u8> = b"function f(){return 1;}\n"
                .iter()
                .copied()
                .cycle()
                .take(4 << 20)
                .collect();
            let out = run(&s, Input::from(data.clone())).unwrap();
            assert_eq!(out.len(), data.len());
            assert_eq!(out, data);
        }

        #[test]
        fn noisy_stderr_does_not_deadlock() {
            let dir = tempfile::tempdir().unwrap();
            let script = r#"cat >/dev/null
i=0
while [ $i -lt 2000 ]; do
  echo 'warning: a line long enough to fill the stderr pipe buffer' >&2
  i=$((i+1))
done
echo ok"#;
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), script));
            let out = run(&s, "x".into()).unwrap();
            assert_eq!(out, b"ok\n");
        }

        #[test]
        fn chatty_failure_keeps_only_the_stderr_tail() {
            let dir = tempfile::tempdir().unwrap();
            let script = r#"cat >/dev/null
i=0
while [ $i -lt 4000 ]; do
  echo 'warning: a line long enough to fill the stderr pipe buffer' >&2
  i=$((i+1))
done
echo 'fatal: giving up' >&2
exit 1"#;
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), script));
            let err = run(&s, "x".into()).unwrap_err().to_string();
            assert!(err.len() <= STDERR_LIMIT + "compression failed: ".len());
            assert!(err.ends_with("fatal: giving up"));
        }

        #[test]
        fn args_reach_the_child() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new()
                .with_java(fake_java(dir.path(), "cat >/dev/null\nprintf '%s\\n' \"$*\""))
                .with_jar("/opt/yui.jar");
            let out = run(&s, "x".into()).unwrap();
            assert_eq!(
                String::from_utf8(out).unwrap(),
                "-jar /opt/yui.jar --type js --charset utf-8 --nomunge\n"
            );
        }

        #[test]
        fn non_zero_exit_uses_stderr_as_message() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(
                dir.path(),
                "cat >/dev/null\necho '[ERROR] 1:4:missing ;' >&2\nexit 2",
            ));
            let err = run(&s, "var".into()).unwrap_err();
            assert_eq!(err.to_string(), "compression failed: [ERROR] 1:4:missing ;");
        }

        #[test]
        fn non_zero_exit_without_stderr_reports_status() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "exit 3"));
            let err = run(&s, Input::from(vec![b'a'; 1 << 20])).unwrap_err();
            assert!(err.is_compression());
            assert!(err.to_string().contains("3"), "{err}");
        }

        #[test]
        fn consumer_may_stop_early() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "cat"));
            let req = CompressOptions::for_type(SourceType::Css).resolve().unwrap();
            let data = vec![b'z'; 256 * 1024];
            let mut head = [0u8; 8];
            s.run(&req, streamify(&data[..]), &mut |r| r.read_exact(&mut head))
                .unwrap();
            assert_eq!(&head, b"zzzzzzzz");
        }

        #[test]
        fn consumer_failure_is_wrapped() {
            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "cat"));
            let req = CompressOptions::for_type(SourceType::Css).resolve().unwrap();
            let err = s
                .run(&req, streamify("a{}"), &mut |_| {
                    Err(io::Error::other("sink closed"))
                })
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "compression failed: reading output: sink closed"
            );
        }

        #[test]
        fn failing_source_is_wrapped() {
            struct Broken;
            impl Read for Broken {
                fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                    Err(io::Error::other("disk gone"))
                }
            }

            let dir = tempfile::tempdir().unwrap();
            let s = SubprocessStrategy::new().with_java(fake_java(dir.path(), "cat"));
            let err = run(&s, Input::reader(Broken)).unwrap_err();
            assert!(err.is_compression());
            assert!(err.to_string().contains("disk gone"), "{err}");
        }
    }
}
