// Command-line front end.
//
// `yuicompressor css|js [options] [INPUT] [OUTPUT]` compresses a file (or
// stdin) and streams the result to a file (or stdout). Options may also come
// from a JSON/TOML file; flags given on the command line win.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use tempfile::NamedTempFile;

use crate::options::{CompressOptions, SourceType};
use crate::source::Input;
use crate::strategy::SubprocessStrategy;
use crate::{Compressor, Error};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Compress CSS and JavaScript with YUI Compressor.
#[derive(Parser, Debug)]
#[command(
    name = "yuicompressor",
    version,
    about = "CSS/JavaScript compressor front end",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress a stylesheet.
    Css(CommonArgs),
    /// Compress a script.
    Js(JsArgs),
    /// Print the strategy, interpreter and jar that would be used.
    Config(EngineArgs),
}

#[derive(Args, Debug, Default)]
struct EngineArgs {
    /// Java interpreter used to launch the jar.
    #[arg(long)]
    java: Option<PathBuf>,

    /// Path to the YUI Compressor jar (default: the bundled one).
    #[arg(long)]
    jar: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Character set of the input.
    #[arg(long)]
    charset: Option<String>,

    /// Insert a line break after this many columns.
    #[arg(long = "line-break")]
    line_break: Option<u32>,

    /// Read options from a .json or .toml file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output file (default: stdout).
    #[arg(long, short = 'o', conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Print the minifier command line and exit.
    #[arg(long = "print-command")]
    print_command: bool,

    /// Input file (default: stdin).
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct JsArgs {
    /// Shorten local variable names.
    #[arg(long)]
    munge: bool,

    /// Keep all semicolons.
    #[arg(long = "preserve-semi")]
    preserve_semi: bool,

    /// Disable micro optimizations.
    #[arg(long = "disable-optimizations")]
    disable_optimizations: bool,

    #[command(flatten)]
    common: CommonArgs,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress(SourceType),
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    print_command: bool,
    /// Options given as flags; layered over the config file at run time.
    flags: CompressOptions,
    config_file: Option<PathBuf>,
    java: Option<PathBuf>,
    jar: Option<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn common_options(command: Command, args: CommonArgs, flags: CompressOptions) -> Options {
    Options {
        command,
        use_stdout: args.stdout,
        force: false,
        quiet: false,
        verbose: 0,
        json_output: false,
        print_command: args.print_command,
        flags: CompressOptions {
            charset: args.charset,
            line_break: args.line_break,
            ..flags
        },
        config_file: args.config,
        java: args.engine.java,
        jar: args.engine.jar,
        input_file: args.input_pos,
        output_file: args.output.or(args.output_pos),
    }
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = match cli.command {
        Cmd::Css(args) => common_options(
            Command::Compress(SourceType::Css),
            args,
            CompressOptions::default(),
        ),
        Cmd::Js(args) => {
            // Switches only ever turn a default off, so absent means "unset".
            let flags = CompressOptions {
                munge: args.munge.then_some(true),
                preserve_semicolons: args.preserve_semi.then_some(true),
                optimize: args.disable_optimizations.then_some(false),
                ..Default::default()
            };
            common_options(Command::Compress(SourceType::Js), args.common, flags)
        }
        Cmd::Config(engine) => Options {
            command: Command::Config,
            use_stdout: false,
            force: false,
            quiet: false,
            verbose: 0,
            json_output: false,
            print_command: false,
            flags: CompressOptions::default(),
            config_file: None,
            java: engine.java,
            jar: engine.jar,
            input_file: None,
            output_file: None,
        },
    };
    opts.force = cli.force;
    opts.quiet = cli.quiet;
    opts.verbose = cli.verbose.min(2);
    opts.json_output = cli.json_output;
    opts
}

// ---------------------------------------------------------------------------
// Option files
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<CompressOptions, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    log::info!("loaded options from {}", path.display());
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            serde_json::from_str(&text).map_err(|e| format!("invalid JSON options: {e}"))
        }
        Some("toml") => toml::from_str(&text).map_err(|e| format!("invalid TOML options: {e}")),
        _ => Err(format!(
            "{}: options file must be .json or .toml",
            path.display()
        )),
    }
}

/// Config file (if any) overlaid by flags, with the subcommand's type forced.
fn build_compress_options(opts: &Options, source_type: SourceType) -> Result<CompressOptions, String> {
    let base = match &opts.config_file {
        Some(path) => load_config(path)?,
        None => CompressOptions::default(),
    };
    Ok(base
        .merge(opts.flags.clone())
        .with_type(source_type))
}

fn build_subprocess(opts: &Options) -> SubprocessStrategy {
    let mut strategy = SubprocessStrategy::new();
    if let Some(java) = &opts.java {
        strategy = strategy.with_java(java);
    }
    if let Some(jar) = &opts.jar {
        strategy = strategy.with_jar(jar);
    }
    strategy
}

/// An explicit interpreter or jar pins the subprocess strategy; otherwise the
/// host is probed.
fn build_compressor(opts: &Options) -> Compressor {
    if opts.java.is_some() || opts.jar.is_some() {
        Compressor::new(build_subprocess(opts))
    } else {
        Compressor::detect()
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config(opts: &Options) -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    let compressor = build_compressor(opts);
    let subprocess = build_subprocess(opts);
    let jar_found = subprocess.jar().is_file();

    if opts.json_output {
        let json = serde_json::json!({
            "version": version,
            "strategy": compressor.strategy_name(),
            "java": subprocess.java(),
            "jar": subprocess.jar(),
            "jar_found": jar_found,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => {
                eprintln!("yuicompressor: {e}");
                return 1;
            }
        }
        return 0;
    }

    println!("yuicompressor version {version} (Rust)");
    println!("STRATEGY={}", compressor.strategy_name());
    println!("JAVA={}", subprocess.java().display());
    println!("JAR={}", subprocess.jar().display());
    println!("JAR_FOUND={}", jar_found as u8);
    0
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

/// Counts bytes as they are pulled from the input.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Where compressed output goes. File output is written to a temporary file
/// in the target's directory and renamed over the target only once
/// compression has succeeded; dropping an uncommitted sink removes it.
enum OutputSink {
    Stdout(BufWriter<io::StdoutLock<'static>>),
    File {
        staged: BufWriter<NamedTempFile>,
        path: PathBuf,
        force: bool,
    },
}

impl OutputSink {
    fn staged(path: &Path, force: bool) -> io::Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)?;
        Ok(Self::File {
            staged: BufWriter::with_capacity(BUF_SIZE, file),
            path: path.to_path_buf(),
            force,
        })
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File { staged, .. } => staged,
        }
    }

    fn commit(self) -> io::Result<()> {
        match self {
            Self::Stdout(mut w) => w.flush(),
            Self::File {
                staged,
                path,
                force,
            } => {
                let file = staged.into_inner().map_err(io::IntoInnerError::into_error)?;
                match std::fs::metadata(&path) {
                    Ok(meta) => file.as_file().set_permissions(meta.permissions())?,
                    Err(_) => default_permissions(&file)?,
                }
                let persisted = if force {
                    file.persist(&path)
                } else {
                    file.persist_noclobber(&path)
                };
                persisted.map(|_| ()).map_err(|e| {
                    io::Error::new(e.error.kind(), format!("{}: {}", path.display(), e.error))
                })
            }
        }
    }
}

// Temporary files are created owner-only; a fresh output file should look
// like one made with `File::create`.
#[cfg(unix)]
fn default_permissions(file: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_: &NamedTempFile) -> io::Result<()> {
    Ok(())
}

fn cmd_compress(opts: &Options, source_type: SourceType) -> i32 {
    let compress_opts = match build_compress_options(opts, source_type) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("yuicompressor: {e}");
            return 1;
        }
    };

    if opts.print_command {
        let req = match compress_opts.resolve() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("yuicompressor: {}", Error::from(e));
                return 1;
            }
        };
        let argv: Vec<String> = build_subprocess(opts)
            .command_line(&req)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        println!("{}", argv.join(" "));
        return 0;
    }

    let reader: Box<dyn Read + Send> = match &opts.input_file {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::with_capacity(BUF_SIZE, f)),
            Err(e) => {
                eprintln!("yuicompressor: input file: {}: {e}", path.display());
                return 1;
            }
        },
        None => Box::new(io::stdin()),
    };

    let mut sink = match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => {
            OutputSink::Stdout(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock()))
        }
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "yuicompressor: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return 1;
            }
            match OutputSink::staged(path, opts.force) {
                Ok(sink) => sink,
                Err(e) => {
                    eprintln!("yuicompressor: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
    };

    let compressor = build_compressor(opts);
    let mut counting = CountingReader {
        inner: reader,
        count: 0,
    };

    let written = compressor.compress_with(
        Input::reader(&mut counting),
        &compress_opts,
        |out| io::copy(out, sink.writer()),
    );
    let output_size = match written {
        Ok(n) => n,
        Err(e) => {
            eprintln!("yuicompressor: {e}");
            return 1;
        }
    };

    if let Err(e) = sink.commit() {
        eprintln!("yuicompressor: output: {e}");
        return 1;
    }

    let input_size = counting.count;
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "yuicompressor: {source_type}: input size: {input_size}, output size: {output_size}, \
             strategy: {}",
            compressor.strategy_name()
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": source_type.as_str(),
            "strategy": compressor.strategy_name(),
            "input_size": input_size,
            "output_size": output_size,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => {
                eprintln!("yuicompressor: {e}");
                return 1;
            }
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    let default_level = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "yuicompressor: warning: -c option overrides output filename: {}",
            path.display()
        );
    }

    let exit_code = match opts.command {
        Command::Compress(source_type) => cmd_compress(&opts, source_type),
        Command::Config => cmd_config(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
