fn main() {
    #[cfg(feature = "cli")]
    yuicompressor::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("yuicompressor: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
