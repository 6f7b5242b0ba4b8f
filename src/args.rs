// Command-line flags for the YUI Compressor jar.
//
// The jar's parser accepts these exact spellings only. `--type` and
// `--charset` come first; the order of the rest is fixed so the output is
// deterministic.

use crate::options::CompressionRequest;

/// Build the flag list passed to the jar for `req`.
pub fn command_arguments(req: &CompressionRequest) -> Vec<String> {
    let mut args = vec!["--type".to_string(), req.source_type.as_str().to_string()];

    if !req.charset.is_empty() {
        args.push("--charset".to_string());
        args.push(req.charset.clone());
    }
    if let Some(n) = req.line_break {
        args.push("--line-break".to_string());
        args.push(n.to_string());
    }

    // munge and optimize default to on and are switched off by negated flags;
    // preserve-semi defaults to off.
    if req.is_js() {
        if !req.munge {
            args.push("--nomunge".to_string());
        }
        if req.preserve_semicolons {
            args.push("--preserve-semi".to_string());
        }
        if !req.optimize {
            args.push("--disable-optimizations".to_string());
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CompressOptions, SourceType};

    fn args_for(opts: CompressOptions) -> Vec<String> {
        command_arguments(&opts.resolve().unwrap())
    }

    #[test]
    fn css_defaults() {
        let args = args_for(CompressOptions::for_type(SourceType::Css));
        assert_eq!(args, ["--type", "css", "--charset", "utf-8"]);
    }

    #[test]
    fn css_ignores_js_only_fields() {
        let args = args_for(CompressOptions {
            munge: Some(false),
            preserve_semicolons: Some(true),
            optimize: Some(false),
            line_break: Some(10),
            ..CompressOptions::for_type(SourceType::Css)
        });
        assert_eq!(
            args,
            ["--type", "css", "--charset", "utf-8", "--line-break", "10"]
        );
    }

    #[test]
    fn js_defaults_disable_munging() {
        let args = args_for(CompressOptions::for_type(SourceType::Js));
        assert_eq!(args, ["--type", "js", "--charset", "utf-8", "--nomunge"]);
    }

    #[test]
    fn js_munge_drops_nomunge() {
        let args = args_for(CompressOptions {
            munge: Some(true),
            ..CompressOptions::for_type(SourceType::Js)
        });
        assert!(!args.iter().any(|a| a == "--nomunge"));
    }

    #[test]
    fn js_all_deviations() {
        let args = args_for(CompressOptions {
            charset: Some("ascii".into()),
            line_break: Some(0),
            munge: Some(false),
            preserve_semicolons: Some(true),
            optimize: Some(false),
            ..CompressOptions::for_type(SourceType::Js)
        });
        assert_eq!(
            args,
            [
                "--type",
                "js",
                "--charset",
                "ascii",
                "--line-break",
                "0",
                "--nomunge",
                "--preserve-semi",
                "--disable-optimizations",
            ]
        );
    }

    #[test]
    fn empty_charset_is_not_emitted() {
        let args = args_for(CompressOptions {
            charset: Some(String::new()),
            ..CompressOptions::for_type(SourceType::Css)
        });
        assert_eq!(args, ["--type", "css"]);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let req = CompressOptions {
            line_break: Some(500),
            preserve_semicolons: Some(true),
            ..CompressOptions::for_type(SourceType::Js)
        }
        .resolve()
        .unwrap();
        assert_eq!(command_arguments(&req), command_arguments(&req.clone()));
    }
}
