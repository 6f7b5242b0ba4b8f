#![no_main]
use libfuzzer_sys::fuzz_target;
use yuicompressor::{CompressOptions, command_arguments};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(opts) = CompressOptions::from_value(value) else {
        return;
    };
    if let Ok(req) = opts.resolve() {
        let args = command_arguments(&req);
        assert_eq!(args[0], "--type");
        assert_eq!(args[1], req.source_type.as_str());
    }
});
