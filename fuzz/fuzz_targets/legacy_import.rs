#![no_main]

use devmatch::legacy::{corpus::read_corpus, xml};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(corpus) = read_corpus(data)
        && let Ok(engine) = corpus.into_engine()
    {
        let _detection = engine.detect("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s");
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _devices = xml::parse_devices(text);
        let _handlers = xml::parse_handlers(text);
    }
});
