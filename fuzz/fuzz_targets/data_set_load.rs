#![no_main]

use devmatch::{BackendKind, DataSet, DataSetConfig, Provider};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for backend in [BackendKind::Memory, BackendKind::Stream] {
        let config = DataSetConfig::new().with_backend(backend).with_pool_size(1);
        if let Ok(data_set) = DataSet::from_bytes(data.to_vec(), &config) {
            // streamed data may still point at missing entities, which must
            // surface as errors rather than panics
            let provider = Provider::new(data_set);
            if let Ok(found) = provider.match_str("Mozilla/5.0 (Linux; Android 14)") {
                let _summary = found.summary();
            }
        }
    }
});
