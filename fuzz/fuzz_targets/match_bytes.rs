#![no_main]
#![expect(clippy::unwrap_used, reason = "a failing match is what we are looking for")]

use devmatch::{
    ComponentKind, DataSetConfig, Provider, ProviderConfig,
    data::{FormatVersion, builder::DataSetBuilder},
};
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

static PROVIDER: LazyLock<Provider> = LazyLock::new(|| {
    let data_set = DataSetBuilder::new("fuzz", jiff::civil::date(2026, 1, 1))
        .with_component(ComponentKind::Hardware, 1)
        .with_component(ComponentKind::Browser, 10)
        .with_property("HardwareVendor", ComponentKind::Hardware)
        .with_property("BrowserName", ComponentKind::Browser)
        .with_profile(1, ComponentKind::Hardware, None, [])
        .with_profile(2, ComponentKind::Hardware, None, [("HardwareVendor", "Samsung")])
        .with_profile(3, ComponentKind::Hardware, Some(2), [])
        .with_profile(10, ComponentKind::Browser, None, [])
        .with_profile(11, ComponentKind::Browser, None, [("BrowserName", "Chrome")])
        .with_signature("Mozilla/5.0 (Linux; Android 14; SM-G991B) Chrome/120", [3, 11], 10)
        .with_signature("Mozilla/5.0 (Windows NT 10.0) Chrome/120", [11], 5)
        .build_data_set(FormatVersion::PatternV32, &DataSetConfig::default())
        .unwrap();
    Provider::with_config(data_set, ProviderConfig::new().with_cache_capacity(0))
});

fuzz_target!(|data: &[u8]| {
    let found = PROVIDER.match_bytes(data).unwrap();
    found.summary().unwrap();
    if let Ok(found) = PROVIDER.match_device_id_bytes(data) {
        found.summary().unwrap();
    }
});
