use crate::{Provider, ProviderConfig};
use devmatch_core::ComponentKind::{Browser, Hardware, Software};
use devmatch_data::{
    BackendKind, CacheConfig, DataSet, DataSetConfig, FormatVersion,
    builder::{DataSetBuilder, PropertySource},
};

pub(crate) const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; SM-G991B) Chrome/120";
pub(crate) const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17) Safari/605";
pub(crate) const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0) Chrome/120";

pub(crate) fn phones() -> DataSetBuilder {
    DataSetBuilder::new("phones", jiff::civil::date(2026, 10, 1))
        .with_component(Hardware, 1)
        .with_component(Software, 10)
        .with_component(Browser, 20)
        .with_property("HardwareVendor", Hardware)
        .with_property("HardwareModel", Hardware)
        .with_property_source(PropertySource {
            name: "IsMobile".to_owned(),
            component: Hardware,
            description: None,
            mandatory: true,
            list: false,
            default_value: Some("False".to_owned()),
        })
        .with_property("PlatformName", Software)
        .with_property("PlatformVersion", Software)
        .with_property("BrowserName", Browser)
        .with_property("BrowserVersion", Browser)
        .with_profile(1, Hardware, None, [])
        .with_profile(2, Hardware, None, [("HardwareVendor", "Samsung"), ("IsMobile", "True")])
        .with_profile(3, Hardware, Some(2), [("HardwareModel", "SM-G991B")])
        .with_profile(4, Hardware, Some(3), [])
        .with_profile(
            6,
            Hardware,
            None,
            [("HardwareVendor", "Apple"), ("HardwareModel", "iPhone"), ("IsMobile", "True")],
        )
        .with_profile(10, Software, None, [])
        .with_profile(11, Software, None, [("PlatformName", "Android"), ("PlatformVersion", "14")])
        .with_profile(12, Software, None, [("PlatformName", "iOS"), ("PlatformVersion", "17")])
        .with_profile(13, Software, None, [("PlatformName", "Windows"), ("PlatformVersion", "10")])
        .with_profile(20, Browser, None, [])
        .with_profile(21, Browser, None, [("BrowserName", "Chrome"), ("BrowserVersion", "120")])
        .with_profile(22, Browser, None, [("BrowserName", "Safari"), ("BrowserVersion", "17")])
        .with_signature(ANDROID, [4, 11, 21], 100)
        .with_signature(IPHONE, [6, 12, 22], 80)
        .with_signature(WINDOWS, [13, 21], 90)
}

/// Two signatures at disjoint positions, so a target can hold all nodes
/// of one plus a node of the other.
pub(crate) fn disjoint() -> DataSetBuilder {
    DataSetBuilder::new("disjoint", jiff::civil::date(2026, 10, 1))
        .with_component(Hardware, 1)
        .with_property("HardwareModel", Hardware)
        .with_profile(1, Hardware, None, [])
        .with_profile(2, Hardware, None, [("HardwareModel", "Alpha")])
        .with_profile(3, Hardware, None, [("HardwareModel", "Omega")])
        .with_signature("Alpha/1 Beta/2", [2], 10)
        .with_signature("zzzzzzzzzzzzzzz Omega", [3], 5)
}

pub(crate) fn load(builder: &DataSetBuilder, backend: BackendKind) -> DataSet {
    let config = DataSetConfig::new()
        .with_backend(backend)
        .with_caches(CacheConfig::uniform(32))
        .with_pool_size(2);
    builder
        .build_data_set(FormatVersion::PatternV32, &config)
        .unwrap()
}

pub(crate) fn provider(config: ProviderConfig) -> Provider {
    Provider::with_config(load(&phones(), BackendKind::Memory), config)
}
