#![allow(dead_code)]

use devmatch::{
    BackendKind, DataSetConfig,
    data::{CacheConfig, FormatVersion, builder::DataSetBuilder},
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub(crate) const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; SM-G991B) Chrome/120";
pub(crate) const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17) Safari/605";
pub(crate) const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0) Chrome/120";

pub(crate) const PHONES_JSON: &str = include_str!("../../fixtures/phones.json");
pub(crate) const DEVICES_XML: &str = include_str!("../../fixtures/devices.xml");
pub(crate) const HANDLERS_XML: &str = include_str!("../../fixtures/handlers.xml");

pub(crate) fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub(crate) fn phones() -> DataSetBuilder {
    DataSetBuilder::from_json(PHONES_JSON).unwrap()
}

pub(crate) fn config(backend: BackendKind) -> DataSetConfig {
    DataSetConfig::new()
        .with_backend(backend)
        .with_caches(CacheConfig::uniform(16))
        .with_pool_size(2)
        .with_pool_timeout(Duration::from_secs(5))
}

/// Write the phones data set into `dir`, returning its path.
pub(crate) fn write_phones(dir: &Path, version: FormatVersion) -> PathBuf {
    let path = dir.join(format!("phones-{}.dat", version.as_str()));
    phones().write_to(&path, version).unwrap();
    path
}
