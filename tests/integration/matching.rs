use super::utils::{self, ANDROID, IPHONE, WINDOWS};
use devmatch::{
    BackendKind, DataSet, Detector, Match, Method, Provider, ProviderConfig,
    data::FormatVersion,
};
use quickcheck_macros::quickcheck;

fn provider(backend: BackendKind) -> Provider {
    let data_set = utils::phones()
        .build_data_set(FormatVersion::PatternV32, &utils::config(backend))
        .unwrap();
    Provider::new(data_set)
}

#[test]
fn exact_pattern_has_no_difference() {
    for backend in [BackendKind::Memory, BackendKind::Stream] {
        let provider = provider(backend);
        for target in [ANDROID, IPHONE, WINDOWS] {
            let found = provider.match_str(target).unwrap();
            assert_eq!(found.method(), Method::Exact, "{target}");
            assert_eq!(found.difference(), 0, "{target}");
            assert_eq!(found.signature_pattern().unwrap().as_deref(), Some(target));
        }
    }
}

#[test]
fn one_flipped_character_is_near_or_close() {
    let provider = provider(BackendKind::Stream);
    for (target, device_id) in [
        (ANDROID.replace("Linux", "Linuz"), "4-11-21"),
        (IPHONE.replace("Safari", "Sofari"), "6-12-22"),
        (WINDOWS.replace("Windows", "Windowz"), "1-13-21"),
    ] {
        let found = provider.match_str(&target).unwrap();
        assert!(
            matches!(found.method(), Method::Nearest | Method::Closest),
            "{target}: {}",
            found.method()
        );
        assert!(found.difference() > 0, "{target}");
        assert_eq!(found.device_id().to_string(), device_id, "{target}");
    }
}

#[test]
fn empty_target_is_unknown_everywhere() {
    let provider = provider(BackendKind::Memory);
    let found = provider.match_str("").unwrap();
    assert_eq!(found.method(), Method::None);
    assert!(found.signature().is_none());

    let summary = found.summary().unwrap();
    assert_eq!(summary.values.len(), provider.data_set().properties().len());
    for (property, values) in &summary.values {
        assert!(values.is_unknown(), "{property}");
        assert_eq!(values.to_string(), "Unknown", "{property}");
    }
    assert_eq!(summary.device_id, "1-10-20");
}

#[test]
fn grandchild_profile_reads_root_values() {
    let provider = provider(BackendKind::Stream);
    let data_set: &DataSet = provider.data_set();

    let grandchild = data_set.find_profile(4).unwrap().unwrap();
    assert!(grandchild.values().is_empty());

    let found = provider.match_device_id("4").unwrap();
    assert_eq!(&*found.value("HardwareVendor").unwrap(), "Samsung");
    assert_eq!(&*found.value("HardwareModel").unwrap(), "SM-G991B");
}

#[test]
fn device_ids_round_trip() {
    let provider = provider(BackendKind::Stream);
    for target in [ANDROID, IPHONE, WINDOWS, "Mozilla/5.0 (Linux; Android 13)", ""] {
        let found = provider.match_str(target).unwrap();
        let id = found.device_id();

        let again = provider.match_device_id(&id.to_string()).unwrap();
        let by_bytes = provider.match_device_id_bytes(&id.to_bytes()).unwrap();
        for other in [&again, &by_bytes] {
            assert_eq!(other.device_id(), id, "{target}");
            assert_eq!(profile_ids(other), profile_ids(&found), "{target}");
        }
    }
}

fn profile_ids(found: &Match) -> Vec<u32> {
    found.profiles().iter().map(|profile| profile.profile_id()).collect()
}

#[test]
fn headers_combine_device_and_browser() {
    let provider = Provider::with_config(
        utils::phones()
            .build_data_set(FormatVersion::PatternV31, &utils::config(BackendKind::Memory))
            .unwrap(),
        ProviderConfig::new().with_unknown_value("?"),
    );
    let found = provider
        .match_headers([("User-Agent", WINDOWS), ("X-OperaMini-Phone-UA", IPHONE)])
        .unwrap();
    assert!(found.has_secondary());
    assert_eq!(&*found.value("HardwareVendor").unwrap(), "Apple");
    assert_eq!(&*found.value("PlatformName").unwrap(), "iOS");
    assert_eq!(&*found.value("BrowserName").unwrap(), "Chrome");
    assert_eq!(&*found.value("NoSuchProperty").unwrap(), "?");
}

#[test]
fn repeated_matches_are_identical() {
    let uncached = Provider::with_config(
        utils::phones()
            .build_data_set(FormatVersion::PatternV32, &utils::config(BackendKind::Stream))
            .unwrap(),
        ProviderConfig::new().with_cache_capacity(0),
    );
    let cached = provider(BackendKind::Memory);
    for target in [ANDROID, "Mozilla/5.0 (iPhone; CPU OS 16) Chrome/119", "curl/8.0", ""] {
        let first = uncached.match_str(target).unwrap();
        let second = uncached.match_str(target).unwrap();
        let third = cached.match_str(target).unwrap();
        assert_eq!(first.device_id(), second.device_id(), "{target}");
        assert_eq!(first.method(), second.method(), "{target}");
        assert_eq!(first.device_id(), third.device_id(), "{target}");
        assert_eq!(first.method(), third.method(), "{target}");
    }
}

#[test]
fn detector_seam() {
    fn detect_all<D: Detector>(detector: &D, targets: &[&str]) -> usize
    where
        D::Error: std::fmt::Debug,
    {
        targets
            .iter()
            .map(|target| detector.detect(target).unwrap())
            .count()
    }

    let provider = provider(BackendKind::Memory);
    assert_eq!(detect_all(&provider, &[ANDROID, IPHONE, ""]), 3);
    assert_eq!(provider.detections(), 3);
    assert_eq!(provider.method_count(Method::Exact), 2);
    assert_eq!(provider.method_count(Method::None), 1);
}

#[quickcheck]
fn arbitrary_bytes_always_match(target: Vec<u8>) -> bool {
    let provider = provider(BackendKind::Memory);
    let found = provider.match_bytes(&target).unwrap();
    found.device_id().profile_ids().len() == 3
        && (found.method() != Method::None || found.signature().is_none())
}
