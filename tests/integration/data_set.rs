use super::utils::{self, ANDROID, IPHONE, WINDOWS};
use devmatch::{
    BackendKind, DataSet, DataSetError, Method, Provider,
    data::{FormatVersion, builder::DataSetBuilder},
};

#[test]
fn json_source_builds_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    for version in [FormatVersion::PatternV31, FormatVersion::PatternV32] {
        let path = utils::write_phones(dir.path(), version);
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let data_set = DataSet::open(&path, &utils::config(backend)).unwrap();
            assert_eq!(data_set.name(), "phones");
            assert_eq!(data_set.version(), version);
            assert_eq!(data_set.backend_kind(), backend);
            assert_eq!(data_set.published(), jiff::civil::date(2026, 10, 1));
            assert_eq!(data_set.signature_count(), 3);
            assert_eq!(data_set.profile_count(), 12);
            assert_eq!(data_set.components().len(), 3);
            assert_eq!(data_set.properties().len(), 8);
        }
    }
}

#[test]
fn every_layout_and_backend_matches_alike() {
    let dir = tempfile::tempdir().unwrap();
    let flipped = ANDROID.replace("Linux", "Xinux");
    let renumbered = ANDROID.replace("Chrome/120", "Chrome/121");
    let targets = [ANDROID, IPHONE, WINDOWS, flipped.as_str(), renumbered.as_str(), ""];

    let reference = Provider::new(
        DataSet::open(
            utils::write_phones(dir.path(), FormatVersion::PatternV32),
            &utils::config(BackendKind::Memory),
        )
        .unwrap(),
    );
    let expected: Vec<_> = targets
        .iter()
        .map(|target| {
            let found = reference.match_str(target).unwrap();
            (found.device_id(), found.method(), found.difference())
        })
        .collect();

    for version in [FormatVersion::PatternV31, FormatVersion::PatternV32] {
        let path = utils::write_phones(dir.path(), version);
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let provider = Provider::new(DataSet::open(&path, &utils::config(backend)).unwrap());
            for (target, expected) in targets.iter().zip(&expected) {
                let found = provider.match_str(target).unwrap();
                assert_eq!(
                    (found.device_id(), found.method(), found.difference()),
                    *expected,
                    "{version} / {backend}: {target:?}"
                );
            }
        }
    }
}

#[test]
fn lookups_by_id_and_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = utils::write_phones(dir.path(), FormatVersion::PatternV32);
    let data_set = DataSet::open(&path, &utils::config(BackendKind::Stream)).unwrap();

    let samsung = data_set.find_profile(3).unwrap().unwrap();
    assert_eq!(samsung.profile_id(), 3);
    assert!(data_set.find_profile(5).unwrap().is_none());

    let mobile = data_set.find_profiles("IsMobile", "True").unwrap();
    let mut ids: Vec<_> = mobile.iter().map(|profile| profile.profile_id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, [2, 6]);
    assert!(data_set.find_profiles("IsMobile", "Maybe").unwrap().is_empty());
    assert!(data_set.find_profiles("NoSuchProperty", "True").unwrap().is_empty());

    let languages = data_set.property("Languages").unwrap();
    assert!(languages.is_list());
    let chrome = data_set.find_profile(21).unwrap().unwrap();
    let values = data_set.profile_values(&chrome, languages).unwrap();
    let values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
    assert_eq!(values, ["en", "nl"]);
}

#[test]
fn list_property_values_reach_the_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = utils::write_phones(dir.path(), FormatVersion::PatternV31);
    let provider =
        Provider::new(DataSet::open(&path, &utils::config(BackendKind::Memory)).unwrap());

    let found = provider.match_str(WINDOWS).unwrap();
    let languages = found.values("Languages").unwrap();
    assert_eq!(languages.iter().collect::<Vec<_>>(), ["en", "nl"]);
    assert_eq!(languages.to_string(), "en|nl");

    let safari = provider.match_str(IPHONE).unwrap();
    assert!(safari.values("Languages").unwrap().is_unknown());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    for backend in [BackendKind::Memory, BackendKind::Stream] {
        let err =
            DataSet::open(dir.path().join("missing.dat"), &utils::config(backend)).unwrap_err();
        assert!(matches!(err, DataSetError::Io(_)), "{backend}: {err}");
        assert!(!err.is_format());
    }
}

#[test]
fn truncated_files_fail_fast() {
    let bytes = utils::phones().build(FormatVersion::PatternV32).unwrap();
    let dir = tempfile::tempdir().unwrap();
    for len in [7, 8, 19, 20, bytes.len() / 3, bytes.len() / 2, bytes.len() - 1] {
        let path = dir.path().join(format!("truncated-{len}.dat"));
        std::fs::write(&path, &bytes[..len]).unwrap();
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let err = DataSet::open(&path, &utils::config(backend)).unwrap_err();
            assert!(err.is_format(), "{backend} / {len}: {err}");
        }
    }
}

#[test]
fn unsupported_versions_are_rejected_before_reading() {
    let mut bytes = utils::phones().build(FormatVersion::PatternV32).unwrap();
    // major version byte of the preamble
    bytes[5] = 9;
    let err = DataSet::from_bytes(bytes.clone(), &utils::config(BackendKind::Memory)).unwrap_err();
    assert!(matches!(err, DataSetError::UnsupportedVersion(_)), "{err}");

    // a trie corpus is a valid preamble, but not a pattern data set
    let mut trie = Vec::new();
    FormatVersion::TrieV30.write_preamble(&mut trie).unwrap();
    trie.extend_from_slice(&bytes[8..]);
    let err = DataSet::from_bytes(trie, &utils::config(BackendKind::Memory)).unwrap_err();
    assert!(err.is_format(), "{err}");
}

#[test]
fn invalid_sources_do_not_build() {
    assert!(DataSetBuilder::from_json("{").is_err());
    assert!(DataSetBuilder::from_json(r#"{"name": "x"}"#).is_err());

    let unknown_profile = utils::phones().with_signature("Unknown/1.0", [99], 1);
    assert!(unknown_profile.build(FormatVersion::PatternV32).is_err());

    assert!(utils::phones().build(FormatVersion::TrieV32).is_err());
}

#[test]
fn shared_data_set_serves_many_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = utils::write_phones(dir.path(), FormatVersion::PatternV32);
    let config = utils::config(BackendKind::Stream);
    let provider = Provider::new(DataSet::open(&path, &config).unwrap());

    let flipped = IPHONE.replace("Safari", "Sofari");
    let targets = [ANDROID, IPHONE, WINDOWS, flipped.as_str()];
    let expected: Vec<_> = targets
        .iter()
        .map(|target| provider.match_str(target).unwrap().device_id())
        .collect();
    provider.reset_caches();

    std::thread::scope(|scope| {
        for offset in 0..8 {
            let provider = &provider;
            let targets = &targets;
            let expected = &expected;
            scope.spawn(move || {
                for round in 0..50 {
                    let idx = (offset + round) % targets.len();
                    let found = provider.match_str(targets[idx]).unwrap();
                    assert_eq!(found.device_id(), expected[idx]);
                    assert_ne!(found.method(), Method::None);
                }
            });
        }
    });
    assert_eq!(provider.detections(), 404);

    let (pool_size, created) = provider.data_set().reader_pool_usage().unwrap();
    assert_eq!(pool_size, 2);
    assert!((1..=pool_size).contains(&created), "{created} readers created");
}
