use super::utils::{self, DEVICES_XML, HANDLERS_XML};
use devmatch::{
    Detector,
    data::FormatVersion,
    legacy::{
        DeviceStore, Handler, LegacyEngine,
        corpus::{read_corpus_file, write_corpus},
        xml::{load_engine, parse_devices, parse_handlers},
    },
};
use std::{fs::File, io::BufWriter};

const NOKIA_6630: &str = "Nokia6630/1.0 (2.39.15) SymbianOS/8.0 Series60/2.6 Profile/MIDP-2.0";
const K750C: &str = "SonyEricssonK750c/R1CA Browser/SEMC-Browser/4.2";
const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1)";

fn engine() -> LegacyEngine {
    load_engine(utils::fixture("devices.xml"), utils::fixture("handlers.xml")).unwrap()
}

#[test]
fn wurfl_devices_with_xml_handlers() {
    let engine = engine();
    assert_eq!(engine.store().len(), 5);
    assert_eq!(engine.handlers().len(), 3);

    let nokia = engine.detect(NOKIA_6630);
    assert_eq!(nokia.device_id(), "nokia_6630");
    assert_eq!(nokia.best().unwrap().handler.as_ref(), "symbian");
    assert_eq!(nokia.best().unwrap().score, 0);
    assert_eq!(nokia.values("model_name").first(), "6630");
    // inherited from nokia_generic
    assert_eq!(nokia.values("brand_name").first(), "Nokia");
    assert_eq!(nokia.values("is_wireless_device").first(), "true");
    // the edit distance handler found the same device with a worse score
    assert_eq!(nokia.results().len(), 1);

    let sony = engine.detect(K750C);
    assert_eq!(sony.device_id(), "sonyericsson_k750i");
    assert_eq!(sony.best().unwrap().score, 1);
    assert_eq!(sony.values("brand_name").first(), "SonyEricsson");
}

#[test]
fn unhandled_targets_are_unknown() {
    let engine = engine().with_unknown_value("n/a");
    for target in [GOOGLEBOT, "", "Nokia3310"] {
        let detection = engine.detect(target);
        assert!(detection.best().is_none(), "{target}");
        assert_eq!(detection.device_id(), "n/a");
        assert!(detection.values("brand_name").is_unknown());
        assert!(detection.summary().values.is_empty());
    }
}

#[test]
fn corpus_round_trip_keeps_detections() {
    let engine = engine();
    let dir = tempfile::tempdir().unwrap();

    for version in [FormatVersion::TrieV30, FormatVersion::TrieV32] {
        let path = dir.path().join(format!("devices-{}.trie", version.as_str()));
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        let handlers: &[Handler] = match version {
            FormatVersion::TrieV32 => engine.handlers(),
            _ => &[],
        };
        write_corpus(&mut writer, version, engine.store(), handlers).unwrap();
        drop(writer);

        let corpus = read_corpus_file(&path).unwrap();
        assert_eq!(corpus.version(), version);
        assert_eq!(corpus.devices().len(), 5);
        let reloaded = match version {
            FormatVersion::TrieV32 => corpus.into_engine().unwrap(),
            _ => corpus
                .into_engine_with(parse_handlers(HANDLERS_XML).unwrap())
                .unwrap(),
        };

        for target in [NOKIA_6630, K750C, GOOGLEBOT] {
            let expected = engine.detect(target).summary();
            let found = reloaded.detect(target).summary();
            assert_eq!(found.device_id, expected.device_id, "{version}: {target}");
            assert_eq!(found.results, expected.results, "{version}: {target}");
            assert_eq!(found.values, expected.values, "{version}: {target}");
        }
    }
}

#[test]
fn legacy_engine_is_a_detector() {
    fn best_device<D: Detector<Detection = devmatch::legacy::LegacyDetection>>(
        detector: &D,
        target: &str,
    ) -> Option<String> {
        detector
            .detect(target)
            .ok()
            .map(|detection| detection.device_id().to_owned())
    }

    let store = DeviceStore::new(parse_devices(DEVICES_XML).unwrap()).unwrap();
    let engine = LegacyEngine::new(store, parse_handlers(HANDLERS_XML).unwrap())
        .with_cache_capacity(8);
    assert_eq!(best_device(&engine, NOKIA_6630).as_deref(), Some("nokia_6630"));
    assert_eq!(best_device(&engine, NOKIA_6630).as_deref(), Some("nokia_6630"));

    let stats = engine.cache_stats().unwrap();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.misses, 1);
}
