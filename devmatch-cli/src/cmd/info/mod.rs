//! devmatch info command

use crate::utils::write_json;
use clap::Args;
use devmatch_core::{
    ComponentKind,
    error::{BoxError, ErrorContext as _},
};
use devmatch_data::{DataSet, DataSetConfig, DataSetError, EntityCacheStats};
use devmatch_legacy::corpus::{is_corpus_prefix, read_corpus};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
/// describe a pattern data set or a trie corpus file
pub struct CliCommandInfo {
    #[arg(long, short = 'd')]
    /// the data set or corpus file to describe
    data: PathBuf,

    #[arg(long, short = 'p')]
    /// pretty print the json output
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct DataSetInfo {
    name: String,
    version: String,
    published: String,
    max_signature_length: usize,
    character_range: (u8, u8),
    strings: usize,
    values: usize,
    profiles: usize,
    signatures: usize,
    nodes: usize,
    components: Vec<ComponentInfo>,
    properties: Vec<PropertyInfo>,
    caches: EntityCacheStats,
}

#[derive(Debug, Serialize)]
struct ComponentInfo {
    kind: ComponentKind,
    default_profile_id: u32,
}

#[derive(Debug, Serialize)]
struct PropertyInfo {
    name: String,
    component: ComponentKind,
    mandatory: bool,
    list: bool,
}

#[derive(Debug, Serialize)]
struct CorpusInfo {
    version: String,
    devices: usize,
    devices_with_target: usize,
    handlers: Vec<String>,
}

/// run the devmatch info command
pub fn run(cfg: CliCommandInfo) -> Result<(), BoxError> {
    let bytes = std::fs::read(&cfg.data)
        .with_context(|| format!("read {}", cfg.data.display()))?;

    if is_corpus_prefix(&bytes) {
        let corpus = read_corpus(&bytes).context("read trie corpus")?;
        let info = CorpusInfo {
            version: corpus.version().to_string(),
            devices: corpus.devices().len(),
            devices_with_target: corpus
                .devices()
                .iter()
                .filter(|device| device.target().is_some())
                .count(),
            handlers: corpus
                .handlers()
                .iter()
                .map(|handler| format!("{} ({})", handler.name(), handler.kind().as_str()))
                .collect(),
        };
        return write_json(&info, cfg.pretty);
    }

    let data_set = DataSet::from_bytes(bytes, &DataSetConfig::default()).context("load data set")?;
    let components = data_set
        .components()
        .iter()
        .map(|component| {
            let default = data_set.profile(component.default_profile())?;
            Ok(ComponentInfo {
                kind: component.kind(),
                default_profile_id: default.profile_id(),
            })
        })
        .collect::<Result<Vec<_>, DataSetError>>()?;
    let info = DataSetInfo {
        name: data_set.name().to_owned(),
        version: data_set.version().to_string(),
        published: data_set.published().to_string(),
        max_signature_length: data_set.max_signature_length(),
        character_range: (data_set.lowest_character(), data_set.highest_character()),
        strings: data_set.string_count(),
        values: data_set.value_count(),
        profiles: data_set.profile_count(),
        signatures: data_set.signature_count(),
        nodes: data_set.node_count(),
        components,
        properties: data_set
            .properties()
            .iter()
            .map(|property| PropertyInfo {
                name: property.name().to_owned(),
                component: property.component(),
                mandatory: property.is_mandatory(),
                list: property.is_list(),
            })
            .collect(),
        caches: data_set.cache_stats(),
    };
    write_json(&info, cfg.pretty)
}
