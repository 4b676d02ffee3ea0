//! devmatch legacy command

use crate::utils::{parse_format, write_json};
use clap::Args;
use devmatch_core::error::{BoxError, ErrorContext as _, OpaqueError};
use devmatch_data::FormatVersion;
use devmatch_legacy::{
    DeviceStore, LegacyEngine,
    corpus::{read_corpus_file, write_corpus},
    xml::{parse_devices, parse_handlers},
};
use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

#[derive(Debug, Args)]
/// match target strings with the handler based legacy engine
///
/// Devices come from an xml file (devmatch or WURFL layout) or from a trie
/// corpus. Handlers come from an xml file, or from a TrieV3.2 corpus.
pub struct CliCommandLegacy {
    #[arg(long, conflicts_with = "corpus", required_unless_present = "corpus")]
    /// the xml file with the device definitions
    devices: Option<PathBuf>,

    #[arg(long)]
    /// the trie corpus file with the device definitions
    corpus: Option<PathBuf>,

    #[arg(long)]
    /// the xml file with the handler definitions
    ///
    /// required unless the corpus carries handlers
    handlers: Option<PathBuf>,

    #[arg(long, default_value_t = 1_000)]
    /// the amount of detections to cache (0 = no cache)
    cache_capacity: usize,

    #[arg(long, default_value = "Unknown")]
    /// the value reported for capabilities nothing is found for
    unknown_value: String,

    #[arg(long)]
    /// write the devices and handlers as a trie corpus to this file
    write_corpus: Option<PathBuf>,

    #[arg(long, short = 'f', default_value = "triev32", value_parser = parse_format)]
    /// the corpus layout to write (triev30 or triev32)
    format: FormatVersion,

    #[arg(long, short = 'p')]
    /// pretty print the json output
    pretty: bool,

    /// target strings to match
    targets: Vec<String>,
}

/// run the devmatch legacy command
pub fn run(cfg: CliCommandLegacy) -> Result<(), BoxError> {
    let engine = load_engine(&cfg)?
        .with_cache_capacity(cfg.cache_capacity)
        .with_unknown_value(cfg.unknown_value.as_str());
    tracing::info!(
        "legacy engine ready: {} devices, {} handlers",
        engine.store().len(),
        engine.handlers().len()
    );

    if let Some(out) = &cfg.write_corpus {
        let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
        let mut writer = BufWriter::new(file);
        write_corpus(&mut writer, cfg.format, engine.store(), engine.handlers())
            .context("write trie corpus")?;
        writer.flush().context("flush trie corpus")?;
        tracing::info!("wrote {} corpus to {}", cfg.format, out.display());
    }

    for target in &cfg.targets {
        write_json(&engine.detect(target).summary(), cfg.pretty)?;
    }
    Ok(())
}

fn load_engine(cfg: &CliCommandLegacy) -> Result<LegacyEngine, BoxError> {
    let handlers = cfg
        .handlers
        .as_deref()
        .map(|path| -> Result<_, BoxError> {
            let raw = read(path)?;
            Ok(parse_handlers(&raw)
                .with_context(|| format!("parse handlers {}", path.display()))?)
        })
        .transpose()?;

    if let Some(path) = &cfg.corpus {
        let corpus = read_corpus_file(path)
            .with_context(|| format!("read trie corpus {}", path.display()))?;
        let engine = match handlers {
            Some(handlers) => corpus.into_engine_with(handlers),
            None if corpus.handlers().is_empty() => {
                return Err(OpaqueError::from_display(format!(
                    "{} corpus {} carries no handlers, pass --handlers",
                    corpus.version(),
                    path.display()
                ))
                .into());
            }
            None => corpus.into_engine(),
        };
        return Ok(engine.context("index corpus devices")?);
    }

    let Some(path) = &cfg.devices else {
        return Err(OpaqueError::from_display("pass --devices or --corpus").into());
    };
    let Some(handlers) = handlers else {
        return Err(OpaqueError::from_display("xml devices need --handlers").into());
    };
    let devices =
        parse_devices(&read(path)?).with_context(|| format!("parse devices {}", path.display()))?;
    let store = DeviceStore::new(devices).context("index devices")?;
    Ok(LegacyEngine::new(store, handlers))
}

fn read(path: &Path) -> Result<String, BoxError> {
    Ok(std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?)
}
