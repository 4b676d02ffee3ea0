//! devmatch build command

use crate::utils::parse_format;
use clap::Args;
use devmatch_core::error::{BoxError, ErrorContext as _, OpaqueError};
use devmatch_data::{FormatVersion, builder::DataSetBuilder};
use std::path::PathBuf;

#[derive(Debug, Args)]
/// build a pattern data set from a json source
pub struct CliCommandBuild {
    #[arg(long, short = 's')]
    /// the json source describing components, properties, profiles and signatures
    source: PathBuf,

    #[arg(long, short = 'o')]
    /// the file to write the data set to
    out: PathBuf,

    #[arg(long, short = 'f', default_value = "v32", value_parser = parse_format)]
    /// the layout to write (v31 or v32)
    format: FormatVersion,
}

/// run the devmatch build command
pub fn run(cfg: CliCommandBuild) -> Result<(), BoxError> {
    if !cfg.format.is_pattern() {
        return Err(OpaqueError::from_display(format!(
            "{} is a trie corpus format, use `devmatch legacy --write-corpus` instead",
            cfg.format
        ))
        .into());
    }

    let raw = std::fs::read_to_string(&cfg.source)
        .with_context(|| format!("read source {}", cfg.source.display()))?;
    let builder = DataSetBuilder::from_json(&raw).context("parse data set source")?;
    builder
        .write_to(&cfg.out, cfg.format)
        .with_context(|| format!("write data set {}", cfg.out.display()))?;

    let source = builder.source();
    tracing::info!(
        "wrote {} data set {} with {} profiles and {} signatures to {}",
        cfg.format,
        source.name,
        source.profiles.len(),
        source.signatures.len(),
        cfg.out.display()
    );
    Ok(())
}
