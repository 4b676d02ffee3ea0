//! devmatch match command

use crate::{
    config::CliConfig,
    utils::{parse_backend, parse_header, write_json},
};
use clap::Args;
use devmatch_core::{
    Method,
    error::{BoxError, ErrorContext as _},
};
use devmatch_data::{BackendKind, DataSet};
use devmatch_match::{Provider, spawn_cache_maintenance};
use itertools::Itertools as _;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Args)]
/// match target strings, request headers or a device id against a data set
///
/// Every match is written to stdout as one json line.
pub struct CliCommandMatch {
    #[arg(long, short = 'd')]
    /// the pattern data set file to match against
    data: PathBuf,

    #[arg(long, short = 'c')]
    /// json file with data set and provider options
    config: Option<PathBuf>,

    #[arg(long, short = 'b', value_parser = parse_backend)]
    /// the storage backend (memory or stream), overrides the config file
    backend: Option<BackendKind>,

    #[arg(long)]
    /// the amount of matches to cache (0 = no cache), overrides the config file
    cache_capacity: Option<usize>,

    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    /// match a request header (`Name: value`) instead of target strings
    ///
    /// can be repeated to pass a secondary device header
    headers: Vec<(String, String)>,

    #[arg(long, short = 'i')]
    /// resolve a device id (e.g. `4-11-21`) instead of matching
    device_id: Option<String>,

    #[arg(long, default_value_t = 60)]
    /// seconds between cache purges while reading targets from stdin
    ///
    /// cached matches unused for this long are dropped
    purge_interval: u64,

    #[arg(long, short = 'p')]
    /// pretty print the json output
    pretty: bool,

    /// target strings to match, read line by line from stdin when omitted
    targets: Vec<String>,
}

/// run the devmatch match command
pub async fn run(cfg: CliCommandMatch) -> Result<(), BoxError> {
    let mut config = CliConfig::load(cfg.config.as_deref())?;
    if let Some(backend) = cfg.backend {
        config.data_set.set_backend(backend);
    }
    if let Some(capacity) = cfg.cache_capacity {
        config.provider.set_cache_capacity(capacity);
    }

    let data_set = DataSet::open(&cfg.data, &config.data_set)
        .with_context(|| format!("open data set {}", cfg.data.display()))?;
    tracing::info!(
        "loaded data set {} ({}, {} signatures) using the {} backend",
        data_set.name(),
        data_set.version(),
        data_set.signature_count(),
        data_set.backend_kind()
    );
    let provider = Arc::new(Provider::with_config(data_set, config.provider));

    if let Some(device_id) = &cfg.device_id {
        let found = provider
            .match_device_id(device_id)
            .with_context(|| format!("resolve device id {device_id:?}"))?;
        return write_json(&found.summary()?, cfg.pretty);
    }

    if !cfg.headers.is_empty() {
        let found = provider
            .match_headers(cfg.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .context("match request headers")?;
        return write_json(&found.summary()?, cfg.pretty);
    }

    if !cfg.targets.is_empty() {
        for target in &cfg.targets {
            let found = provider.match_str(target).context("match target")?;
            write_json(&found.summary()?, cfg.pretty)?;
        }
        return Ok(());
    }

    let purge = Duration::from_secs(cfg.purge_interval.max(1));
    let cancel = CancellationToken::new();
    let maintenance = spawn_cache_maintenance(provider.clone(), purge, purge, cancel.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = async {
        while let Some(line) = lines.next_line().await.context("read target from stdin")? {
            let found = provider.match_str(line.trim_end()).context("match target")?;
            write_json(&found.summary()?, cfg.pretty)?;
        }
        Ok::<_, BoxError>(())
    }
    .await;

    cancel.cancel();
    maintenance.await.context("join cache maintenance task")?;
    tracing::info!(
        "{} detections ({}), {:.1}% cache misses",
        provider.detections(),
        Method::ALL
            .iter()
            .map(|method| format!("{method}: {}", provider.method_count(*method)))
            .join(", "),
        provider.percentage_cache_misses()
    );
    result
}
