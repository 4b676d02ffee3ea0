//! entrypoint for devmatch-cli

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

pub mod cmd;
use self::cmd::{build, detect, info, legacy};

pub mod config;
pub mod trace;
pub mod utils;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "devmatch")]
#[command(bin_name = "devmatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    /// log json lines to stderr instead of human readable text
    json: bool,

    #[command(subcommand)]
    cmds: CliCommands,
}

#[derive(Debug, Subcommand)]
enum CliCommands {
    #[command(name = "match")]
    Match(detect::CliCommandMatch),
    Info(info::CliCommandInfo),
    Build(build::CliCommandBuild),
    Legacy(legacy::CliCommandLegacy),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = trace::init_tracing(LevelFilter::INFO, cli.json) {
        eprintln!("🚩 failed to init tracing: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.cmds {
        CliCommands::Match(cfg) => detect::run(cfg).await,
        CliCommands::Info(cfg) => info::run(cfg),
        CliCommands::Build(cfg) => build::run(cfg),
        CliCommands::Legacy(cfg) => legacy::run(cfg),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("🚩 exit with error: {err}");
            ExitCode::FAILURE
        }
    }
}
