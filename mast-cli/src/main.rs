mod api;
mod cli;
mod config;
mod import;
mod repo;
mod upload;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::debug!("mast {} starting", env!("CARGO_PKG_VERSION"));
    cli::run(cli).await
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` wins over both
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
