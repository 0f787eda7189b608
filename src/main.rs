mod application;
mod domain;
mod infrastructure;
mod presentation;

use crate::domain::errors::GurlError;
use crate::infrastructure::http_client::HyperHttpClient;
use crate::presentation::cli::{Cli, ConsoleProgress, ConsoleRetry};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

/// gurl: a simple HTTP client for the command line
///
/// Builds one request from the command line, sends it (optionally with
/// retries, a browser TLS fingerprint or full browser impersonation) and
/// prints the response, pretty-printing JSON objects unless asked not to.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let request_service = HyperHttpClient::new()
        .with_progress(Arc::new(ConsoleProgress))
        .create_request_service()
        .with_observer(Box::new(ConsoleRetry));

    if let Err(err) = cli.run(&request_service).await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        let code = err
            .downcast_ref::<GurlError>()
            .map_or(1, GurlError::exit_code);
        std::process::exit(code);
    }
}

/// Warnings only, unless RUST_LOG says otherwise; `--verbose` raises the
/// level to debug once the request is configured.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("gurl=debug"))
        .format_timestamp(None)
        .init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(log::LevelFilter::Warn);
    }
}
