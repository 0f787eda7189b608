use crate::application::builders::request_builder::RequestBuilder;
use crate::application::payload;
use crate::application::retry::{RetryAttempt, RetryObserver};
use crate::application::services::{HttpRequestService, ProgressObserver};
use crate::infrastructure::config::{Config, DEFAULT_TIMEOUT_MS};
use crate::infrastructure::output::{self, RenderOptions};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;

/// CLI configuration for gurl
#[derive(Parser, Debug)]
#[command(name = "gurl", version)]
#[command(about = "gurl: a simple http client for the command line", long_about = None)]
pub struct Cli {
    /// Url to access
    pub url: String,

    /// HTTP method
    #[arg(
        short = 'X',
        long,
        default_value = "GET",
        ignore_case = true,
        value_parser = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
    )]
    pub method: String,

    /// Basic HTTP authentication in the format username:password
    #[arg(short = 'u', long)]
    pub auth: Option<String>,

    /// Bearer auth token
    #[arg(short = 'b', long, conflicts_with = "auth")]
    pub bearer_token: Option<String>,

    /// Data payload (request body)
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Read the request body from a file
    #[arg(short = 'f', long)]
    pub data_file: Option<PathBuf>,

    /// Content-Type header, default is application/json for POST, PUT and PATCH
    #[arg(short = 'c', long)]
    pub content_type: Option<String>,

    /// HTTP headers in the format "header1=value1;header2=value2"
    #[arg(short = 'H', long = "headers")]
    pub headers: Vec<String>,

    /// Impersonate a browser's TLS fingerprint and headers
    #[arg(long, default_value = "none", value_parser = ["chrome", "firefox", "safari", "none"])]
    pub impersonate: String,

    /// TLS fingerprint
    #[arg(
        long = "tls-finger",
        default_value = "go",
        value_parser = ["chrome", "firefox", "edge", "safari", "ios", "android", "random", "go"]
    )]
    pub tls_finger: String,

    /// CA certificate (PEM) to trust
    #[arg(long)]
    pub cacert: Option<PathBuf>,

    /// Client certificate (PEM)
    #[arg(long, requires = "key")]
    pub cert: Option<PathBuf>,

    /// Client private key (PKCS#8 PEM)
    #[arg(long, requires = "cert")]
    pub key: Option<PathBuf>,

    /// Allow insecure SSL connections
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Disable redirects
    #[arg(long)]
    pub disable_redirect: bool,

    /// Force HTTP/1.1
    #[arg(long = "force-http-1")]
    pub force_http1: bool,

    /// Number of retries on network errors and 5xx responses
    #[arg(short = 'r', long, default_value_t = 0)]
    pub retries: u32,

    /// Timeout in milliseconds, per attempt
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Write the response body to a file
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Proxy url
    #[arg(long)]
    pub proxy: Option<String>,

    /// Print raw response string (disable json prettify)
    #[arg(long)]
    pub raw_response: bool,

    /// Show tracing/performance information
    #[arg(long)]
    pub trace: bool,

    /// Enable verbose/debug mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Set User-Agent http header
    #[arg(short = 'A', long)]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn to_config(&self) -> Config {
        Config {
            url: self.url.clone(),
            method: self.method.to_uppercase(),
            auth: self.auth.clone(),
            bearer_token: self.bearer_token.clone(),
            data: self.data.clone(),
            data_file: self.data_file.clone(),
            content_type: self.content_type.clone(),
            headers: self.headers.clone(),
            impersonate: self.impersonate.clone(),
            tls_finger: self.tls_finger.clone(),
            ca_cert: self.cacert.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            insecure: self.insecure,
            disable_redirect: self.disable_redirect,
            force_http1: self.force_http1,
            retries: self.retries,
            timeout_ms: self.timeout,
            output_file: self.output_file.clone(),
            proxy: self.proxy.clone(),
            raw_response: self.raw_response,
            trace: self.trace,
            verbose: self.verbose,
            user_agent: self.user_agent.clone(),
        }
    }

    pub async fn run(&self, request_service: &HttpRequestService) -> Result<()> {
        let config = self.to_config();
        config.validate()?;
        if config.verbose {
            log::set_max_level(log::LevelFilter::Debug);
        }

        let body = payload::resolve(config.data.as_deref(), config.data_file.as_deref())?;
        let spec = RequestBuilder::new(&config).build(body)?;

        let dispatched = request_service.dispatch(&spec).await?;
        let response = &dispatched.response;

        if self.verbose {
            eprintln!("{}", format!("Status: {}", response.status).cyan());
        }

        let mut stdout = std::io::stdout().lock();
        let options = RenderOptions {
            raw: config.raw_response,
            dump_headers: dispatched.dump_headers,
            color: stdout.is_terminal(),
        };
        output::render(response, options, &mut stdout)?;

        if let Some(path) = &response.saved_to {
            log::info!("saved response to {}", path.display());
            if self.verbose {
                eprintln!("Saved response to {}", path.display());
            }
        }

        Ok(())
    }
}

/// Download progress on stderr
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, downloaded: u64, total: u64) {
        let percent = downloaded as f64 / total as f64 * 100.0;
        eprint!("\rdownloaded {percent:.2}%");
        if downloaded >= total {
            eprintln!();
        }
    }
}

/// Retry notices on stderr, visible without any log filter
pub struct ConsoleRetry;

impl RetryObserver for ConsoleRetry {
    fn on_retry(&self, attempt: &RetryAttempt<'_>) {
        let notice = format!(
            "retry {}/{} for {} {} in {:?} ({})",
            attempt.retry,
            attempt.max_retries,
            attempt.method,
            attempt.url,
            attempt.delay,
            attempt.reason
        );
        eprintln!("{}", notice.yellow());
    }
}
