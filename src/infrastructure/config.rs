use crate::domain::errors::{GurlError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SCHEME: &str = "http";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);
pub const MAX_REDIRECTS: usize = 10;

pub fn default_user_agent() -> String {
    format!("gurl {VERSION}")
}

/// Flat, parser-independent view of every command-line option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub method: String,
    pub auth: Option<String>,
    pub bearer_token: Option<String>,
    pub data: Option<String>,
    pub data_file: Option<PathBuf>,
    pub content_type: Option<String>,
    pub headers: Vec<String>,
    pub impersonate: String,
    pub tls_finger: String,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub insecure: bool,
    pub disable_redirect: bool,
    pub force_http1: bool,
    pub retries: u32,
    pub timeout_ms: u64,
    pub output_file: Option<PathBuf>,
    pub proxy: Option<String>,
    pub raw_response: bool,
    pub trace: bool,
    pub verbose: bool,
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            auth: None,
            bearer_token: None,
            data: None,
            data_file: None,
            content_type: None,
            headers: Vec::new(),
            impersonate: "none".to_string(),
            tls_finger: "go".to_string(),
            ca_cert: None,
            cert: None,
            key: None,
            insecure: false,
            disable_redirect: false,
            force_http1: false,
            retries: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            output_file: None,
            proxy: None,
            raw_response: false,
            trace: false,
            verbose: false,
            user_agent: None,
        }
    }
}

impl Config {
    /// Cross-field checks that must fail before any file or network access
    pub fn validate(&self) -> Result<()> {
        let has_data = self.data.as_deref().is_some_and(|d| !d.is_empty());
        let has_file = self
            .data_file
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if has_data && has_file {
            return Err(GurlError::argument(
                "--data and --data-file are mutually exclusive",
            ));
        }
        if self.auth.is_some() && self.bearer_token.is_some() {
            return Err(GurlError::argument(
                "--auth and --bearer-token are mutually exclusive",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(GurlError::argument("--timeout must be greater than zero"));
        }
        Ok(())
    }
}
