use crate::domain::errors::{GurlError, Result};
use crate::domain::presets::{Browser, TlsFingerprint};
use crate::domain::trace::TraceInfo;
use crate::domain::value_objects::{BasicCredentials, Headers, Url};
use hyper::body::Bytes;
use hyper::{HeaderMap, StatusCode, Version};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// HTTP method enum for simplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Methods that get a JSON content type unless told otherwise
    pub fn defaults_to_json(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    /// Methods that send the resolved payload
    pub fn carries_body(&self) -> bool {
        matches!(
            self,
            Method::Post | Method::Put | Method::Patch | Method::Delete
        )
    }
}

impl FromStr for Method {
    type Err = GurlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(GurlError::argument(format!(
                "unsupported HTTP method: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for hyper::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => hyper::Method::GET,
            Method::Post => hyper::Method::POST,
            Method::Put => hyper::Method::PUT,
            Method::Delete => hyper::Method::DELETE,
            Method::Patch => hyper::Method::PATCH,
            Method::Head => hyper::Method::HEAD,
            Method::Options => hyper::Method::OPTIONS,
        }
    }
}

/// How the request authenticates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    None,
    Basic(BasicCredentials),
    Bearer(String),
}

impl AuthMode {
    /// Value of the Authorization header, if any
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthMode::None => None,
            AuthMode::Basic(creds) => Some(creds.header_value()),
            AuthMode::Bearer(token) => Some(format!("Bearer {token}")),
        }
    }
}

/// PEM client certificate and its PKCS#8 key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Everything that shapes the TLS handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub fingerprint: TlsFingerprint,
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<ClientCertificate>,
}

/// Connection-level settings the transport applies to every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub tls: TlsSettings,
    pub proxy: Option<Url>,
    pub follow_redirects: bool,
    pub force_http1: bool,
    pub trace: bool,
    pub output: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            tls: TlsSettings::default(),
            proxy: None,
            follow_redirects: true,
            force_http1: false,
            trace: false,
            output: None,
        }
    }
}

/// When and how often a failed attempt is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            min_backoff,
            max_backoff: max_backoff.max(min_backoff),
        }
    }

    /// Delay before retry number `retry` (1-based): doubles from the minimum,
    /// capped at the maximum.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.min_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Transport failures and server errors are worth another attempt
    pub fn should_retry(&self, outcome: &Result<ResponseView>) -> bool {
        match outcome {
            Ok(response) => response.status.is_server_error(),
            Err(err) => err.is_transport(),
        }
    }
}

/// Fully configured request, built once from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: Url,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
    pub auth: AuthMode,
    pub timeout: Duration,
    pub retry: Option<RetryPolicy>,
    pub impersonate: Option<Browser>,
    pub dump: bool,
    pub transport: TransportSettings,
}

impl RequestSpec {
    pub fn new(url: Url, method: Method, body: Option<Bytes>) -> Self {
        Self {
            url,
            method,
            headers: Headers::new(),
            body: body.filter(|b| !b.is_empty()),
            content_type: None,
            auth: AuthMode::None,
            timeout: Duration::from_millis(crate::infrastructure::config::DEFAULT_TIMEOUT_MS),
            retry: None,
            impersonate: None,
            dump: false,
            transport: TransportSettings::default(),
        }
    }
}

/// The request as it goes on the wire for one attempt
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub settings: TransportSettings,
}

/// Request head actually sent for the final hop, kept for dumps
#[derive(Debug, Clone, Default)]
pub struct SentRequest {
    pub method: String,
    pub target: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
}

/// Completed response, rendered once
#[derive(Debug, Clone)]
pub struct ResponseView {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub sent: SentRequest,
    pub trace: Option<TraceInfo>,
    pub saved_to: Option<PathBuf>,
}

impl ResponseView {
    #[cfg(test)]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: body.into(),
            sent: SentRequest::default(),
            trace: None,
            saved_to: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!(matches!(
            "TRACE".parse::<Method>(),
            Err(GurlError::Argument(_))
        ));
    }

    #[test]
    fn body_methods() {
        assert!(Method::Delete.carries_body());
        assert!(!Method::Delete.defaults_to_json());
        assert!(!Method::Options.carries_body());
        assert!(Method::Patch.defaults_to_json());
    }

    #[test]
    fn bearer_header() {
        let auth = AuthMode::Bearer("Token".into());
        assert_eq!(auth.header_value().as_deref(), Some("Bearer Token"));
        assert_eq!(AuthMode::None.header_value(), None);
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = RetryPolicy::new(6, Duration::from_secs(1), Duration::from_secs(5));
        let delays: Vec<u64> = (1..=5).map(|n| policy.backoff(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn backoff_never_exceeds_bound_for_large_attempts() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(90), Duration::from_secs(5));
    }

    #[test]
    fn retries_server_errors_and_transport_failures_only() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1), Duration::from_secs(5));
        assert!(policy.should_retry(&Ok(ResponseView::new(StatusCode::BAD_GATEWAY, ""))));
        assert!(!policy.should_retry(&Ok(ResponseView::new(StatusCode::NOT_FOUND, ""))));
        assert!(policy.should_retry(&Err(GurlError::transport("refused"))));
        assert!(!policy.should_retry(&Err(GurlError::argument("bad"))));
    }

    #[test]
    fn empty_body_is_no_body() {
        let url = Url::with_default_scheme("example.com", "http").unwrap();
        let spec = RequestSpec::new(url, Method::Post, Some(Bytes::new()));
        assert_eq!(spec.body, None);
    }
}
