use crate::domain::entities::{AuthMode, ClientCertificate, Method, RequestSpec, RetryPolicy};
use crate::domain::errors::{GurlError, Result};
use crate::domain::presets::{Browser, TlsFingerprint};
use crate::domain::value_objects::{BasicCredentials, Headers, Url};
use crate::infrastructure::config::{
    Config, DEFAULT_SCHEME, JSON_CONTENT_TYPE, MAX_BACKOFF, MIN_BACKOFF, default_user_agent,
};
use hyper::body::Bytes;
use std::str::FromStr;
use std::time::Duration;

/// One configuration step: takes the spec built so far, returns the next one.
pub type Step = fn(RequestSpec, &Config) -> Result<RequestSpec>;

/// Steps after URL resolution, in the order they apply. Later steps may
/// override what earlier ones set; impersonation must stay last.
pub const STEPS: [(&str, Step); 16] = [
    ("timeout", with_timeout),
    ("content type", with_content_type),
    ("auth", with_auth),
    ("tls trust", with_tls_trust),
    ("redirects", with_redirect_policy),
    ("protocol", with_protocol),
    ("headers", with_custom_headers),
    ("verification", with_verification),
    ("output", with_output_file),
    ("proxy", with_proxy),
    ("retry", with_retry_policy),
    ("fingerprint", with_fingerprint),
    ("trace", with_trace),
    ("user agent", with_user_agent),
    ("verbose", with_verbose),
    ("impersonation", with_impersonation),
];

/// Translates a validated [`Config`] into a [`RequestSpec`]
pub struct RequestBuilder<'a> {
    config: &'a Config,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self, body: Bytes) -> Result<RequestSpec> {
        let method = Method::from_str(&self.config.method)?;
        let url = Url::with_default_scheme(&self.config.url, DEFAULT_SCHEME)?;
        let seed = RequestSpec::new(url, method, Some(body));

        STEPS.iter().try_fold(seed, |spec, (name, step)| {
            log::trace!("applying {name} configuration");
            step(spec, self.config)
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn with_timeout(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.timeout = Duration::from_millis(config.timeout_ms);
    Ok(spec)
}

/// JSON for POST/PUT/PATCH; an explicit override applies to any method that
/// sends a body.
pub fn with_content_type(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    match non_empty(&config.content_type) {
        Some(content_type) if spec.method.carries_body() => {
            spec.headers.set("Content-Type", content_type);
            spec.content_type = Some(content_type.to_string());
        }
        _ if spec.method.defaults_to_json() => {
            spec.headers.set("Content-Type", JSON_CONTENT_TYPE);
        }
        _ => {}
    }
    Ok(spec)
}

pub fn with_auth(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    if let Some(raw) = config.auth.as_deref() {
        spec.auth = AuthMode::Basic(BasicCredentials::parse(raw)?);
    }
    if let Some(token) = non_empty(&config.bearer_token) {
        spec.auth = AuthMode::Bearer(token.to_string());
    }
    Ok(spec)
}

pub fn with_tls_trust(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.tls.ca_cert = config.ca_cert.clone();
    spec.transport.tls.client_cert = match (&config.cert, &config.key) {
        (Some(cert), Some(key)) => Some(ClientCertificate {
            cert: cert.clone(),
            key: key.clone(),
        }),
        (None, None) => None,
        _ => {
            return Err(GurlError::argument(
                "--cert and --key must be given together",
            ));
        }
    };
    Ok(spec)
}

pub fn with_redirect_policy(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.follow_redirects = !config.disable_redirect;
    Ok(spec)
}

pub fn with_protocol(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.force_http1 = config.force_http1;
    Ok(spec)
}

pub fn with_custom_headers(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    for raw in &config.headers {
        for (name, value) in Headers::parse_pairs(raw)? {
            spec.headers.set(&name, value);
        }
    }
    Ok(spec)
}

pub fn with_verification(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    if config.insecure {
        log::warn!("TLS certificate verification is disabled");
    }
    spec.transport.tls.insecure = config.insecure;
    Ok(spec)
}

pub fn with_output_file(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.output = config
        .output_file
        .clone()
        .filter(|path| !path.as_os_str().is_empty());
    Ok(spec)
}

pub fn with_proxy(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    let Some(raw) = non_empty(&config.proxy) else {
        return Ok(spec);
    };
    let proxy = Url::with_default_scheme(raw, DEFAULT_SCHEME)?;
    if proxy.is_https() {
        return Err(GurlError::argument(format!(
            "proxy '{raw}' must use http://, TLS to the proxy is not supported"
        )));
    }
    spec.transport.proxy = Some(proxy);
    Ok(spec)
}

pub fn with_retry_policy(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.retry = (config.retries > 0)
        .then(|| RetryPolicy::new(config.retries, MIN_BACKOFF, MAX_BACKOFF));
    Ok(spec)
}

pub fn with_fingerprint(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.tls.fingerprint = TlsFingerprint::from_str(&config.tls_finger)?;
    Ok(spec)
}

pub fn with_trace(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.transport.trace = config.trace;
    Ok(spec)
}

pub fn with_user_agent(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    let user_agent = match non_empty(&config.user_agent) {
        Some(explicit) => explicit.to_string(),
        None => default_user_agent(),
    };
    spec.headers.set("User-Agent", user_agent);
    Ok(spec)
}

pub fn with_verbose(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    spec.dump = config.verbose;
    Ok(spec)
}

/// Pins the browser's fingerprint and replaces any clashing header with the
/// browser's own spelling and value.
pub fn with_impersonation(mut spec: RequestSpec, config: &Config) -> Result<RequestSpec> {
    let Some(browser) = Browser::parse_optional(&config.impersonate)? else {
        return Ok(spec);
    };
    spec.transport.tls.fingerprint = browser.fingerprint();
    for (name, value) in browser.headers() {
        spec.headers.remove(name);
        spec.headers.set(name, value);
    }
    spec.impersonate = Some(browser);
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            url: "example.com/api".into(),
            ..Config::default()
        }
    }

    fn build(config: Config) -> Result<RequestSpec> {
        RequestBuilder::new(&config).build(Bytes::new())
    }

    #[test]
    fn defaults() {
        let spec = build(config()).unwrap();
        assert_eq!(spec.url.as_str(), "http://example.com/api");
        assert_eq!(spec.method, Method::Get);
        assert_eq!(spec.timeout, Duration::from_millis(10_000));
        assert_eq!(spec.retry, None);
        assert!(spec.transport.follow_redirects);
        assert!(!spec.transport.tls.insecure);
        assert_eq!(spec.transport.tls.fingerprint, TlsFingerprint::Go);
        assert_eq!(spec.headers.get("user-agent"), Some(default_user_agent().as_str()));
        assert!(!spec.headers.contains("content-type"));
    }

    #[test]
    fn unknown_method_is_an_argument_error() {
        let err = build(Config { method: "BREW".into(), ..config() }).unwrap_err();
        assert!(matches!(err, GurlError::Argument(_)));
    }

    #[test]
    fn json_content_type_for_write_methods() {
        for method in ["POST", "PUT", "PATCH"] {
            let spec = build(Config { method: method.into(), ..config() }).unwrap();
            assert_eq!(spec.headers.get("content-type"), Some(JSON_CONTENT_TYPE), "{method}");
        }
        let spec = build(Config { method: "DELETE".into(), ..config() }).unwrap();
        assert!(!spec.headers.contains("content-type"));
    }

    #[test]
    fn content_type_override_replaces_json() {
        let spec = build(Config {
            method: "PATCH".into(),
            content_type: Some("text".into()),
            ..config()
        })
        .unwrap();
        assert_eq!(spec.headers.get("content-type"), Some("text"));
        assert_eq!(spec.content_type.as_deref(), Some("text"));
    }

    #[test]
    fn custom_headers_override_defaults() {
        let spec = build(Config {
            method: "PUT".into(),
            headers: vec!["h1=v1;Content-Type=application/xml".into(), "h2=v2".into()],
            ..config()
        })
        .unwrap();
        assert_eq!(spec.headers.get("content-type"), Some("application/xml"));
        assert_eq!(spec.headers.get("h1"), Some("v1"));
        assert_eq!(spec.headers.get("h2"), Some("v2"));
    }

    #[test]
    fn malformed_auth_is_rejected() {
        let err = build(Config { auth: Some("userpass".into()), ..config() }).unwrap_err();
        assert!(matches!(err, GurlError::Argument(_)));
    }

    #[test]
    fn bearer_token_is_applied() {
        let spec = build(Config { bearer_token: Some("Token".into()), ..config() }).unwrap();
        assert_eq!(spec.auth, AuthMode::Bearer("Token".into()));
    }

    #[test]
    fn half_a_client_certificate_is_rejected() {
        let err = build(Config { cert: Some(PathBuf::from("client.pem")), ..config() }).unwrap_err();
        assert!(matches!(err, GurlError::Argument(_)));

        let spec = build(Config {
            cert: Some(PathBuf::from("client.pem")),
            key: Some(PathBuf::from("client.key")),
            ca_cert: Some(PathBuf::from("ca.pem")),
            ..config()
        })
        .unwrap();
        assert!(spec.transport.tls.client_cert.is_some());
        assert_eq!(spec.transport.tls.ca_cert, Some(PathBuf::from("ca.pem")));
    }

    #[test]
    fn connection_flags() {
        let spec = build(Config {
            disable_redirect: true,
            force_http1: true,
            insecure: true,
            trace: true,
            verbose: true,
            output_file: Some(PathBuf::from("out.bin")),
            ..config()
        })
        .unwrap();
        assert!(!spec.transport.follow_redirects);
        assert!(spec.transport.force_http1);
        assert!(spec.transport.tls.insecure);
        assert!(spec.transport.trace);
        assert!(spec.dump);
        assert_eq!(spec.transport.output, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn proxy_defaults_to_http_and_rejects_https() {
        let spec = build(Config { proxy: Some("127.0.0.1:3128".into()), ..config() }).unwrap();
        assert_eq!(spec.transport.proxy.unwrap().as_str(), "http://127.0.0.1:3128/");

        let err = build(Config { proxy: Some("https://proxy:443".into()), ..config() }).unwrap_err();
        assert!(matches!(err, GurlError::Argument(_)));
    }

    #[test]
    fn retry_policy_only_when_requested() {
        let spec = build(Config { retries: 3, ..config() }).unwrap();
        assert_eq!(
            spec.retry,
            Some(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(5)))
        );

        let spec = build(Config { retries: 0, ..config() }).unwrap();
        assert_eq!(spec.retry, None);
    }

    #[test]
    fn explicit_user_agent_wins_over_header_flag() {
        let spec = build(Config {
            headers: vec!["User-Agent=from-header".into()],
            user_agent: Some("MyAgent".into()),
            ..config()
        })
        .unwrap();
        assert_eq!(spec.headers.get("user-agent"), Some("MyAgent"));
    }

    #[test]
    fn impersonation_overrides_fingerprint_and_headers() {
        let spec = build(Config {
            impersonate: "chrome".into(),
            tls_finger: "firefox".into(),
            user_agent: Some("MyAgent".into()),
            ..config()
        })
        .unwrap();
        assert_eq!(spec.transport.tls.fingerprint, TlsFingerprint::Chrome);
        assert_eq!(spec.impersonate, Some(Browser::Chrome));
        assert_eq!(spec.headers.get("user-agent"), Some(Browser::Chrome.user_agent()));
        for (name, value) in Browser::Chrome.headers() {
            assert_eq!(spec.headers.get(name), Some(value), "{name}");
        }
    }

    #[test]
    fn impersonation_keeps_request_specific_headers() {
        let spec = build(Config {
            method: "POST".into(),
            impersonate: "chrome".into(),
            auth: Some("user:pass".into()),
            ..config()
        })
        .unwrap();
        assert_eq!(spec.headers.get("content-type"), Some(JSON_CONTENT_TYPE));
        assert!(matches!(spec.auth, AuthMode::Basic(_)));
    }

    #[test]
    fn fingerprint_alone_leaves_headers_untouched() {
        let spec = build(Config { tls_finger: "android".into(), ..config() }).unwrap();
        assert_eq!(spec.transport.tls.fingerprint, TlsFingerprint::Android);
        assert_eq!(spec.impersonate, None);
        assert_eq!(spec.headers.get("user-agent"), Some(default_user_agent().as_str()));
    }

    #[test]
    fn each_step_is_usable_on_its_own() {
        let seed = RequestSpec::new(
            Url::with_default_scheme("example.com", "http").unwrap(),
            Method::Get,
            None,
        );
        let config = Config { trace: true, ..config() };
        let spec = with_trace(seed.clone(), &config).unwrap();
        assert!(spec.transport.trace);
        assert!(!seed.transport.trace);
    }
}
