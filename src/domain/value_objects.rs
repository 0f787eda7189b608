use crate::domain::errors::{GurlError, Result};
use base64::prelude::*;
use http::{HeaderName, HeaderValue};

/// Represents a validated target URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url(pub url::Url);

impl Url {
    /// Parses a URL, assuming `http` when no scheme is given
    ///
    /// # Arguments
    /// * `raw` - The URL string as typed by the user
    ///
    /// # Returns
    /// * `Ok(Url)` - An absolute http or https URL
    /// * `Err(GurlError::Argument)` - If the URL is empty, invalid or uses another scheme
    pub fn with_default_scheme(raw: &str, scheme: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GurlError::argument("URL cannot be empty"));
        }
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("{scheme}://{raw}")
        };
        let parsed = url::Url::parse(&candidate)
            .map_err(|e| GurlError::argument(format!("invalid URL '{raw}': {e}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(GurlError::argument(format!(
                    "unsupported URL scheme '{other}', expected http or https"
                )));
            }
        }
        if parsed.host().is_none() {
            return Err(GurlError::argument(format!("URL '{raw}' has no host")));
        }
        Ok(Url(parsed))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// Host suitable for DNS lookup and SNI (IPv6 literals without brackets)
    pub fn host(&self) -> String {
        match self.0.host() {
            Some(url::Host::Domain(domain)) => domain.to_string(),
            Some(url::Host::Ipv4(ip)) => ip.to_string(),
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            None => String::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.0.port_or_known_default().unwrap_or(80)
    }

    /// `host[:port]` as it appears in a Host header or CONNECT line
    pub fn authority(&self) -> String {
        let host = self.0.host_str().unwrap_or_default();
        match self.0.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Path and query, as sent in an origin-form request target
    pub fn path_and_query(&self) -> String {
        match self.0.query() {
            Some(query) => format!("{}?{}", self.0.path(), query),
            None => self.0.path().to_string(),
        }
    }

    /// Resolves a redirect `Location` against this URL
    pub fn join(&self, location: &str) -> Result<Self> {
        let joined = self
            .0
            .join(location)
            .map_err(|e| GurlError::transport(format!("invalid redirect location '{location}': {e}")))?;
        Ok(Url(joined))
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header list with case-insensitive, unique names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets a header, replacing any existing value in place
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Moves the named headers to the front in the given order; the rest keep
    /// their relative order after them.
    pub fn reorder(&mut self, order: &[&str]) {
        let mut ordered = Vec::with_capacity(self.0.len());
        for name in order {
            if let Some(pos) = self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
                ordered.push(self.0.remove(pos));
            }
        }
        ordered.append(&mut self.0);
        self.0 = ordered;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parses `k1=v1;k2=v2`, validating each name and value as HTTP tokens
    pub fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for item in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = item.split_once('=').ok_or_else(|| {
                GurlError::argument(format!("invalid header '{item}', use 'name=value'"))
            })?;
            let (name, value) = (name.trim(), value.trim());
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GurlError::argument(format!("invalid header name '{name}'")))?;
            HeaderValue::from_str(value).map_err(|_| {
                GurlError::argument(format!("invalid value for header '{name}'"))
            })?;
            pairs.push((name.to_string(), value.to_string()));
        }
        Ok(pairs)
    }
}

/// `user:pass` credentials for basic authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl BasicCredentials {
    /// Splits on the first `:`; the password may itself contain colons
    pub fn parse(raw: &str) -> Result<Self> {
        let (user, password) = raw.split_once(':').ok_or_else(|| {
            GurlError::argument("basic auth must be in the format username:password")
        })?;
        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn header_value(&self) -> String {
        let token = BASE64_STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}
