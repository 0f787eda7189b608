//! TLS fingerprint and browser impersonation presets.
//!
//! A fingerprint only shapes the TLS ClientHello. An impersonation preset is
//! a superset: it pins the fingerprint of the browser and also installs the
//! browser's header set and header order.

use crate::domain::errors::{GurlError, Result};
use std::fmt;
use std::str::FromStr;

/// Lowest TLS version a handshake profile offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls10,
    Tls12,
}

/// Chromium-family cipher suites in ClientHello order.
pub const CHROMIUM_CIPHER_SUITES: &[&str] = &[
    "TLS_AES_128_GCM_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

/// Firefox cipher suites in ClientHello order.
pub const FIREFOX_CIPHER_SUITES: &[&str] = &[
    "TLS_AES_128_GCM_SHA256",
    "TLS_CHACHA20_POLY1305_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

/// Apple (Safari, iOS) cipher suites in ClientHello order.
pub const APPLE_CIPHER_SUITES: &[&str] = &[
    "TLS_AES_128_GCM_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
];

/// Handshake parameters a fingerprint preset asks the TLS layer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeProfile {
    pub alpn: Vec<&'static str>,
    pub min_version: TlsVersion,
    /// Advertised suites, in order. Logged; the system TLS library picks the
    /// suites it supports.
    pub cipher_suites: &'static [&'static str],
}

/// TLS ClientHello presets selectable with `--tls-finger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsFingerprint {
    Chrome,
    Firefox,
    Edge,
    Safari,
    Ios,
    Android,
    /// One of the concrete browser presets, picked per connection.
    Random,
    /// The TLS library's own defaults.
    #[default]
    Go,
}

impl TlsFingerprint {
    /// Concrete presets `Random` chooses from.
    pub const CONCRETE: [TlsFingerprint; 6] = [
        Self::Chrome,
        Self::Firefox,
        Self::Edge,
        Self::Safari,
        Self::Ios,
        Self::Android,
    ];

    /// Handshake profile for this preset, `None` for library defaults.
    ///
    /// `Random` has no profile of its own and must be resolved first.
    pub fn profile(&self) -> Option<HandshakeProfile> {
        let h2 = vec!["h2", "http/1.1"];
        match self {
            Self::Chrome | Self::Edge | Self::Android => Some(HandshakeProfile {
                alpn: h2,
                min_version: TlsVersion::Tls12,
                cipher_suites: CHROMIUM_CIPHER_SUITES,
            }),
            Self::Firefox => Some(HandshakeProfile {
                alpn: h2,
                min_version: TlsVersion::Tls12,
                cipher_suites: FIREFOX_CIPHER_SUITES,
            }),
            Self::Safari | Self::Ios => Some(HandshakeProfile {
                alpn: h2,
                min_version: TlsVersion::Tls10,
                cipher_suites: APPLE_CIPHER_SUITES,
            }),
            Self::Random | Self::Go => None,
        }
    }
}

impl FromStr for TlsFingerprint {
    type Err = GurlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "edge" => Ok(Self::Edge),
            "safari" => Ok(Self::Safari),
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "random" => Ok(Self::Random),
            "go" | "none" | "default" | "" => Ok(Self::Go),
            other => Err(GurlError::argument(format!(
                "unsupported TLS fingerprint '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Edge => "edge",
            Self::Safari => "safari",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Random => "random",
            Self::Go => "go",
        };
        f.write_str(name)
    }
}

/// Browsers that `--impersonate` can pose as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
}

impl Browser {
    /// Parses an `--impersonate` value; `none` means no impersonation.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>> {
        match raw.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(None),
            "chrome" => Ok(Some(Self::Chrome)),
            "firefox" => Ok(Some(Self::Firefox)),
            "safari" => Ok(Some(Self::Safari)),
            other => Err(GurlError::argument(format!(
                "unsupported impersonation preset '{other}'"
            ))),
        }
    }

    pub fn fingerprint(&self) -> TlsFingerprint {
        match self {
            Self::Chrome => TlsFingerprint::Chrome,
            Self::Firefox => TlsFingerprint::Firefox,
            Self::Safari => TlsFingerprint::Safari,
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chrome => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36"
            }
            Self::Firefox => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:105.0) Gecko/20100101 Firefox/105.0"
            }
            Self::Safari => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15"
            }
        }
    }

    /// Browser headers, User-Agent included.
    pub fn headers(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::Chrome => vec![
                ("sec-ch-ua", r#""Not_A Brand";v="99", "Google Chrome";v="109", "Chromium";v="109""#),
                ("sec-ch-ua-mobile", "?0"),
                ("sec-ch-ua-platform", r#""macOS""#),
                ("upgrade-insecure-requests", "1"),
                ("user-agent", self.user_agent()),
                ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-mode", "navigate"),
                ("sec-fetch-user", "?1"),
                ("sec-fetch-dest", "document"),
                ("accept-language", "en-US,en;q=0.9"),
            ],
            Self::Firefox => vec![
                ("user-agent", self.user_agent()),
                ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
                ("accept-language", "en-US,en;q=0.5"),
                ("upgrade-insecure-requests", "1"),
                ("sec-fetch-dest", "document"),
                ("sec-fetch-mode", "navigate"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-user", "?1"),
            ],
            Self::Safari => vec![
                ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-dest", "document"),
                ("accept-language", "en-US,en;q=0.9"),
                ("sec-fetch-mode", "navigate"),
                ("user-agent", self.user_agent()),
            ],
        }
    }

    /// Order the browser sends its headers in; unknown headers follow.
    pub fn header_order(&self) -> Vec<&'static str> {
        let mut order: Vec<&'static str> = vec!["host"];
        order.extend(self.headers().into_iter().map(|(name, _)| name));
        order.extend(["content-type", "content-length", "authorization", "cookie"]);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fingerprint_names() {
        assert_eq!("Chrome".parse::<TlsFingerprint>().unwrap(), TlsFingerprint::Chrome);
        assert_eq!("go".parse::<TlsFingerprint>().unwrap(), TlsFingerprint::Go);
        assert!("netscape".parse::<TlsFingerprint>().is_err());
    }

    #[test]
    fn default_and_random_have_no_fixed_profile() {
        assert!(TlsFingerprint::Go.profile().is_none());
        assert!(TlsFingerprint::Random.profile().is_none());
        for preset in TlsFingerprint::CONCRETE {
            assert!(preset.profile().is_some(), "{preset} should have a profile");
        }
    }

    #[test]
    fn none_disables_impersonation() {
        assert_eq!(Browser::parse_optional("none").unwrap(), None);
        assert_eq!(Browser::parse_optional("safari").unwrap(), Some(Browser::Safari));
        assert!(Browser::parse_optional("edge").is_err());
    }

    #[test]
    fn browser_headers_carry_its_user_agent() {
        for browser in [Browser::Chrome, Browser::Firefox, Browser::Safari] {
            let ua = browser
                .headers()
                .into_iter()
                .find(|(name, _)| *name == "user-agent")
                .map(|(_, value)| value);
            assert_eq!(ua, Some(browser.user_agent()));
        }
    }
}
