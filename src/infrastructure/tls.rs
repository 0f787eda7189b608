//! TLS connector construction from [`TlsSettings`].
//!
//! native-tls exposes the ALPN list, protocol floor, trust roots and client
//! identity; those are what a fingerprint preset can steer.

use crate::domain::entities::TlsSettings;
use crate::domain::errors::{GurlError, Result};
use crate::domain::presets::{TlsFingerprint, TlsVersion};
use native_tls::{Certificate, Identity, Protocol};
use rand::Rng;
use std::path::Path;

const DEFAULT_ALPN: &[&str] = &["h2", "http/1.1"];
const HTTP1_ALPN: &[&str] = &["http/1.1"];

/// Picks a concrete preset for `Random`; other presets pass through.
pub fn resolve_fingerprint(fingerprint: TlsFingerprint) -> TlsFingerprint {
    match fingerprint {
        TlsFingerprint::Random => {
            let index = rand::rng().random_range(0..TlsFingerprint::CONCRETE.len());
            TlsFingerprint::CONCRETE[index]
        }
        other => other,
    }
}

/// Builds the connector used for one attempt
pub fn build_connector(
    settings: &TlsSettings,
    force_http1: bool,
) -> Result<tokio_native_tls::TlsConnector> {
    let fingerprint = resolve_fingerprint(settings.fingerprint);
    let mut builder = native_tls::TlsConnector::builder();

    let mut alpn: Vec<&str> = DEFAULT_ALPN.to_vec();
    if let Some(profile) = fingerprint.profile() {
        log::debug!(
            "tls fingerprint {fingerprint}: alpn {:?}, ciphers {}",
            profile.alpn,
            profile.cipher_suites.join(",")
        );
        builder.min_protocol_version(Some(match profile.min_version {
            TlsVersion::Tls10 => Protocol::Tlsv10,
            TlsVersion::Tls12 => Protocol::Tlsv12,
        }));
        alpn = profile.alpn;
    }
    if force_http1 {
        alpn = HTTP1_ALPN.to_vec();
    }
    builder.request_alpns(&alpn);

    if settings.insecure {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }

    if let Some(path) = &settings.ca_cert {
        let pem = read_pem(path)?;
        let cert = Certificate::from_pem(&pem).map_err(|e| {
            GurlError::argument(format!("invalid CA certificate {}: {e}", path.display()))
        })?;
        builder.add_root_certificate(cert);
    }

    if let Some(client) = &settings.client_cert {
        let cert = read_pem(&client.cert)?;
        let key = read_pem(&client.key)?;
        let identity = Identity::from_pkcs8(&cert, &key).map_err(|e| {
            GurlError::argument(format!(
                "invalid client certificate {} / key {}: {e}",
                client.cert.display(),
                client.key.display()
            ))
        })?;
        builder.identity(identity);
    }

    let connector = builder
        .build()
        .map_err(|e| GurlError::transport(format!("failed to initialise TLS: {e}")))?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| GurlError::io(path, e))
}
