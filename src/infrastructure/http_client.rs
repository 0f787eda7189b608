use crate::application::services::{HttpClient, HttpRequestService, ProgressObserver};
use crate::domain::entities::{
    Method, OutboundRequest, ResponseView, SentRequest, TransportSettings,
};
use crate::domain::errors::{GurlError, Result};
use crate::domain::trace::TraceInfo;
use crate::domain::value_objects::{BasicCredentials, Headers, Url};
use crate::infrastructure::config::MAX_REDIRECTS;
use crate::infrastructure::tls;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::{http1, http2};
use hyper::header::{CONTENT_LENGTH, HOST, LOCATION, PROXY_AUTHORIZATION};
use hyper::upgrade::Upgraded;
use hyper::{Request as HyperRequest, StatusCode, Version};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};

/// Byte stream a connection runs over, plain or TLS
trait Io: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// Infrastructure implementation of HttpClient using Hyper.
///
/// Every attempt opens its own connection so that DNS, connect and TLS
/// timings can be measured for the trace.
pub struct HyperHttpClient {
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Creates a configured HTTP request service using this client
    pub fn create_request_service(self) -> HttpRequestService {
        HttpRequestService::new(Box::new(self))
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send(&self, request: &OutboundRequest) -> Result<ResponseView> {
        let settings = &request.settings;
        let tls = tls::build_connector(&settings.tls, settings.force_http1)?;

        let mut hop = Hop::from(request);
        let mut redirects = 0;
        loop {
            let exchange = self.execute_http_request(&hop, settings, &tls).await?;
            if !settings.follow_redirects {
                return ResponseAdapter::to_response_view(exchange, settings, self.progress.as_deref()).await;
            }
            match RedirectPolicy::next_hop(&hop, &exchange)? {
                Some(next) => {
                    redirects += 1;
                    if redirects > MAX_REDIRECTS {
                        return Err(GurlError::transport(format!(
                            "stopped after {MAX_REDIRECTS} redirects"
                        )));
                    }
                    log::debug!("following {} redirect to {}", exchange.response.status(), next.url);
                    hop = next;
                }
                None => {
                    return ResponseAdapter::to_response_view(exchange, settings, self.progress.as_deref()).await;
                }
            }
        }
    }
}

impl HyperHttpClient {
    async fn execute_http_request(
        &self,
        hop: &Hop,
        settings: &TransportSettings,
        tls: &tokio_native_tls::TlsConnector,
    ) -> Result<Exchange> {
        let started = Instant::now();
        let mut trace = TraceInfo::default();
        let (stream, h2) = Connector::connect(&hop.url, settings, tls, &mut trace).await?;
        let (request, sent) = RequestAdapter::to_hyper_request(hop, settings, h2)?;

        let io = TokioIo::new(stream);
        let (outcome, written) = if h2 {
            let (mut sender, connection) = http2::handshake(TokioExecutor::new(), io)
                .await
                .map_err(|e| GurlError::transport(format!("http2 handshake failed: {e}")))?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    log::debug!("http2 connection closed: {err}");
                }
            });
            let written = Instant::now();
            (sender.send_request(request).await, written)
        } else {
            let (mut sender, connection) = http1::Builder::new()
                .title_case_headers(true)
                .handshake(io)
                .await
                .map_err(|e| GurlError::transport(format!("http1 handshake failed: {e}")))?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    log::debug!("http1 connection closed: {err}");
                }
            });
            let written = Instant::now();
            (sender.send_request(request).await, written)
        };
        let response = outcome
            .map_err(|e| GurlError::transport(format!("HTTP request execution failed: {e}")))?;
        trace.first_byte = written.elapsed();

        Ok(Exchange {
            response,
            sent,
            trace,
            started,
        })
    }
}

/// One request/response round trip, body not yet read
struct Exchange {
    response: hyper::Response<Incoming>,
    sent: SentRequest,
    trace: TraceInfo,
    started: Instant,
}

/// What is sent on one hop of a redirect chain
#[derive(Debug, Clone)]
struct Hop {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
}

impl From<&OutboundRequest> for Hop {
    fn from(request: &OutboundRequest) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }
}

/// Opens the TCP (and TLS) stream for a hop, recording phase timings
struct Connector;

impl Connector {
    async fn connect(
        url: &Url,
        settings: &TransportSettings,
        tls: &tokio_native_tls::TlsConnector,
        trace: &mut TraceInfo,
    ) -> Result<(Box<dyn Io>, bool)> {
        let peer = settings.proxy.as_ref().unwrap_or(url);
        let (host, port) = (peer.host(), peer.port());

        let dns_started = Instant::now();
        let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), port))
            .await
            .map_err(|e| GurlError::transport(format!("dns lookup for {host} failed: {e}")))?
            .collect();
        trace.dns_lookup = dns_started.elapsed();

        let connect_started = Instant::now();
        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    connected = Some((stream, addr));
                    break;
                }
                Err(err) => last_error = Some(err),
            }
        }
        let (tcp, remote) = connected.ok_or_else(|| {
            let reason = last_error.map_or_else(|| "no addresses found".to_string(), |e| e.to_string());
            GurlError::transport(format!("connect to {host}:{port} failed: {reason}"))
        })?;
        trace.tcp_connect = connect_started.elapsed();
        trace.remote_addr = Some(remote);
        let _ = tcp.set_nodelay(true);
        log::debug!("connected to {remote}");

        if !url.is_https() {
            let stream: Box<dyn Io> = Box::new(tcp);
            return Ok((stream, false));
        }

        let tls_started = Instant::now();
        let transport: Box<dyn Io> = match &settings.proxy {
            Some(proxy) => Box::new(ProxyTunnel::open(tcp, url, proxy).await?),
            None => Box::new(tcp),
        };
        let domain = url.host();
        let stream = tls
            .connect(&domain, transport)
            .await
            .map_err(|e| GurlError::transport(format!("tls handshake with {domain} failed: {e}")))?;
        trace.tls_handshake = tls_started.elapsed();

        let negotiated = stream.get_ref().negotiated_alpn().ok().flatten();
        let h2 = !settings.force_http1 && negotiated.as_deref() == Some(b"h2".as_slice());
        log::debug!("tls established with {domain}, h2: {h2}");
        let stream: Box<dyn Io> = Box::new(stream);
        Ok((stream, h2))
    }
}

/// HTTP CONNECT tunnel through a plain-text proxy
struct ProxyTunnel;

impl ProxyTunnel {
    /// Asks the proxy for a tunnel to `target` and hands back the raw stream
    /// once it answers with any 2xx.
    async fn open(tcp: TcpStream, target: &Url, proxy: &Url) -> Result<TokioIo<Upgraded>> {
        let authority = format!("{}:{}", target.0.host_str().unwrap_or_default(), target.port());
        let failed = |e: hyper::Error| GurlError::transport(format!("proxy {proxy} failed: {e}"));

        let (mut sender, connection) = http1::Builder::new()
            .title_case_headers(true)
            .handshake(TokioIo::new(tcp))
            .await
            .map_err(failed)?;
        tokio::spawn(async move {
            if let Err(err) = connection.with_upgrades().await {
                log::debug!("proxy connection closed: {err}");
            }
        });

        let mut builder = HyperRequest::builder()
            .method(hyper::Method::CONNECT)
            .uri(authority.as_str())
            .header(HOST, authority.as_str());
        if let Some(auth) = proxy_authorization(proxy) {
            builder = builder.header(PROXY_AUTHORIZATION, auth);
        }
        let request = builder
            .body(Empty::<Bytes>::new())
            .map_err(|e| GurlError::argument(format!("invalid tunnel target {authority}: {e}")))?;

        let response = sender.send_request(request).await.map_err(failed)?;
        if !response.status().is_success() {
            return Err(GurlError::transport(format!(
                "proxy {proxy} refused tunnel to {authority}: {}",
                response.status()
            )));
        }
        let upgraded = hyper::upgrade::on(response).await.map_err(failed)?;
        log::debug!("tunnel to {authority} open through {proxy}");
        Ok(TokioIo::new(upgraded))
    }
}

fn proxy_authorization(proxy: &Url) -> Option<String> {
    let user = proxy.0.username();
    if user.is_empty() {
        return None;
    }
    let credentials = BasicCredentials {
        user: user.to_string(),
        password: proxy.0.password().unwrap_or_default().to_string(),
    };
    Some(credentials.header_value())
}

/// Hop-by-hop headers HTTP/2 forbids
fn is_connection_specific(name: &str) -> bool {
    ["connection", "keep-alive", "proxy-connection", "transfer-encoding", "upgrade"]
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Adapter for converting a hop into a Hyper request
struct RequestAdapter;

impl RequestAdapter {
    fn to_hyper_request(
        hop: &Hop,
        settings: &TransportSettings,
        h2: bool,
    ) -> Result<(HyperRequest<Full<Bytes>>, SentRequest)> {
        let via_proxy = settings.proxy.as_ref().filter(|_| !hop.url.is_https());
        let target = if h2 || via_proxy.is_some() {
            hop.url.as_str().to_string()
        } else {
            hop.url.path_and_query()
        };
        let version = if h2 { Version::HTTP_2 } else { Version::HTTP_11 };

        let mut headers: Vec<(String, String)> = Vec::with_capacity(hop.headers.len() + 2);
        if !h2 && !hop.headers.contains("host") {
            headers.push(("Host".to_string(), hop.url.authority()));
        }
        for (name, value) in hop.headers.iter() {
            if h2 && (is_connection_specific(name) || name.eq_ignore_ascii_case("host")) {
                continue;
            }
            headers.push((name.to_string(), value.to_string()));
        }
        if let Some(auth) = via_proxy.and_then(proxy_authorization) {
            headers.push(("Proxy-Authorization".to_string(), auth));
        }

        let mut builder = HyperRequest::builder()
            .method(hyper::Method::from(hop.method))
            .uri(target.as_str())
            .version(version);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = Full::new(hop.body.clone().unwrap_or_default());
        let request = builder
            .body(body)
            .map_err(|e| GurlError::argument(format!("failed to build HTTP request: {e}")))?;

        let sent = SentRequest {
            method: hop.method.to_string(),
            target,
            version,
            headers,
        };
        Ok((request, sent))
    }
}

/// Decides whether a response continues the redirect chain
struct RedirectPolicy;

impl RedirectPolicy {
    fn next_hop(hop: &Hop, exchange: &Exchange) -> Result<Option<Hop>> {
        let status = exchange.response.status();
        if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            return Ok(None);
        }
        let Some(location) = exchange
            .response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };

        let url = hop.url.join(location)?;
        if !matches!(url.0.scheme(), "http" | "https") {
            return Err(GurlError::transport(format!(
                "refusing redirect to unsupported scheme: {url}"
            )));
        }

        let mut next = hop.clone();
        let becomes_get = (status == StatusCode::SEE_OTHER && hop.method != Method::Head)
            || (matches!(status.as_u16(), 301 | 302) && hop.method == Method::Post);
        if becomes_get {
            next.method = Method::Get;
            next.body = None;
            next.headers.remove("content-type");
            next.headers.remove("content-length");
        }
        if url.host() != hop.url.host() {
            next.headers.remove("authorization");
            next.headers.remove("cookie");
        }
        next.headers.remove("host");
        next.url = url;
        Ok(Some(next))
    }
}

/// Adapter for converting Hyper responses into response views
struct ResponseAdapter;

impl ResponseAdapter {
    async fn to_response_view(
        exchange: Exchange,
        settings: &TransportSettings,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<ResponseView> {
        let Exchange {
            response,
            sent,
            mut trace,
            started,
        } = exchange;
        let (parts, body) = response.into_parts();
        let transfer_started = Instant::now();

        let (body, saved_to) = match &settings.output {
            Some(path) => {
                let total = parts
                    .headers
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                Self::stream_to_file(body, path, total, progress).await?;
                (Bytes::new(), Some(path.clone()))
            }
            None => (Self::extract_response_body(body).await?, None),
        };

        let trace = settings.trace.then(|| {
            trace.content_transfer = transfer_started.elapsed();
            trace.total = started.elapsed();
            trace.version = parts.version;
            trace
        });

        Ok(ResponseView {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body,
            sent,
            trace,
            saved_to,
        })
    }

    async fn extract_response_body(body: Incoming) -> Result<Bytes> {
        Ok(body
            .collect()
            .await
            .map_err(|e| GurlError::transport(format!("failed to read response body: {e}")))?
            .to_bytes())
    }

    async fn stream_to_file(
        mut body: Incoming,
        path: &Path,
        total: Option<u64>,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<()> {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| GurlError::io(path, e))?;
        let mut downloaded = 0u64;
        while let Some(frame) = body.frame().await {
            let frame = frame
                .map_err(|e| GurlError::transport(format!("failed to read response body: {e}")))?;
            let Ok(data) = frame.into_data() else {
                continue;
            };
            file.write_all(&data).await.map_err(|e| GurlError::io(path, e))?;
            downloaded += data.len() as u64;
            if let (Some(total), Some(observer)) = (total.filter(|t| *t > 0), progress) {
                observer.on_progress(downloaded, total);
            }
        }
        file.flush().await.map_err(|e| GurlError::io(path, e))?;
        log::debug!("wrote {downloaded} bytes to {}", path.display());
        Ok(())
    }
}
