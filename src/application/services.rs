use crate::application::retry::{self, LogRetryObserver, RetryObserver};
use crate::domain::entities::{Method, OutboundRequest, RequestSpec, ResponseView};
use crate::domain::errors::{GurlError, Result};
use crate::infrastructure::config::TEXT_CONTENT_TYPE;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for HTTP clients to enable mocking and dependency inversion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<ResponseView>;
}

/// Called on the transfer task for every body chunk written to an output
/// file whose total size is known. Must return quickly.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, downloaded: u64, total: u64);
}

/// Outcome of a dispatched request
#[derive(Debug)]
pub struct Dispatched {
    pub response: ResponseView,
    /// Request and response heads should be printed before the body
    pub dump_headers: bool,
}

/// Application service that turns a configured request into exactly one
/// logical call, retries included
pub struct HttpRequestService {
    http_client: Box<dyn HttpClient>,
    observer: Box<dyn RetryObserver>,
}

impl HttpRequestService {
    pub fn new(http_client: Box<dyn HttpClient>) -> Self {
        Self {
            http_client,
            observer: Box::new(LogRetryObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sends the request described by `spec`
    pub async fn dispatch(&self, spec: &RequestSpec) -> Result<Dispatched> {
        RequestValidator::validate(spec);
        let request = Self::prepare(spec);
        log::debug!(
            "dispatching {} {} with {} headers and {} body bytes",
            request.method,
            request.url,
            request.headers.len(),
            request.body.as_ref().map_or(0, |b| b.len())
        );

        let client = self;
        let outbound = &request;
        let timeout = spec.timeout;
        let response = retry::execute(
            spec.retry.as_ref(),
            spec.method,
            &spec.url,
            self.observer.as_ref(),
            move || client.attempt(outbound, timeout),
        )
        .await?;

        Ok(Dispatched {
            response,
            dump_headers: spec.dump || spec.method == Method::Head,
        })
    }

    /// One attempt, bounded by the per-attempt timeout
    async fn attempt(&self, request: &OutboundRequest, timeout: Duration) -> Result<ResponseView> {
        tokio::time::timeout(timeout, self.http_client.send(request))
            .await
            .map_err(|_| GurlError::Timeout(timeout))?
    }

    /// Derives the wire request: body only for body-carrying methods,
    /// a text content type for bodies nobody typed, Authorization last
    /// unless a custom header already set it.
    fn prepare(spec: &RequestSpec) -> OutboundRequest {
        let mut headers = spec.headers.clone();
        let body = if spec.method.carries_body() {
            spec.body.clone()
        } else {
            None
        };

        if body.is_some() && !headers.contains("content-type") {
            headers.set("Content-Type", TEXT_CONTENT_TYPE);
        }
        if let Some(value) = spec.auth.header_value() {
            if !headers.contains("authorization") {
                headers.set("Authorization", value);
            }
        }
        if let Some(browser) = spec.impersonate {
            headers.reorder(&browser.header_order());
        }

        OutboundRequest {
            method: spec.method,
            url: spec.url.clone(),
            headers,
            body,
            settings: spec.transport.clone(),
        }
    }
}

/// Domain service for request validation
pub struct RequestValidator;

impl RequestValidator {
    pub fn validate(spec: &RequestSpec) {
        Self::validate_method_body_combination(spec);
    }

    fn validate_method_body_combination(spec: &RequestSpec) {
        if spec.body.is_some() && !spec.method.carries_body() {
            log::warn!("{} requests do not send a body, ignoring payload", spec.method);
        }
        if let (Some(content_type), None) = (&spec.content_type, &spec.body) {
            log::debug!("content type '{content_type}' set on a request without body");
        }
    }
}
