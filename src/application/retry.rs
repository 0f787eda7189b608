use crate::domain::entities::{Method, ResponseView, RetryPolicy};
use crate::domain::errors::Result;
use crate::domain::value_objects::Url;
use std::future::Future;
use std::time::Duration;

/// Details handed to a [`RetryObserver`] before a retry is made
#[derive(Debug, Clone)]
pub struct RetryAttempt<'a> {
    pub method: Method,
    pub url: &'a Url,
    /// 1-based number of this retry
    pub retry: u32,
    pub max_retries: u32,
    pub delay: Duration,
    /// Why the previous attempt is being repeated
    pub reason: String,
}

/// Gets told about every retry; it cannot influence whether one happens
pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, attempt: &RetryAttempt<'_>);
}

/// Reports retries through the log
pub struct LogRetryObserver;

impl RetryObserver for LogRetryObserver {
    fn on_retry(&self, attempt: &RetryAttempt<'_>) {
        log::warn!(
            "retrying {} {} ({}/{}) in {:?}: {}",
            attempt.method,
            attempt.url,
            attempt.retry,
            attempt.max_retries,
            attempt.delay,
            attempt.reason
        );
    }
}

/// Runs `attempt` once, then again while the policy allows it.
///
/// Attempts are strictly sequential. Once retries are used up the last
/// outcome is returned as is, whether it is a 5xx response or an error.
pub async fn execute<F, Fut>(
    policy: Option<&RetryPolicy>,
    method: Method,
    url: &Url,
    observer: &dyn RetryObserver,
    mut attempt: F,
) -> Result<ResponseView>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ResponseView>>,
{
    let Some(policy) = policy else {
        return attempt().await;
    };

    let mut retry = 0;
    loop {
        let outcome = attempt().await;
        if retry >= policy.max_retries || !policy.should_retry(&outcome) {
            return outcome;
        }

        retry += 1;
        let delay = policy.backoff(retry);
        let reason = match &outcome {
            Ok(response) => format!("server answered {}", response.status),
            Err(err) => err.to_string(),
        };
        observer.on_retry(&RetryAttempt {
            method,
            url,
            retry,
            max_retries: policy.max_retries,
            delay,
            reason,
        });
        tokio::time::sleep(delay).await;
    }
}
