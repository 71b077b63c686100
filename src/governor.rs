//! Rate-limit aware wrapper around a [`Transport`].
//!
//! GitHub signals two kinds of throttling. A primary rate limit means the hourly quota is
//! exhausted and the response says when it resets; such a request is retried exactly once after
//! the advised delay. A secondary rate limit means the client is being too aggressive; it is
//! logged and never retried. Every other non-success status is turned into [`Error::Status`].
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use reqwest::{Request, Response, StatusCode};

use crate::transport::Transport;
use crate::{Error, Result};

const SECONDARY_RATE_LIMIT_DEFAULT: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq)]
pub enum RateLimit {
    Primary { retry_after: Duration },
    Secondary { retry_after: Duration },
}

/// Classify a response as a rate-limit signal. `now` is the current unix time in seconds and is
/// used to turn `x-ratelimit-reset` into a delay.
pub fn classify(status: StatusCode, headers: &HeaderMap, body: &str, now: u64) -> Option<RateLimit> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let retry_after = header_u64(headers, "retry-after").map(Duration::from_secs);

    if body.to_lowercase().contains("secondary rate limit") {
        return Some(RateLimit::Secondary {
            retry_after: retry_after.unwrap_or(SECONDARY_RATE_LIMIT_DEFAULT),
        });
    }

    if header_u64(headers, "x-ratelimit-remaining") == Some(0) {
        let retry_after = retry_after.unwrap_or_else(|| {
            let reset = header_u64(headers, "x-ratelimit-reset").unwrap_or(now);
            Duration::from_secs(reset.saturating_sub(now))
        });
        return Some(RateLimit::Primary { retry_after });
    }

    match (status, retry_after) {
        (StatusCode::TOO_MANY_REQUESTS, Some(retry_after)) => {
            Some(RateLimit::Primary { retry_after })
        }
        _ => None,
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub struct RateLimitGovernor<T: Transport> {
    transport: T,
}

impl<T: Transport> RateLimitGovernor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send `request`, returning the response only if it carries a success status.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let mut spare = request.try_clone();
        let mut request = request;
        let mut retry_count = 0u32;

        loop {
            tracing::debug!("{method} {url} (retry {retry_count})");
            let response = self.transport.execute(request).await?;
            let status = response.status();
            tracing::debug!("{method} {url} -> {status}");

            if status.is_success() {
                return Ok(response);
            }

            let headers = response.headers().clone();
            let message = response.text().await.unwrap_or_default();

            match classify(status, &headers, &message, unix_now()) {
                Some(RateLimit::Primary { retry_after }) => {
                    tracing::warn!("Request quota exhausted for request {method} {url}");
                    if retry_count > 0 {
                        return Err(Error::RateLimited {
                            method,
                            url,
                            retry_after,
                        });
                    }
                    let retry = spare
                        .take()
                        .ok_or_else(|| Error::RequestNotCloneable(url.clone()))?;
                    tracing::info!("Retrying after {} seconds!", retry_after.as_secs());
                    tokio::time::sleep(retry_after).await;
                    retry_count += 1;
                    request = retry;
                }
                Some(RateLimit::Secondary { retry_after }) => {
                    tracing::warn!(
                        "SecondaryRateLimit detected for request {method} {url} (advised retry after {} seconds)",
                        retry_after.as_secs()
                    );
                    return Err(Error::SecondaryRateLimited { method, url });
                }
                None => {
                    return Err(Error::Status {
                        method,
                        url,
                        status,
                        message,
                    });
                }
            }
        }
    }
}
