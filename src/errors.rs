use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {message}")]
    Status {
        method: Method,
        url: Url,
        status: StatusCode,
        message: String,
    },

    #[error("request quota exhausted for {method} {url}, retry after {retry_after:?} did not help")]
    RateLimited {
        method: Method,
        url: Url,
        retry_after: Duration,
    },

    #[error("secondary rate limit hit for {method} {url}")]
    SecondaryRateLimited { method: Method, url: Url },

    #[error("request for {0} cannot be retried")]
    RequestNotCloneable(Url),

    #[error("invalid header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config deserialization error")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("io error")]
    Io(#[from] std::io::Error),
}
