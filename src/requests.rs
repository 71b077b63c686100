use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Request, Response, Url};
use serde::de::DeserializeOwned;

use crate::Result;

pub(crate) const CLIENT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub(crate) fn request(method: Method, url: Url, headers: &HeaderMap) -> Request {
    let mut request = Request::new(method, url);
    request.headers_mut().extend(headers.clone());
    request
        .headers_mut()
        .insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    request
}

pub(crate) fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

pub(crate) fn accept(media_types: &[&str]) -> Result<HeaderValue> {
    Ok(HeaderValue::from_str(&media_types.join(", "))?)
}

pub(crate) fn default_headers(authorization: HeaderValue, accept: HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(ACCEPT, accept);
    headers
}

pub(crate) async fn json<D: DeserializeOwned>(response: Response) -> Result<D> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
