use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};

/// The request-issuing primitive every outbound call goes through.
///
/// The production implementation is a single keep-alive [`reqwest::Client`] constructed for the
/// run and shared by all collaborators.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl Transport for Client {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        Client::execute(self, request).await
    }
}

#[async_trait]
impl<T: Transport> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        self.as_ref().execute(request).await
    }
}
