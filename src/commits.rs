//! Decides whether a commit is still reachable from a branch.
//!
//! The repository's `branch_commits/<sha>` page lists the branches containing a commit as links.
//! No links means the commit is not on any branch any more. Anything that prevents reading the
//! page counts as "exists": a version is only ever deleted on positive evidence.
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use scraper::{Html, Selector};

use crate::governor::RateLimitGovernor;
use crate::requests;
use crate::transport::Transport;
use crate::versions::Version;
use crate::Result;

static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

pub struct CommitRefs<T: Transport> {
    governor: Arc<RateLimitGovernor<T>>,
    headers: HeaderMap,
}

impl<T: Transport> CommitRefs<T> {
    pub fn new(governor: Arc<RateLimitGovernor<T>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
        Self { governor, headers }
    }

    pub async fn exists(&self, version: &Version, sha: &str) -> bool {
        tracing::debug!("Checking commit {sha}");
        match self.branch_refs(version, sha).await {
            Ok(links) if links.is_empty() => {
                tracing::debug!("No refs found for commit {sha}");
                false
            }
            Ok(links) => {
                tracing::debug!("Refs found for commit {sha}: {links:?}");
                true
            }
            Err(e) => {
                tracing::error!("Error checking commit {sha}: {e}");
                true
            }
        }
    }

    /// The `href` of every link on the commit's branch-refs page.
    async fn branch_refs(&self, version: &Version, sha: &str) -> Result<Vec<String>> {
        let url = version.commit_refs_url(sha)?;
        let response = self
            .governor
            .send(requests::request(Method::GET, url, &self.headers))
            .await?;
        let body = response.text().await?;
        Ok(links(&body))
    }
}

fn links(html: &str) -> Vec<String> {
    Html::parse_fragment(html)
        .select(&LINKS)
        .map(|a| a.value().attr("href").unwrap_or_default().to_string())
        .collect()
}
