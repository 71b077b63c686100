//! Source-control side of the reconciliation: repository lookup, container package and version
//! listings, and version deletion against the GitHub REST API.
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LINK};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::governor::RateLimitGovernor;
use crate::requests;
use crate::transport::Transport;
use crate::Result;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: &str = "100";

static NEXT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^<>]+)>;\s*rel="next""#).expect("valid regex"));

#[derive(Clone, Debug, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
    pub node_id: String,
    pub html_url: String,
    pub owner: RepositoryOwner,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PackageOwner {
    pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PackageRepository {
    pub node_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Package {
    pub name: String,
    pub url: String,
    pub owner: PackageOwner,
    pub repository: Option<PackageRepository>,
}

impl Package {
    /// Whether the package is backed by the repository identified by `node_id`.
    pub fn belongs_to(&self, node_id: &str) -> bool {
        self.repository
            .as_ref()
            .is_some_and(|r| r.node_id == node_id)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContainerMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub container: ContainerMetadata,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PackageVersion {
    pub name: String,
    pub url: String,
    pub html_url: String,
    #[serde(default)]
    pub metadata: VersionMetadata,
}

pub struct GitHub<T: Transport> {
    governor: Arc<RateLimitGovernor<T>>,
    api_url: Url,
    headers: HeaderMap,
}

impl<T: Transport> GitHub<T> {
    pub fn new(governor: Arc<RateLimitGovernor<T>>, api_url: Url, token: &str) -> Result<Self> {
        let mut headers = requests::default_headers(
            requests::bearer(token)?,
            HeaderValue::from_static(GITHUB_MEDIA_TYPE),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        Ok(Self {
            governor,
            api_url,
            headers,
        })
    }

    pub async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let url = self.api_url.join(&format!("repos/{owner}/{name}"))?;
        let response = self
            .governor
            .send(requests::request(Method::GET, url, &self.headers))
            .await?;
        requests::json(response).await
    }

    /// All container packages owned by the repository's owner, lazily fetched page by page.
    pub fn packages<'a>(
        &'a self,
        repository: &Repository,
    ) -> Result<impl Stream<Item = Result<Package>> + 'a> {
        let mut url = Url::parse(&format!(
            "{}/packages",
            repository.owner.url.trim_end_matches('/')
        ))?;
        url.query_pairs_mut()
            .append_pair("package_type", "container")
            .append_pair("per_page", PAGE_SIZE);
        Ok(self.paginate(url))
    }

    pub async fn versions(&self, package: &Package) -> Result<Vec<PackageVersion>> {
        let mut url = Url::parse(&format!("{}/versions", package.url.trim_end_matches('/')))?;
        url.query_pairs_mut().append_pair("per_page", PAGE_SIZE);
        self.paginate(url).try_collect().await
    }

    pub async fn delete_version(&self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        self.governor
            .send(requests::request(Method::DELETE, url, &self.headers))
            .await?;
        Ok(())
    }

    fn paginate<'a, D>(&'a self, first: Url) -> impl Stream<Item = Result<D>> + 'a
    where
        D: DeserializeOwned + 'a,
    {
        stream::try_unfold(Some(first), move |next| async move {
            match next {
                Some(url) => self.page::<D>(url).await.map(Some),
                None => Ok(None),
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
        .boxed_local()
    }

    async fn page<D: DeserializeOwned>(&self, url: Url) -> Result<(Vec<D>, Option<Url>)> {
        let response = self
            .governor
            .send(requests::request(Method::GET, url, &self.headers))
            .await?;
        let next = next_link(response.headers())?;
        Ok((requests::json(response).await?, next))
    }
}

fn next_link(headers: &HeaderMap) -> Result<Option<Url>> {
    let link = match headers.get(LINK).and_then(|v| v.to_str().ok()) {
        Some(link) => link,
        None => return Ok(None),
    };
    match NEXT_LINK.captures(link).and_then(|c| c.get(1)) {
        Some(m) => Ok(Some(Url::parse(m.as_str())?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;
    use crate::transport::testing::{CannedResponse, FakeTransport};

    #[rstest]
    #[case::none(None, None)]
    #[case::next_and_last(
        Some(r#"<https://api.github.com/users/octo/packages?page=2>; rel="next", <https://api.github.com/users/octo/packages?page=5>; rel="last""#),
        Some("https://api.github.com/users/octo/packages?page=2"),
    )]
    #[case::last_page(
        Some(r#"<https://api.github.com/users/octo/packages?page=1>; rel="prev", <https://api.github.com/users/octo/packages?page=1>; rel="first""#),
        None,
    )]
    fn parse_next_link(#[case] link: Option<&str>, #[case] expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        if let Some(link) = link {
            headers.insert(LINK, HeaderValue::from_str(link).unwrap());
        }
        let actual = next_link(&headers).unwrap();
        assert_eq!(actual.as_ref().map(Url::as_str), expected);
    }

    fn github(transport: FakeTransport) -> GitHub<FakeTransport> {
        let governor = Arc::new(RateLimitGovernor::new(transport));
        GitHub::new(
            governor,
            Url::parse("https://api.github.com/").unwrap(),
            "ghp_secret",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn packages_follow_next_links() {
        let transport = FakeTransport::default();
        transport
            .get(
                "https://api.github.com/users/octo/packages?package_type=container&per_page=100",
                CannedResponse::ok(
                    r#"[{"name":"a","url":"https://api.github.com/users/octo/packages/container/a","owner":{"login":"octo"},"repository":null}]"#,
                )
                .header(
                    "link",
                    r#"<https://api.github.com/users/octo/packages?package_type=container&per_page=100&page=2>; rel="next""#,
                ),
            )
            .get(
                "https://api.github.com/users/octo/packages?package_type=container&per_page=100&page=2",
                CannedResponse::ok(
                    r#"[{"name":"b","url":"https://api.github.com/users/octo/packages/container/b","owner":{"login":"octo"},"repository":{"node_id":"R1"}}]"#,
                ),
            );
        let github = github(transport);
        let repository = Repository {
            node_id: "R1".to_string(),
            html_url: "https://github.com/octo/widgets".to_string(),
            owner: RepositoryOwner {
                login: "octo".to_string(),
                url: "https://api.github.com/users/octo".to_string(),
            },
        };

        let packages: Vec<Package> = github
            .packages(&repository)
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!packages[0].belongs_to("R1"));
        assert!(packages[1].belongs_to("R1"));
    }

    #[tokio::test]
    async fn versions_without_metadata_have_no_tags() {
        let transport = FakeTransport::default();
        transport.get(
            "https://api.github.com/users/octo/packages/container/a/versions?per_page=100",
            CannedResponse::ok(
                r#"[{"name":"sha256:aaa","url":"https://api.github.com/users/octo/packages/container/a/versions/1","html_url":"https://github.com/users/octo/packages/container/a/1"}]"#,
            ),
        );
        let github = github(transport);
        let package = Package {
            name: "a".to_string(),
            url: "https://api.github.com/users/octo/packages/container/a".to_string(),
            owner: PackageOwner {
                login: "octo".to_string(),
            },
            repository: None,
        };

        let versions = github.versions(&package).await.unwrap();

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].name, "sha256:aaa");
        assert!(versions[0].metadata.container.tags.is_empty());
    }

    #[tokio::test]
    async fn repository_lookup_failure_propagates() {
        let github = github(FakeTransport::default());
        let err = github.repository("octo", "widgets").await.unwrap_err();
        assert!(
            matches!(err, crate::Error::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND),
            "{err:?}"
        );
    }
}
