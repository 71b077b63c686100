//! The per-stage records a package version moves through. Each stage builds a new value from the
//! previous one instead of mutating it.
use reqwest::Url;

use crate::github::{Package, PackageVersion};
use crate::{OciDigest, Result};

/// Location of the registry and source repository a package's versions are resolved against.
pub struct Locations<'a> {
    pub registry_url: &'a Url,
    pub repository_html_url: &'a str,
}

/// A package version enriched with everything needed to resolve and, if orphaned, delete it.
#[derive(Clone, Debug)]
pub struct Version {
    pub digest: OciDigest,
    pub owner: String,
    pub package: String,
    pub tags: Vec<String>,
    /// API url; also the delete url.
    pub url: String,
    pub html_url: String,
    /// `<registry-host>/<owner>/<name>@<digest>`
    pub image: String,
    /// `<registry-host>/<owner>/<name>:<first-tag>`, or [`Version::image`] when untagged.
    pub display_image: String,
    pub manifest_url: Url,
    pub blob_base_url: Url,
    pub commit_refs_base_url: Url,
}

impl Version {
    pub fn enrich(package: &Package, version: PackageVersion, at: &Locations) -> Result<Self> {
        let digest: OciDigest = (&version.name).try_into()?;
        let owner = package.owner.login.clone();

        let repository = format!("{}/{}/{}", registry_host(at.registry_url), owner, package.name);
        let registry_base = at
            .registry_url
            .join(&format!("/v2/{}/{}/", owner, package.name))?;
        let commit_refs_base_url = Url::parse(&format!(
            "{}/",
            at.repository_html_url.trim_end_matches('/')
        ))?
        .join("branch_commits")?;

        let image = format!("{repository}@{digest}");
        let tags = version.metadata.container.tags;
        let display_image = match tags.first() {
            Some(tag) => format!("{repository}:{tag}"),
            None => image.clone(),
        };

        Ok(Self {
            manifest_url: registry_base.join(&format!("manifests/{digest}"))?,
            blob_base_url: registry_base.join("blobs/")?,
            commit_refs_base_url,
            digest,
            owner,
            package: package.name.clone(),
            tags,
            url: version.url,
            html_url: version.html_url,
            image,
            display_image,
        })
    }

    pub fn commit_refs_url(&self, sha: &str) -> Result<Url> {
        let mut url = self.commit_refs_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(sha);
        Ok(url)
    }
}

fn registry_host(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Outcome of checking a version's revision against the source repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No revision label; never deleted.
    Unlabelled,
    /// The revision is still referenced by at least one branch, or that could not be determined.
    Referenced { revision: String },
    /// The revision is no longer referenced by any branch.
    Orphaned { revision: String },
}

#[derive(Clone, Debug)]
pub struct Evaluated {
    pub version: Version,
    pub verdict: Verdict,
}

impl Evaluated {
    pub fn is_orphaned(&self) -> bool {
        matches!(self.verdict, Verdict::Orphaned { .. })
    }
}

/// Terminal state of an orphaned version after the deletion stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    DeleteIssued,
    DeleteSkipped,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub evaluated: usize,
    pub unlabelled: usize,
    pub referenced: usize,
    pub orphaned: usize,
    pub deleted: usize,
    pub dry_run: bool,
}

impl Summary {
    pub fn record(&mut self, verdict: &Verdict) {
        self.evaluated += 1;
        match verdict {
            Verdict::Unlabelled => self.unlabelled += 1,
            Verdict::Referenced { .. } => self.referenced += 1,
            Verdict::Orphaned { .. } => self.orphaned += 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::github::{ContainerMetadata, PackageOwner, PackageRepository, VersionMetadata};

    fn package() -> Package {
        Package {
            name: "widgets".to_string(),
            url: "https://api.github.com/users/octo/packages/container/widgets".to_string(),
            owner: PackageOwner {
                login: "octo".to_string(),
            },
            repository: Some(PackageRepository {
                node_id: "R1".to_string(),
            }),
        }
    }

    fn package_version(tags: &[&str]) -> PackageVersion {
        PackageVersion {
            name: "sha256:aaa".to_string(),
            url: "https://api.github.com/users/octo/packages/container/widgets/versions/1"
                .to_string(),
            html_url: "https://github.com/users/octo/packages/container/widgets/1".to_string(),
            metadata: VersionMetadata {
                container: ContainerMetadata {
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                },
            },
        }
    }

    fn enrich(registry: &str, tags: &[&str]) -> Result<Version> {
        let registry_url = Url::parse(registry).unwrap();
        let at = Locations {
            registry_url: &registry_url,
            repository_html_url: "https://github.com/octo/widgets",
        };
        Version::enrich(&package(), package_version(tags), &at)
    }

    #[test]
    fn derived_urls() {
        let version = enrich("https://ghcr.io/", &["v1", "latest"]).unwrap();

        assert_eq!(version.image, "ghcr.io/octo/widgets@sha256:aaa");
        assert_eq!(version.display_image, "ghcr.io/octo/widgets:v1");
        assert_eq!(
            version.manifest_url.as_str(),
            "https://ghcr.io/v2/octo/widgets/manifests/sha256:aaa"
        );
        assert_eq!(
            version.blob_base_url.as_str(),
            "https://ghcr.io/v2/octo/widgets/blobs/"
        );
        assert_eq!(
            version.commit_refs_url("c0ffee").unwrap().as_str(),
            "https://github.com/octo/widgets/branch_commits/c0ffee"
        );
        assert_eq!(
            version.commit_refs_url("../../admin").unwrap().as_str(),
            "https://github.com/octo/widgets/branch_commits/..%2F..%2Fadmin"
        );
    }

    #[test]
    fn untagged_version_displays_digest() {
        let version = enrich("https://ghcr.io", &[]).unwrap();
        assert_eq!(version.display_image, version.image);
    }

    #[test]
    fn registry_port_is_part_of_the_image() {
        let version = enrich("http://localhost:5000/", &["v1"]).unwrap();
        assert_eq!(version.display_image, "localhost:5000/octo/widgets:v1");
        assert_eq!(
            version.manifest_url.as_str(),
            "http://localhost:5000/v2/octo/widgets/manifests/sha256:aaa"
        );
    }

    #[test]
    fn malformed_digest_is_rejected() {
        let registry_url = Url::parse("https://ghcr.io/").unwrap();
        let at = Locations {
            registry_url: &registry_url,
            repository_html_url: "https://github.com/octo/widgets",
        };
        let mut version = package_version(&[]);
        version.name = "latest".to_string();
        let err = Version::enrich(&package(), version, &at).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidDigest(_)), "{err:?}");
    }
}
