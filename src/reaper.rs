use std::future;
use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Client, Url};

use crate::commits::CommitRefs;
use crate::config::Config;
use crate::github::{GitHub, Package, Repository};
use crate::governor::RateLimitGovernor;
use crate::requests::CLIENT_USER_AGENT;
use crate::registry::Registry;
use crate::transport::Transport;
use crate::versions::{Evaluated, Locations, Outcome, Summary, Verdict, Version};
use crate::Result;

/// Finds and deletes the container package versions of a repository whose source commit is no
/// longer reachable from any branch.
pub struct Reaper<T: Transport> {
    github: GitHub<T>,
    registry: Registry<T>,
    commits: CommitRefs<T>,
    owner: String,
    repository: String,
    registry_url: Url,
    jobs: usize,
    dry_run: bool,
}

impl Reaper<Client> {
    /// Build a reaper whose collaborators share one keep-alive connection pool.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder().user_agent(CLIENT_USER_AGENT).build()?;
        Self::new(client, config)
    }
}

impl<T: Transport> Reaper<T> {
    pub fn new(transport: T, config: &Config) -> Result<Self> {
        let governor = Arc::new(RateLimitGovernor::new(transport));
        Ok(Self {
            github: GitHub::new(governor.clone(), config.api_url.clone(), &config.token)?,
            registry: Registry::new(governor.clone(), &config.token)?,
            commits: CommitRefs::new(governor),
            owner: config.owner.clone(),
            repository: config.repository_name().to_string(),
            registry_url: config.registry_url.clone(),
            jobs: config.jobs,
            dry_run: config.dry_run,
        })
    }

    pub async fn run(&self) -> Result<Summary> {
        let repository = self.github.repository(&self.owner, &self.repository).await?;
        tracing::debug!(
            "Repository {} has node id {}",
            repository.html_url,
            repository.node_id
        );

        let mut summary = Summary {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let deleted = self
            .discover(&repository)?
            .map_ok(|package| self.enumerate(&repository, package))
            .try_buffer_unordered(self.jobs)
            .map_ok(|versions| stream::iter(versions.into_iter().map(Ok)))
            .try_flatten()
            .map_ok(|version| self.evaluate(version))
            .try_buffer_unordered(self.jobs)
            .inspect_ok(|evaluated| summary.record(&evaluated.verdict))
            .try_filter(|evaluated| future::ready(evaluated.is_orphaned()))
            .map_ok(|evaluated| self.delete(evaluated))
            .try_buffer_unordered(self.jobs)
            .try_fold(0, |count, _| future::ready(Ok(count + 1)))
            .await?;
        summary.deleted = deleted;

        if self.dry_run {
            tracing::info!("Will delete {} package versions", summary.deleted);
        } else {
            tracing::info!("Deleted {} package versions", summary.deleted);
        }
        tracing::info!(
            "Evaluated {} package versions: {} unlabelled, {} referenced, {} orphaned",
            summary.evaluated,
            summary.unlabelled,
            summary.referenced,
            summary.orphaned
        );

        Ok(summary)
    }

    /// The owner's container packages backed by `repository`. Matching is on the node id, which
    /// survives repository renames.
    fn discover<'a>(
        &'a self,
        repository: &'a Repository,
    ) -> Result<impl Stream<Item = Result<Package>> + 'a> {
        Ok(self
            .github
            .packages(repository)?
            .try_filter(move |package| future::ready(package.belongs_to(&repository.node_id))))
    }

    async fn enumerate(&self, repository: &Repository, package: Package) -> Result<Vec<Version>> {
        let at = Locations {
            registry_url: &self.registry_url,
            repository_html_url: &repository.html_url,
        };
        let versions = self
            .github
            .versions(&package)
            .await?
            .into_iter()
            .map(|version| Version::enrich(&package, version, &at))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            "Package {}/{} has {} versions",
            package.owner.login,
            package.name,
            versions.len()
        );
        Ok(versions)
    }

    async fn evaluate(&self, version: Version) -> Result<Evaluated> {
        tracing::debug!("Processing {}", version.display_image);

        let verdict = match self.registry.revision(&version).await? {
            None => Verdict::Unlabelled,
            Some(revision) => {
                if self.commits.exists(&version, &revision).await {
                    Verdict::Referenced { revision }
                } else {
                    Verdict::Orphaned { revision }
                }
            }
        };

        Ok(Evaluated { version, verdict })
    }

    async fn delete(&self, evaluated: Evaluated) -> Result<Outcome> {
        let version = &evaluated.version;
        tracing::info!("Deleting {} - {}", version.display_image, version.html_url);

        if self.dry_run {
            tracing::info!("DELETE {}", version.url);
            return Ok(Outcome::DeleteSkipped);
        }

        self.github.delete_version(&version.url).await?;
        Ok(Outcome::DeleteIssued)
    }
}
