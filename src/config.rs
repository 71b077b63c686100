use std::fs::File;
use std::io::Read;
use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REGISTRY_URL: &str = "https://ghcr.io";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// One source of settings. The command line (with its environment fallbacks) and the optional
/// YAML config file each produce a layer; [`Config::resolve`] merges them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    pub token: Option<String>,
    pub repository: Option<String>,
    pub owner: Option<String>,
    pub api_url: Option<String>,
    pub registry_url: Option<String>,
    pub log_level: Option<String>,
    pub jobs: Option<usize>,
    pub dry_run: Option<bool>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut s = String::new();
        file.read_to_string(&mut s)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            token: self.token.or(lower.token),
            repository: self.repository.or(lower.repository),
            owner: self.owner.or(lower.owner),
            api_url: self.api_url.or(lower.api_url),
            registry_url: self.registry_url.or(lower.registry_url),
            log_level: self.log_level.or(lower.log_level),
            jobs: self.jobs.or(lower.jobs),
            dry_run: self.dry_run.or(lower.dry_run),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub repository: String,
    pub owner: String,
    pub api_url: Url,
    pub registry_url: Url,
    pub log_level: String,
    pub jobs: usize,
    pub dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("owner", &self.owner)
            .field("api_url", &self.api_url.as_str())
            .field("registry_url", &self.registry_url.as_str())
            .field("log_level", &self.log_level)
            .field("jobs", &self.jobs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Config {
    pub fn resolve(layer: ConfigLayer) -> Result<Self> {
        let token = non_empty(layer.token).ok_or(Error::MissingConfig("token"))?;
        let repository = non_empty(layer.repository).ok_or(Error::MissingConfig("repository"))?;
        let owner = non_empty(layer.owner).ok_or(Error::MissingConfig("owner"))?;

        let api_url = parse_url(layer.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let registry_url =
            parse_url(layer.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL))?;
        if registry_url.host_str().is_none() {
            return Err(Error::InvalidConfig(format!(
                "registry url {registry_url} has no host"
            )));
        }

        let log_level = layer
            .log_level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        if !matches!(
            log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "fatal"
        ) {
            return Err(Error::InvalidConfig(format!("unknown log level {log_level}")));
        }

        let jobs = layer.jobs.unwrap_or(1);
        if jobs == 0 {
            return Err(Error::InvalidConfig("jobs must be at least 1".to_string()));
        }

        Ok(Self {
            token,
            repository,
            owner,
            api_url,
            registry_url,
            log_level,
            jobs,
            dry_run: layer.dry_run.unwrap_or(false),
        })
    }

    /// The repository name with a matching `<owner>/` prefix removed.
    pub fn repository_name(&self) -> &str {
        self.repository
            .strip_prefix(&format!("{}/", self.owner))
            .unwrap_or(&self.repository)
    }

    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn log_filter(&self) -> &str {
        match self.log_level.as_str() {
            "fatal" => "error",
            level => level,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

// base urls are joined against, so they always end with a slash
fn parse_url(s: &str) -> Result<Url> {
    let s = if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    };
    Ok(Url::parse(&s)?)
}
