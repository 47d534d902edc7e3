use anyhow::{Context, Result, bail};
use http::Uri;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{CatalogSource, CatalogVersion};
use crate::pacing::WaitPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the API under test, e.g. `http://127.0.0.1:3000`.
    pub host: String,
    pub users: usize,
    pub duration_seconds: u64,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub pacing: WaitPolicy,
    pub catalogs: BTreeMap<CatalogVersion, PathBuf>,
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskConfig {
    pub version: CatalogVersion,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// One year; keeps `now + duration` far from `Instant` overflow.
pub const MAX_DURATION_SECONDS: u64 = 365 * 24 * 60 * 60;

fn default_weight() -> u32 {
    1
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path))?;
        Self::parse(&content).with_context(|| format!("loading config {}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let uri: Uri = self
            .host
            .parse()
            .with_context(|| format!("invalid host {}", self.host))?;
        if uri.scheme_str() != Some("http") || uri.authority().is_none() {
            bail!("host must be an http:// URL with an authority, got {}", self.host);
        }
        if self.users == 0 {
            bail!("users must be at least 1");
        }
        if self.duration_seconds == 0 || self.duration_seconds > MAX_DURATION_SECONDS {
            bail!(
                "duration_seconds must be between 1 and {}, got {}",
                MAX_DURATION_SECONDS,
                self.duration_seconds
            );
        }
        if self.request_timeout_seconds == Some(0) {
            bail!("request_timeout_seconds must be at least 1 when set");
        }
        if self.tasks.is_empty() {
            bail!("at least one [[tasks]] entry is required");
        }
        for task in &self.tasks {
            if task.weight == 0 {
                bail!("task for {} has weight 0", task.version);
            }
            if !self.catalogs.contains_key(&task.version) {
                bail!("task for {} has no entry under [catalogs]", task.version);
            }
        }
        self.pacing.validate()?;
        Ok(())
    }

    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::new(self.catalogs.clone())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}
