use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::core::package::PackageId;
use crate::graph::DependencyGraph;
use crate::util::parallel::run_in_parallel;

/// Source of package landing pages. Implementations must be shareable
/// across the lookup worker pool.
pub trait Registry: Send + Sync {
    /// Returns the landing page for a published package, or `None` when
    /// the registry does not know the package (unlisted or private).
    fn package_link(&self, name: &str, version: &str) -> anyhow::Result<Option<String>>;
}

#[derive(Debug)]
pub struct LinkFailure {
    pub package: String,
    pub reason: String,
}

/// Looks up landing pages for every package still in the graph and
/// stores them on the nodes. Project references are skipped since a
/// registry has nothing to say about them.
///
/// Lookups run on a bounded worker pool; flipping `cancel` makes the
/// remaining lookups return without touching the network. Failures are
/// collected rather than aborting the pass, so one flaky lookup does
/// not cost the rest of the links.
pub fn add_links(
    graph: &mut DependencyGraph,
    registry: &dyn Registry,
    jobs: Option<usize>,
    cancel: &AtomicBool,
) -> Vec<LinkFailure> {
    let mut candidates: Vec<(PackageId, String, String)> = graph
        .packages()
        .filter(|package| !package.is_project_reference)
        .map(|package| {
            (
                package.id.clone(),
                package.name().to_string(),
                package.version.raw.clone(),
            )
        })
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let results = run_in_parallel(candidates, jobs, |(id, name, version)| {
        if cancel.load(Ordering::Relaxed) {
            return (id, name, Ok(None));
        }
        let result = registry.package_link(&name, &version);
        (id, name, result)
    });

    let mut failures = Vec::new();
    for (id, name, result) in results {
        match result {
            Ok(Some(link)) => graph.set_link(&id, link),
            Ok(None) => {}
            Err(err) => failures.push(LinkFailure {
                package: name,
                reason: format!("{err:#}"),
            }),
        }
    }
    failures
}

/// NuGet V3 flat container client. The registration base is probed with
/// `{base}/{id}/index.json`; a listed version maps to the package page
/// on nuget.org.
pub struct NuGetClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

impl NuGetClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.nuget.org/v3-flatcontainer";

    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("adze/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Registry for NuGetClient {
    fn package_link(&self, name: &str, version: &str) -> anyhow::Result<Option<String>> {
        let id = name.to_ascii_lowercase();
        let url = format!("{}/{}/index.json", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("request to {url} failed"))?;
        let index: VersionIndex = response
            .json()
            .with_context(|| format!("unexpected payload from {url}"))?;

        let version = version.to_ascii_lowercase();
        if index
            .versions
            .iter()
            .any(|listed| listed.eq_ignore_ascii_case(&version))
        {
            Ok(Some(format!(
                "https://www.nuget.org/packages/{name}/{version}"
            )))
        } else {
            Ok(None)
        }
    }
}
