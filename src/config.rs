use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::{Auditor, Grounding};
use crate::llm::{Classifier, Generator};
use crate::resolve::ResolveOptions;
use crate::serper::{SearchFilter, Searcher};
use crate::types::BackendDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Brand or domain to look for, e.g. `nike.com`.
    pub target: String,
    /// Generation backends in preference order.
    pub backends: Vec<BackendDescriptor>,
    pub classifier: String,
    pub downgrade_augmented: bool,
    pub generation_timeout_secs: u64,
    pub classification_timeout_secs: u64,
    pub concurrency: usize,
    pub search: Option<SearchConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            backends: vec![
                BackendDescriptor::augmented("gpt-4o-search-preview"),
                BackendDescriptor::augmented("gpt-4o-mini-search-preview"),
                BackendDescriptor::plain("gpt-4o-mini"),
            ],
            classifier: "gpt-4o-mini".into(),
            downgrade_augmented: false,
            generation_timeout_secs: 60,
            classification_timeout_secs: 60,
            concurrency: 1,
            search: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub region: String,
    pub fetch: usize,
    pub max_results: usize,
    pub deny_url_substrings: Vec<String>,
    pub timeout_secs: u64,
    pub qps: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            region: "fr".into(),
            fetch: 10,
            max_results: 5,
            deny_url_substrings: vec!["/en/".into(), "/de/".into(), "/es/".into(), "/it/".into()],
            timeout_secs: 15,
            qps: 5,
        }
    }
}

impl AuditConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Checks shared by `run` and `serve`; the target may still come per request.
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            bail!("at least one generation backend is required");
        }
        if self.classifier.trim().is_empty() {
            bail!("no classifier backend configured");
        }
        if self.generation_timeout_secs == 0 || self.classification_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if let Some(s) = &self.search {
            if s.max_results == 0 {
                bail!("search.max_results must be positive");
            }
            if s.timeout_secs == 0 {
                bail!("search.timeout_secs must be at least one second");
            }
        }
        Ok(())
    }

    /// A batch run has no request to take the target from.
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;
        if self.target.trim().is_empty() {
            bail!("no target brand or domain configured");
        }
        Ok(())
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            timeout: Duration::from_secs(self.generation_timeout_secs),
            downgrade_augmented: self.downgrade_augmented,
        }
    }

    /// `searcher` is only used when a `search` block is configured.
    pub fn auditor(
        &self,
        generator: Arc<dyn Generator>,
        classifier: Arc<dyn Classifier>,
        searcher: Option<Arc<dyn Searcher>>,
    ) -> Result<Auditor> {
        let grounding = match (&self.search, searcher) {
            (None, _) => None,
            (Some(_), None) => bail!("search is configured but no search provider is available"),
            (Some(s), Some(searcher)) => Some(Grounding {
                searcher,
                region: s.region.clone(),
                fetch: s.fetch.max(s.max_results),
                filter: SearchFilter { deny_url_substrings: s.deny_url_substrings.clone(), max_results: s.max_results },
                timeout: Duration::from_secs(s.timeout_secs),
            }),
        };
        Ok(Auditor {
            generator,
            classifier,
            backends: self.backends.clone(),
            classifier_id: self.classifier.clone(),
            resolve: self.resolve_options(),
            classify_timeout: Duration::from_secs(self.classification_timeout_secs),
            grounding,
            concurrency: self.concurrency,
        })
    }
}
