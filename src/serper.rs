// src/serper.rs
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    #[serde(alias = "link")]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait::async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchItem>, SearchError>;
}

/// Drops results whose URL contains a denylisted substring, then caps the count.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub deny_url_substrings: Vec<String>,
    pub max_results: usize,
}

impl SearchFilter {
    pub fn apply(&self, items: Vec<SearchItem>) -> Vec<SearchItem> {
        items
            .into_iter()
            .filter(|it| !self.deny_url_substrings.iter().any(|d| it.url.contains(d.as_str())))
            .take(self.max_results)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SerperResp {
    #[serde(default)]
    organic: Vec<SearchItem>,
}

pub struct Serper {
    http: Client,
    key: String,
    limiter: DefaultDirectRateLimiter,
    timeout_secs: u64,
}

impl Serper {
    pub fn new(key: String, qps: u32, timeout: Duration) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let qps = NonZeroU32::new(qps).unwrap_or(nonzero!(1u32));
        let limiter = RateLimiter::direct(Quota::per_second(qps));
        Ok(Self { http, key, limiter, timeout_secs: timeout.as_secs() })
    }

    fn map_reqwest(&self, e: reqwest::Error) -> SearchError {
        if e.is_timeout() {
            SearchError::Timeout(self.timeout_secs)
        } else if let Some(status) = e.status() {
            SearchError::Status(status.as_u16())
        } else if e.is_decode() {
            SearchError::Decode(e.to_string())
        } else {
            SearchError::Transport(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Searcher for Serper {
    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchItem>, SearchError> {
        self.limiter.until_ready().await;
        let resp = self.http
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", &self.key)
            .json(&serde_json::json!({ "q": query, "gl": region, "hl": region, "num": max_results }))
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_reqwest(e))?
            .json::<SerperResp>().await
            .map_err(|e| self.map_reqwest(e))?;
        Ok(resp.organic.into_iter().take(max_results).collect())
    }
}

/// Evidence block prepended to a question when a search stage is configured.
pub fn render_evidence(items: &[SearchItem]) -> String {
    items.iter().map(|h| format!("- {} [{}]\n{}", h.title, h.url, h.snippet)).collect::<Vec<_>>().join("\n")
}
