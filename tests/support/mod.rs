#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geotrack_rs::audit::Auditor;
use geotrack_rs::error::ProviderError;
use geotrack_rs::llm::{Classifier, Generator};
use geotrack_rs::resolve::ResolveOptions;
use geotrack_rs::types::BackendDescriptor;
use geotrack_rs::verdict::{TEXT_CLOSE, TEXT_OPEN};

/// Answers per backend id; unknown ids fail with `NotFound`. Prompts listed in
/// `blocked_prompts` fail on every backend.
#[derive(Default)]
pub struct FakeGenerator {
    pub answers: HashMap<String, Result<String, ProviderError>>,
    pub blocked_prompts: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn answer(mut self, id: &str, text: &str) -> Self {
        self.answers.insert(id.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, id: &str, err: ProviderError) -> Self {
        self.answers.insert(id.to_string(), Err(err));
        self
    }

    pub fn block_prompt(mut self, prompt: &str) -> Self {
        self.blocked_prompts.push(prompt.to_string());
        self
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str, backend_id: &str, _augmented: bool) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(backend_id.to_string());
        if self.blocked_prompts.iter().any(|p| p == prompt) {
            return Err(ProviderError::Blocked(format!("refused: {prompt}")));
        }
        self.answers
            .get(backend_id)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::NotFound(backend_id.to_string())))
    }
}

/// Case-insensitive containment, so a domain also matches its sub-domains and paths.
pub fn term_matches(haystack: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    !term.is_empty() && haystack.to_lowercase().contains(&term)
}

/// Applies substring matching to the text embedded in the prompt.
pub struct SubstringClassifier {
    pub term: String,
}

#[async_trait]
impl Classifier for SubstringClassifier {
    async fn classify(&self, prompt: &str, _backend_id: &str) -> Result<String, ProviderError> {
        let text = prompt
            .split_once(TEXT_OPEN)
            .and_then(|(_, rest)| rest.rsplit_once(TEXT_CLOSE))
            .map(|(text, _)| text)
            .unwrap_or_default();
        let sources: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.contains('.') && term_matches(w, &self.term))
            .collect();
        Ok(serde_json::json!({
            "mentioned": term_matches(text, &self.term),
            "sentiment": "positive",
            "sources": sources,
        })
        .to_string())
    }
}

pub struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, _prompt: &str, _backend_id: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Transport("connection reset".into()))
    }
}

pub fn auditor(
    generator: Arc<dyn Generator>,
    classifier: Arc<dyn Classifier>,
    backends: Vec<BackendDescriptor>,
) -> Auditor {
    Auditor {
        generator,
        classifier,
        backends,
        classifier_id: "judge".into(),
        resolve: ResolveOptions::default(),
        classify_timeout: Duration::from_secs(5),
        grounding: None,
        concurrency: 1,
    }
}
