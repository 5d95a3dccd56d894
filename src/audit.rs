use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::SearchError;
use crate::llm::{Classifier, Generator};
use crate::resolve::{resolve, ResolveOptions};
use crate::serper::{render_evidence, SearchFilter, Searcher};
use crate::types::{BackendDescriptor, Provenance, Question, Resolution, ResultRow, Verdict};
use crate::verdict::extract_verdict;

/// Optional web search run before generation; hits are rendered into the prompt.
pub struct Grounding {
    pub searcher: Arc<dyn Searcher>,
    pub region: String,
    /// How many results to request before filtering.
    pub fetch: usize,
    pub filter: SearchFilter,
    pub timeout: Duration,
}

impl Grounding {
    async fn evidence(&self, question: &Question) -> Result<String, SearchError> {
        let call = self.searcher.search(question.as_str(), &self.region, self.fetch);
        let hits = match tokio::time::timeout(self.timeout, call).await {
            Ok(r) => r?,
            Err(_) => return Err(SearchError::Timeout(self.timeout.as_secs())),
        };
        Ok(render_evidence(&self.filter.apply(hits)))
    }
}

pub struct Auditor {
    pub generator: Arc<dyn Generator>,
    pub classifier: Arc<dyn Classifier>,
    pub backends: Vec<BackendDescriptor>,
    pub classifier_id: String,
    pub resolve: ResolveOptions,
    pub classify_timeout: Duration,
    pub grounding: Option<Grounding>,
    /// Questions in flight at once; 1 keeps processing strictly sequential.
    pub concurrency: usize,
}

impl Auditor {
    pub async fn audit_question(&self, question: &Question, target: &str) -> ResultRow {
        let prompt = match &self.grounding {
            None => question.to_string(),
            Some(g) => match g.evidence(question).await {
                Ok(ev) if ev.is_empty() => question.to_string(),
                Ok(ev) => format!("Web results:\n{ev}\n\nQuestion: {question}"),
                Err(e) => {
                    warn!(question = %question, error = %e, "search failed");
                    return ResultRow {
                        question: question.clone(),
                        provenance: Provenance::Failure,
                        verdict: Verdict::errored(),
                        answer: format!("error: {e}"),
                    };
                }
            },
        };

        let resolution = resolve(self.generator.as_ref(), &prompt, &self.backends, &self.resolve).await;
        let verdict = match &resolution {
            Resolution::Failed(_) => Verdict::errored(),
            Resolution::Answered(a) => {
                extract_verdict(self.classifier.as_ref(), &self.classifier_id, &a.text, target, self.classify_timeout).await
            }
        };

        ResultRow {
            question: question.clone(),
            provenance: resolution.provenance(),
            verdict,
            answer: resolution.text().to_string(),
        }
    }

    /// Rows come back in input order regardless of `concurrency`.
    pub async fn run(&self, questions: &[Question], target: &str) -> Vec<ResultRow> {
        let total = questions.len();
        let tasks: Vec<_> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| async move {
                let row = self.audit_question(q, target).await;
                info!(
                    done = i + 1,
                    total,
                    provenance = %row.provenance.label(),
                    mentioned = row.verdict.mentioned,
                    "question audited"
                );
                row
            })
            .collect();
        stream::iter(tasks).buffered(self.concurrency.max(1)).collect().await
    }
}
