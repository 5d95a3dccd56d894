use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::llm::{bounded, Classifier};
use crate::types::Verdict;

pub const TEXT_OPEN: &str = "Text: \"\"\"";
pub const TEXT_CLOSE: &str = "\"\"\"";

pub fn build_verdict_prompt(answer: &str, term: &str) -> String {
    format!(
        "Analyse this text generated by an AI assistant.\n\n\
         Goal: decide whether \"{term}\" is mentioned in the text or present among its sources.\n\
         Matching is case-insensitive and accepts sub-domains and paths, e.g. store.{term} or {term}/blog.\n\n\
         Reply with JSON:\n\
         {{\n  \"mentioned\": boolean (true only if {term} is found),\n  \"sentiment\": string,\n  \"sources\": list of strings (every URL cited in the text)\n}}\n\n\
         {TEXT_OPEN}{answer}{TEXT_CLOSE}\n"
    )
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(alias = "domain_detected")]
    mentioned: Option<bool>,
    sentiment: Option<String>,
    #[serde(alias = "all_urls_found")]
    sources: Option<Vec<String>>,
}

/// Strict: all three fields present with the right types, or an error.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ParseError> {
    let v: RawVerdict = serde_json::from_str(raw.trim())?;
    Ok(Verdict {
        mentioned: v.mentioned.ok_or(ParseError::MissingField("mentioned"))?,
        sentiment: v.sentiment.ok_or(ParseError::MissingField("sentiment"))?,
        sources: v.sources.ok_or(ParseError::MissingField("sources"))?,
    })
}

/// Single classification attempt. Any failure yields `Verdict::unavailable()`.
pub async fn extract_verdict(
    classifier: &dyn Classifier,
    backend_id: &str,
    answer: &str,
    term: &str,
    timeout: Duration,
) -> Verdict {
    let prompt = build_verdict_prompt(answer, term);
    let raw = match bounded(timeout, classifier.classify(&prompt, backend_id)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(backend = backend_id, error = %e, "classification failed; using default verdict");
            return Verdict::unavailable();
        }
    };
    match parse_verdict(&raw) {
        Ok(v) => {
            debug!(mentioned = v.mentioned, sources = v.sources.len(), "verdict parsed");
            v
        }
        Err(e) => {
            warn!(backend = backend_id, error = %e, "unusable classification output; using default verdict");
            Verdict::unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        out: Result<String, ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(out: Result<&str, ProviderError>) -> Self {
            Self { out: out.map(str::to_string), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait::async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _prompt: &str, _backend_id: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.out.clone()
        }
    }

    const T: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn well_formed_output_is_returned_verbatim() {
        let c = FixedClassifier::new(Ok(r#"{"mentioned":true,"sentiment":"positive","sources":["https://nike.com/a","https://x.org"]}"#));
        let v = extract_verdict(&c, "judge", "text", "nike.com", T).await;
        assert_eq!(v, Verdict {
            mentioned: true,
            sentiment: "positive".into(),
            sources: vec!["https://nike.com/a".into(), "https://x.org".into()],
        });
    }

    #[tokio::test]
    async fn legacy_field_names_are_accepted() {
        let c = FixedClassifier::new(Ok(r#"{"domain_detected":false,"sentiment":"neutral","all_urls_found":[]}"#));
        let v = extract_verdict(&c, "judge", "text", "nike.com", T).await;
        assert_eq!(v, Verdict { mentioned: false, sentiment: "neutral".into(), sources: vec![] });
    }

    #[tokio::test]
    async fn failures_yield_the_default_and_are_attempted_once() {
        let cases = [
            Err(ProviderError::Quota("out".into())),
            Ok("not json at all"),
            Ok(r#"{"mentioned":true,"sentiment":"positive"}"#),
            Ok(r#"{"mentioned":"yes","sentiment":"positive","sources":[]}"#),
            Ok(r#"["mentioned"]"#),
        ];
        for out in cases {
            let c = FixedClassifier::new(out);
            let v = extract_verdict(&c, "judge", "text", "nike.com", T).await;
            assert_eq!(v, Verdict::unavailable());
            assert_eq!(c.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_verdicts() {
        let c = FixedClassifier::new(Ok(r#"{"mentioned":true,"sentiment":"mixed","sources":["a"]}"#));
        let a = extract_verdict(&c, "judge", "same", "x", T).await;
        let b = extract_verdict(&c, "judge", "same", "x", T).await;
        assert_eq!(a, b);
    }

    struct HangingClassifier;

    #[async_trait::async_trait]
    impl Classifier for HangingClassifier {
        async fn classify(&self, _prompt: &str, _backend_id: &str) -> Result<String, ProviderError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_the_default() {
        let v = extract_verdict(&HangingClassifier, "judge", "text", "x", Duration::from_secs(1)).await;
        assert_eq!(v, Verdict::unavailable());
    }

    #[test]
    fn prompt_embeds_term_and_text() {
        let p = build_verdict_prompt("see shop.nike.com", "nike.com");
        assert!(p.contains("store.nike.com"));
        assert!(p.contains("nike.com/blog"));
        assert!(p.contains("Text: \"\"\"see shop.nike.com\"\"\""));
    }
}
