use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of user input, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Question(String);

impl Question {
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() { None } else { Some(Self(trimmed.to_string())) }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A generation backend in preference order. `augmented` asks the provider to
/// search the web before answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: String,
    #[serde(default)]
    pub augmented: bool,
}

impl BackendDescriptor {
    pub fn plain(id: impl Into<String>) -> Self { Self { id: id.into(), augmented: false } }
    pub fn augmented(id: impl Into<String>) -> Self { Self { id: id.into(), augmented: true } }
}

/// Parses `model` or `model+search`.
impl std::str::FromStr for BackendDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (id, augmented) = match s.strip_suffix("+search") {
            Some(id) => (id.trim(), true),
            None => (s, false),
        };
        if id.is_empty() {
            return Err(format!("empty backend id in `{s}`"));
        }
        Ok(Self { id: id.to_string(), augmented })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode { Augmented, Plain }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Provenance {
    Backend { id: String, mode: Mode },
    Failure,
}

impl Provenance {
    pub fn is_failure(&self) -> bool { matches!(self, Provenance::Failure) }

    pub fn label(&self) -> String {
        match self {
            Provenance::Backend { id, mode: Mode::Augmented } => format!("web search ({id})"),
            Provenance::Backend { id, mode: Mode::Plain } => format!("standard ({id})"),
            Provenance::Failure => "failure".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub backend: BackendDescriptor,
    pub mode: Mode,
}

/// Outcome of one resolution. `Failed` carries the last error's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered(GeneratedAnswer),
    Failed(String),
}

impl Resolution {
    pub fn text(&self) -> &str {
        match self {
            Resolution::Answered(a) => &a.text,
            Resolution::Failed(e) => e,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Resolution::Answered(a) => Provenance::Backend { id: a.backend.id.clone(), mode: a.mode },
            Resolution::Failed(_) => Provenance::Failure,
        }
    }
}

pub const SENTIMENT_UNAVAILABLE: &str = "n/a";
pub const SENTIMENT_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub mentioned: bool,
    pub sentiment: String,
    pub sources: Vec<String>,
}

impl Verdict {
    /// Substituted when classification fails or returns something unusable.
    pub fn unavailable() -> Self {
        Self { mentioned: false, sentiment: SENTIMENT_UNAVAILABLE.into(), sources: Vec::new() }
    }

    /// Used for questions that never produced an answer.
    pub fn errored() -> Self {
        Self { mentioned: false, sentiment: SENTIMENT_ERROR.into(), sources: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub question: Question,
    pub provenance: Provenance,
    pub verdict: Verdict,
    pub answer: String,
}

impl ResultRow {
    pub fn sources_preview(&self, n: usize) -> String {
        if self.verdict.sources.is_empty() {
            return "no URL cited".to_string();
        }
        self.verdict.sources.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}
