use thiserror::Error;

/// Failure from a generation or classification backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("quota exhausted: {0}")]
    Quota(String),
    #[error("unknown backend `{0}`")]
    NotFound(String),
    #[error("content blocked by provider: {0}")]
    Blocked(String),
    #[error("backend returned an empty answer")]
    EmptyResponse,
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("search provider answered with status {0}")]
    Status(u16),
    #[error("could not decode search results: {0}")]
    Decode(String),
    #[error("search timed out after {0}s")]
    Timeout(u64),
}

/// Classification output that does not fit the verdict shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("classification output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("classification output is missing `{0}`")]
    MissingField(&'static str),
}
