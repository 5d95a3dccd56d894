use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::llm::{bounded, Generator};
use crate::types::{BackendDescriptor, GeneratedAnswer, Mode, Resolution};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub timeout: Duration,
    /// Retry a failed augmented attempt once in plain mode on the same backend.
    pub downgrade_augmented: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(60), downgrade_augmented: false }
    }
}

/// Walks `backends` in order and returns the first non-empty answer. Later
/// backends are never consulted once one answers.
pub async fn resolve(
    generator: &dyn Generator,
    prompt: &str,
    backends: &[BackendDescriptor],
    opts: &ResolveOptions,
) -> Resolution {
    let mut last_err: Option<ProviderError> = None;

    for backend in backends {
        let mut modes = Vec::with_capacity(2);
        if backend.augmented {
            modes.push(Mode::Augmented);
            if opts.downgrade_augmented { modes.push(Mode::Plain); }
        } else {
            modes.push(Mode::Plain);
        }

        for mode in modes {
            debug!(backend = %backend.id, ?mode, "attempting generation");
            match attempt(generator, prompt, &backend.id, mode, opts.timeout).await {
                Ok(text) => {
                    return Resolution::Answered(GeneratedAnswer { text, backend: backend.clone(), mode });
                }
                Err(e) => {
                    warn!(backend = %backend.id, ?mode, error = %e, "generation attempt discarded");
                    last_err = Some(e);
                }
            }
        }
    }

    let reason = match last_err {
        Some(e) => format!("error: {e}"),
        None => "error: no backend configured".to_string(),
    };
    Resolution::Failed(reason)
}

async fn attempt(
    generator: &dyn Generator,
    prompt: &str,
    backend_id: &str,
    mode: Mode,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let augmented = mode == Mode::Augmented;
    let text = bounded(timeout, generator.generate(prompt, backend_id, augmented)).await?;
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}
