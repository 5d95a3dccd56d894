use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, FinishReason, ResponseFormat,
    },
    Client,
};
use tracing::debug;

use super::{Classifier, Generator};
use crate::error::ProviderError;

const AUGMENTED_SYSTEM: &str = "Search the web before answering. Answer the question, then list every source URL you relied on at the end of your answer.";
const CLASSIFIER_SYSTEM: &str = "You are a careful analyst. Reply with a single JSON object and nothing else.";

/// OpenAI-compatible chat client. `backend_id` is sent as the model name; the
/// augmented mode only adds a search instruction, so it is expected to be used
/// with search-capable models.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
}

impl LlmClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let mut cfg = OpenAIConfig::default();
        if let Some(url) = base_url { cfg = cfg.with_api_base(url); }
        if let Some(key) = api_key { cfg = cfg.with_api_key(key); }
        Self { client: Client::with_config(cfg) }
    }

    async fn chat(&self, backend_id: &str, messages: Vec<ChatCompletionRequestMessage>, json: bool) -> Result<String, ProviderError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(backend_id).messages(messages);
        if json {
            args.response_format(ResponseFormat::JsonObject);
        }
        let req = args.build().map_err(|e| map_openai_error(backend_id, e))?;

        let resp = self.client.chat().create(req).await.map_err(|e| map_openai_error(backend_id, e))?;
        let choice = resp.choices.into_iter().next().ok_or(ProviderError::EmptyResponse)?;
        if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
            return Err(ProviderError::Blocked(format!("{backend_id} filtered the completion")));
        }
        let text = choice.message.content.unwrap_or_default();
        debug!(backend = backend_id, chars = text.len(), "chat completion received");
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

fn system(content: &str) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(ChatCompletionRequestSystemMessageArgs::default().content(content).build()?.into())
}

fn user(content: &str) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into())
}

#[async_trait::async_trait]
impl Generator for LlmClient {
    async fn generate(&self, prompt: &str, backend_id: &str, augmented: bool) -> Result<String, ProviderError> {
        let build = || -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
            let mut messages = Vec::with_capacity(2);
            if augmented {
                messages.push(system(AUGMENTED_SYSTEM)?);
            }
            messages.push(user(prompt)?);
            Ok(messages)
        };
        let messages = build().map_err(|e| map_openai_error(backend_id, e))?;
        self.chat(backend_id, messages, false).await
    }
}

#[async_trait::async_trait]
impl Classifier for LlmClient {
    async fn classify(&self, prompt: &str, backend_id: &str) -> Result<String, ProviderError> {
        let messages = system(CLASSIFIER_SYSTEM)
            .and_then(|s| Ok(vec![s, user(prompt)?]))
            .map_err(|e| map_openai_error(backend_id, e))?;
        self.chat(backend_id, messages, true).await
    }
}

pub(crate) fn map_openai_error(backend_id: &str, err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or("").to_ascii_lowercase();
            let message = api.message.to_ascii_lowercase();
            let has = |needle: &str| kind.contains(needle) || message.contains(needle);
            if has("auth") || has("api key") || has("api_key") || has("permission") {
                ProviderError::Auth(api.message)
            } else if has("quota") || has("rate limit") || has("rate_limit") || has("billing") {
                ProviderError::Quota(api.message)
            } else if has("does not exist") || has("model_not_found") || has("not found") {
                ProviderError::NotFound(backend_id.to_string())
            } else if has("content_policy") || has("content_filter") || has("safety") {
                ProviderError::Blocked(api.message)
            } else {
                ProviderError::Transport(api.message)
            }
        }
        other => ProviderError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(kind: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: None,
        })
    }

    #[test]
    fn api_errors_map_to_provider_kinds() {
        assert!(matches!(
            map_openai_error("m", api_error(Some("invalid_request_error"), "Incorrect API key provided")),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            map_openai_error("m", api_error(Some("insufficient_quota"), "You exceeded your current quota")),
            ProviderError::Quota(_)
        ));
        assert_eq!(
            map_openai_error("gpt-9", api_error(Some("invalid_request_error"), "The model `gpt-9` does not exist")),
            ProviderError::NotFound("gpt-9".into())
        );
        assert!(matches!(
            map_openai_error("m", api_error(None, "Rejected by content_policy")),
            ProviderError::Blocked(_)
        ));
        assert!(matches!(map_openai_error("m", api_error(None, "upstream hiccup")), ProviderError::Transport(_)));
    }

    #[test]
    fn non_api_errors_are_transport() {
        let e = map_openai_error("m", OpenAIError::InvalidArgument("bad".into()));
        assert!(matches!(e, ProviderError::Transport(_)));
    }
}
