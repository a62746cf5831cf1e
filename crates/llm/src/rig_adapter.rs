use rig::completion::{AssistantContent, CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use snafu::{ResultExt, ensure};

use super::model::{DEFAULT_GEMINI_MODEL, Model, default_gemini_models};
use super::provider::{
    BoxFuture, ChatReply, ChatSession, CompletionsFailedSnafu, EmptyMessageSnafu,
    HttpClientSnafu, LlmProvider, MissingApiKeySnafu, ProviderConfig, ProviderResult,
    SessionRequest,
};

pub const RIG_GEMINI_PROVIDER_ID: &str = "gemini";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

pub struct RigGeminiAdapter {
    config: ProviderConfig,
    models: Vec<Model>,
}

impl RigGeminiAdapter {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-adapter-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self {
            config,
            models: default_gemini_models(),
        })
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<gemini::Client> {
        let mut builder = gemini::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }
}

impl LlmProvider for RigGeminiAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn name(&self) -> &str {
        "Rig Gemini"
    }

    fn default_model(&self) -> &str {
        DEFAULT_GEMINI_MODEL
    }

    fn models(&self) -> &[Model] {
        &self.models
    }

    fn create_session<'a>(
        &'a self,
        request: SessionRequest,
    ) -> BoxFuture<'a, ProviderResult<Box<dyn ChatSession>>> {
        Box::pin(async move {
            let client = Self::build_client(&self.config)?;
            let model_id = if request.model_id.trim().is_empty() {
                DEFAULT_GEMINI_MODEL.to_string()
            } else {
                request.model_id.trim().to_string()
            };

            tracing::debug!(
                provider_id = %self.config.provider_id,
                model_id = %model_id,
                "created gemini chat session"
            );

            Ok(Box::new(RigChatSession {
                client,
                model_id,
                preamble: request.system_instruction,
                history: Vec::new(),
            }) as Box<dyn ChatSession>)
        })
    }
}

/// Gemini conversation backed by a locally accumulated history that is
/// replayed on every request.
struct RigChatSession {
    client: gemini::Client,
    model_id: String,
    preamble: String,
    history: Vec<RigMessage>,
}

impl RigChatSession {
    fn reply_text(choice: impl IntoIterator<Item = AssistantContent>) -> Option<String> {
        let text = choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// History stays a strict user/model alternation: an exchange without
    /// reply text leaves no trace.
    fn record_exchange(&mut self, message: &str, reply: Option<&str>) {
        if let Some(reply) = reply {
            self.history.push(RigMessage::user(message));
            self.history.push(RigMessage::assistant(reply));
        }
    }

    async fn send_inner(&mut self, message: &str) -> ProviderResult<ChatReply> {
        ensure!(
            !message.is_empty(),
            EmptyMessageSnafu {
                stage: "send-message"
            }
        );

        let model = self.client.completion_model(self.model_id.clone());
        let mut builder = model
            .completion_request(RigMessage::user(message))
            .messages(self.history.clone());

        if !self.preamble.trim().is_empty() {
            builder = builder.preamble(self.preamble.clone());
        }

        let response = builder.send().await.context(CompletionsFailedSnafu {
            stage: "send-completion",
        })?;

        let text = Self::reply_text(response.choice.into_iter());
        self.record_exchange(message, text.as_deref());

        tracing::debug!(
            model_id = %self.model_id,
            history_len = self.history.len(),
            has_text = text.is_some(),
            "gemini reply received"
        );

        Ok(ChatReply { text })
    }
}

impl ChatSession for RigChatSession {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn send<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, ProviderResult<ChatReply>> {
        Box::pin(self.send_inner(message))
    }
}
