use snafu::Snafu;

use super::model::Model;

pub use futures::future::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub api_key: String,
    pub endpoint: String,
}

impl ProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
        }
    }
}

/// Parameters a remote conversation is bound to for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub model_id: String,
    pub system_instruction: String,
}

impl SessionRequest {
    pub fn new(model_id: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            system_instruction: system_instruction.into(),
        }
    }
}

/// One reply from the remote endpoint. `text` is `None` when the endpoint
/// answered without any text part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub text: Option<String>,
}

impl ChatReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("missing API key for provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("cannot send an empty message on `{stage}`"))]
    EmptyMessage { stage: &'static str },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completions failed on `{stage}`, {source}"))]
    CompletionsFailed {
        stage: &'static str,
        source: rig::completion::CompletionError,
    },
    #[snafu(display("remote endpoint failed on `{stage}`: {message}"))]
    Remote {
        stage: &'static str,
        message: String,
    },
}

/// A hosted conversational endpoint able to open stateful sessions.
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
    fn models(&self) -> &[Model];
    fn create_session<'a>(
        &'a self,
        request: SessionRequest,
    ) -> BoxFuture<'a, ProviderResult<Box<dyn ChatSession>>>;
}

/// Remote conversational state. Each successful `send` becomes part of the
/// context seen by the next one; callers must not interleave sends.
pub trait ChatSession: Send {
    fn model_id(&self) -> &str;
    fn send<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, ProviderResult<ChatReply>>;
}
