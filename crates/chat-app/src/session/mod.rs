use std::sync::Arc;

use agix_llm::{
    ChatSession, LlmProvider, ProviderConfig, ProviderError, ProviderResult, SessionRequest,
    create_provider,
};
use snafu::{OptionExt, ResultExt, Snafu};
use tokio::sync::Mutex;

use crate::persona::Persona;
use crate::settings::SettingsStore;

#[cfg(test)]
pub(crate) mod testing;

/// Reply used when no credential is configured.
pub const OFFLINE_REPLY: &str = "Systems offline. (Missing API Key)";
/// Reply used when the endpoint answered without any text.
pub const INTERRUPTED_REPLY: &str = "Transmission interrupted.";
/// Reply used for every transport or endpoint failure.
pub const SIGNAL_LOST_REPLY: &str = "Signal lost. Try again later.";

/// Builds the provider a session is created from.
pub type ProviderFactory =
    Arc<dyn Fn(ProviderConfig) -> ProviderResult<Arc<dyn LlmProvider>> + Send + Sync>;

/// Failure kinds recognized at the manager boundary. None of them escape
/// `SessionManager::send_message`; each maps to one fixed reply.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExchangeError {
    #[snafu(display("no API key configured on `{stage}`"))]
    ConfigurationMissing { stage: &'static str },
    #[snafu(display("remote endpoint returned no text on `{stage}`"))]
    EmptyReply { stage: &'static str },
    #[snafu(display("remote exchange failed on `{stage}`: {source}"))]
    TransportFailure {
        stage: &'static str,
        source: ProviderError,
    },
}

impl ExchangeError {
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing { .. } => OFFLINE_REPLY,
            Self::EmptyReply { .. } => INTERRUPTED_REPLY,
            Self::TransportFailure { .. } => SIGNAL_LOST_REPLY,
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Owns the one remote conversation of the process.
///
/// The session is created on the first send that finds a credential and is
/// reused for every later send. Creation failures are not cached, so the next
/// send retries. The handle sits behind an async mutex which also serializes
/// sends against the remote state.
pub struct SessionManager {
    settings: Arc<SettingsStore>,
    persona: Persona,
    factory: ProviderFactory,
    session: Mutex<Option<Box<dyn ChatSession>>>,
}

impl SessionManager {
    pub fn new(settings: Arc<SettingsStore>, persona: Persona) -> Self {
        Self::with_factory(settings, persona, Arc::new(create_provider))
    }

    pub fn with_factory(
        settings: Arc<SettingsStore>,
        persona: Persona,
        factory: ProviderFactory,
    ) -> Self {
        Self {
            settings,
            persona,
            factory,
            session: Mutex::new(None),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// True when a credential is currently available.
    pub fn is_configured(&self) -> bool {
        self.settings.settings().is_valid()
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Model the active session is bound to, if one exists.
    pub async fn model_id(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.model_id().to_string())
    }

    /// Sends one message and always resolves to display-ready text.
    pub async fn send_message(&self, text: &str) -> String {
        match self.try_send(text).await {
            Ok(reply) => reply,
            Err(error) => {
                match &error {
                    ExchangeError::ConfigurationMissing { .. } => {
                        tracing::warn!("chat send skipped: {error}");
                    }
                    ExchangeError::EmptyReply { .. } => {
                        tracing::warn!(error = %error, "remote reply had no text");
                    }
                    ExchangeError::TransportFailure { stage, source } => {
                        tracing::error!(stage = *stage, error = %source, "remote chat exchange failed");
                    }
                }
                error.fallback_text().to_string()
            }
        }
    }

    /// Sends one message and reports which failure kind occurred, if any.
    pub async fn try_send(&self, text: &str) -> ExchangeResult<String> {
        let settings = self.settings.settings();
        let config = settings
            .to_provider_config()
            .context(ConfigurationMissingSnafu {
                stage: "check-credential",
            })?;

        let mut slot = self.session.lock().await;
        let session = self
            .ensure_session(&mut slot, config, &settings.model)
            .await?;

        let reply = session.send(text).await.context(TransportFailureSnafu {
            stage: "send-message",
        })?;

        reply
            .text
            .filter(|text| !text.trim().is_empty())
            .context(EmptyReplySnafu {
                stage: "read-reply",
            })
    }

    /// Returns the cached session or creates it. The slot stays empty when
    /// creation fails.
    async fn ensure_session<'a>(
        &self,
        slot: &'a mut Option<Box<dyn ChatSession>>,
        config: ProviderConfig,
        model_id: &str,
    ) -> ExchangeResult<&'a mut Box<dyn ChatSession>> {
        let session = match slot.take() {
            Some(session) => session,
            None => self.create_session(config, model_id).await?,
        };

        Ok(slot.insert(session))
    }

    async fn create_session(
        &self,
        config: ProviderConfig,
        model_id: &str,
    ) -> ExchangeResult<Box<dyn ChatSession>> {
        let provider = (self.factory)(config).context(TransportFailureSnafu {
            stage: "create-provider",
        })?;

        let request = SessionRequest::new(model_id, self.persona.system_instruction.clone());
        let session = provider
            .create_session(request)
            .await
            .context(TransportFailureSnafu {
                stage: "create-session",
            })?;

        tracing::info!(
            provider_id = %provider.id(),
            model_id = %session.model_id(),
            "chat session initialized"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::{MockBehavior, configured_manager, unconfigured_manager};
    use super::*;
    use crate::settings::AppSettings;

    #[tokio::test]
    async fn missing_credential_short_circuits_without_remote_calls() {
        let (manager, endpoint) = unconfigured_manager(MockBehavior::Reply("unused"));

        assert!(!manager.is_configured());
        assert_eq!(manager.send_message("hello").await, OFFLINE_REPLY);
        assert_eq!(endpoint.factory_calls.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint.sessions_created.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint.sends.load(Ordering::SeqCst), 0);
        assert!(!manager.has_session().await);
    }

    #[tokio::test]
    async fn missing_credential_is_reported_as_configuration_missing() {
        let (manager, _endpoint) = unconfigured_manager(MockBehavior::Reply("unused"));

        let error = manager.try_send("hello").await.unwrap_err();
        assert!(matches!(error, ExchangeError::ConfigurationMissing { .. }));
    }

    #[tokio::test]
    async fn reply_text_is_returned_verbatim() {
        let (manager, endpoint) = configured_manager(MockBehavior::Reply("Hi there"));

        assert_eq!(manager.send_message("hello").await, "Hi there");
        assert_eq!(endpoint.sent_messages(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn absent_reply_text_maps_to_interrupted() {
        let (manager, _endpoint) = configured_manager(MockBehavior::NoText);

        assert_eq!(manager.send_message("hello").await, INTERRUPTED_REPLY);
    }

    #[tokio::test]
    async fn empty_reply_text_maps_to_interrupted() {
        let (manager, _endpoint) = configured_manager(MockBehavior::Reply(""));

        let error = manager.try_send("hello").await.unwrap_err();
        assert!(matches!(error, ExchangeError::EmptyReply { .. }));
        assert_eq!(manager.send_message("hello").await, INTERRUPTED_REPLY);
    }

    #[tokio::test]
    async fn send_failure_resolves_to_signal_lost() {
        let (manager, endpoint) = configured_manager(MockBehavior::FailSend);

        assert_eq!(manager.send_message("hello").await, SIGNAL_LOST_REPLY);
        assert_eq!(endpoint.sends.load(Ordering::SeqCst), 1);
        // The session itself was created fine and stays cached.
        assert!(manager.has_session().await);
    }

    #[tokio::test]
    async fn session_is_created_once_and_reused() {
        let (manager, endpoint) = configured_manager(MockBehavior::Reply("pong"));

        assert_eq!(manager.send_message("first").await, "pong");
        assert_eq!(manager.send_message("second").await, "pong");

        assert_eq!(endpoint.sessions_created.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.sends.load(Ordering::SeqCst), 2);
        assert_eq!(
            endpoint.sent_messages(),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(
            manager.model_id().await.as_deref(),
            Some(agix_llm::DEFAULT_GEMINI_MODEL)
        );
    }

    #[tokio::test]
    async fn failed_creation_is_not_cached() {
        let (manager, endpoint) = configured_manager(MockBehavior::FailCreate);

        assert_eq!(manager.send_message("first").await, SIGNAL_LOST_REPLY);
        assert_eq!(manager.send_message("second").await, SIGNAL_LOST_REPLY);

        assert!(!manager.has_session().await);
        assert_eq!(endpoint.factory_calls.load(Ordering::SeqCst), 2);
        assert_eq!(endpoint.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_is_created_once_credential_appears() {
        let (manager, endpoint) = unconfigured_manager(MockBehavior::Reply("online"));

        assert_eq!(manager.send_message("anyone?").await, OFFLINE_REPLY);

        manager
            .settings
            .update(AppSettings::default().with_api_key("late-key"))
            .expect("in-memory update cannot fail");

        assert_eq!(manager.send_message("anyone?").await, "online");
        assert_eq!(endpoint.sessions_created.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.last_api_key().as_deref(), Some("late-key"));
    }

    #[tokio::test]
    async fn session_is_bound_to_persona_instruction() {
        let (manager, endpoint) = configured_manager(MockBehavior::Reply("ok"));

        manager.send_message("hello").await;

        let request = endpoint.last_request().expect("session was requested");
        assert_eq!(request.system_instruction, crate::persona::SYSTEM_INSTRUCTION);
        assert_eq!(request.model_id, agix_llm::DEFAULT_GEMINI_MODEL);
    }

    #[tokio::test]
    async fn concurrent_sends_are_serialized_on_one_session() {
        let (manager, endpoint) = configured_manager(MockBehavior::Reply("ok"));
        let manager = Arc::new(manager);

        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.send_message("a").await }
        });
        let second = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.send_message("b").await }
        });

        assert_eq!(first.await.unwrap(), "ok");
        assert_eq!(second.await.unwrap(), "ok");
        assert_eq!(endpoint.sessions_created.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.max_concurrent_sends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_error_kind_has_a_distinct_fallback() {
        let offline = ExchangeError::ConfigurationMissing { stage: "test" };
        let empty = ExchangeError::EmptyReply { stage: "test" };
        let lost = ExchangeError::TransportFailure {
            stage: "test",
            source: ProviderError::Remote {
                stage: "test",
                message: "quota exceeded".to_string(),
            },
        };

        assert_eq!(offline.fallback_text(), OFFLINE_REPLY);
        assert_eq!(empty.fallback_text(), INTERRUPTED_REPLY);
        assert_eq!(lost.fallback_text(), SIGNAL_LOST_REPLY);
    }
}
