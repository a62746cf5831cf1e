use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agix_llm::{
    BoxFuture, ChatReply, ChatSession, LlmProvider, Model, ProviderConfig, ProviderError,
    ProviderResult, SessionRequest, default_gemini_models,
};
use tokio::sync::Notify;

use super::{ProviderFactory, SessionManager};
use crate::persona::Persona;
use crate::settings::{AppSettings, SettingsStore};

#[derive(Debug, Clone, Copy)]
pub(crate) enum MockBehavior {
    Reply(&'static str),
    NoText,
    FailSend,
    FailCreate,
}

/// Counters shared between the endpoint double and the sessions it creates.
pub(crate) struct MockEndpoint {
    behavior: MockBehavior,
    gate: Option<Arc<Notify>>,
    pub factory_calls: AtomicUsize,
    pub sessions_created: AtomicUsize,
    pub sends: AtomicUsize,
    pub max_concurrent_sends: AtomicUsize,
    in_flight: AtomicUsize,
    messages: Mutex<Vec<String>>,
    api_keys: Mutex<Vec<String>>,
    requests: Mutex<Vec<SessionRequest>>,
}

impl MockEndpoint {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Self::build(behavior, None)
    }

    /// Every send waits for one notification on `gate` before replying.
    pub fn gated(behavior: MockBehavior, gate: Arc<Notify>) -> Arc<Self> {
        Self::build(behavior, Some(gate))
    }

    fn build(behavior: MockBehavior, gate: Option<Arc<Notify>>) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            gate,
            factory_calls: AtomicUsize::new(0),
            sessions_created: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
            max_concurrent_sends: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            api_keys: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn factory(self: &Arc<Self>) -> ProviderFactory {
        let endpoint = Arc::clone(self);
        Arc::new(move |config: ProviderConfig| -> ProviderResult<Arc<dyn LlmProvider>> {
            endpoint.factory_calls.fetch_add(1, Ordering::SeqCst);
            endpoint.api_keys.lock().unwrap().push(config.api_key);
            Ok(Arc::new(MockProvider {
                endpoint: Arc::clone(&endpoint),
                models: default_gemini_models(),
            }))
        })
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.api_keys.lock().unwrap().last().cloned()
    }

    pub fn last_request(&self) -> Option<SessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

struct MockProvider {
    endpoint: Arc<MockEndpoint>,
    models: Vec<Model>,
}

impl LlmProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Endpoint"
    }

    fn default_model(&self) -> &str {
        agix_llm::DEFAULT_GEMINI_MODEL
    }

    fn models(&self) -> &[Model] {
        &self.models
    }

    fn create_session<'a>(
        &'a self,
        request: SessionRequest,
    ) -> BoxFuture<'a, ProviderResult<Box<dyn ChatSession>>> {
        Box::pin(async move {
            if matches!(self.endpoint.behavior, MockBehavior::FailCreate) {
                return Err(ProviderError::Remote {
                    stage: "mock-create-session",
                    message: "endpoint unavailable".to_string(),
                });
            }

            self.endpoint.sessions_created.fetch_add(1, Ordering::SeqCst);
            self.endpoint.requests.lock().unwrap().push(request.clone());
            Ok(Box::new(MockSession {
                endpoint: Arc::clone(&self.endpoint),
                model_id: request.model_id,
            }) as Box<dyn ChatSession>)
        })
    }
}

struct MockSession {
    endpoint: Arc<MockEndpoint>,
    model_id: String,
}

impl MockSession {
    async fn reply(&mut self, message: &str) -> ProviderResult<ChatReply> {
        let endpoint = &self.endpoint;
        endpoint.sends.fetch_add(1, Ordering::SeqCst);
        let in_flight = endpoint.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        endpoint
            .max_concurrent_sends
            .fetch_max(in_flight, Ordering::SeqCst);
        endpoint.messages.lock().unwrap().push(message.to_string());

        if let Some(gate) = &endpoint.gate {
            gate.notified().await;
        } else {
            tokio::task::yield_now().await;
        }

        endpoint.in_flight.fetch_sub(1, Ordering::SeqCst);
        match endpoint.behavior {
            MockBehavior::Reply(text) => Ok(ChatReply::text(text)),
            MockBehavior::NoText => Ok(ChatReply::empty()),
            MockBehavior::FailSend | MockBehavior::FailCreate => Err(ProviderError::Remote {
                stage: "mock-send",
                message: "quota exceeded".to_string(),
            }),
        }
    }
}

impl ChatSession for MockSession {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn send<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, ProviderResult<ChatReply>> {
        Box::pin(self.reply(message))
    }
}

pub(crate) fn manager_with(
    settings: AppSettings,
    endpoint: &Arc<MockEndpoint>,
) -> SessionManager {
    SessionManager::with_factory(
        Arc::new(SettingsStore::in_memory(settings)),
        Persona::agix(),
        endpoint.factory(),
    )
}

pub(crate) fn configured_manager(behavior: MockBehavior) -> (SessionManager, Arc<MockEndpoint>) {
    let endpoint = MockEndpoint::new(behavior);
    let manager = manager_with(AppSettings::default().with_api_key("test-key"), &endpoint);
    (manager, endpoint)
}

pub(crate) fn unconfigured_manager(behavior: MockBehavior) -> (SessionManager, Arc<MockEndpoint>) {
    let endpoint = MockEndpoint::new(behavior);
    let manager = manager_with(AppSettings::default(), &endpoint);
    (manager, endpoint)
}
