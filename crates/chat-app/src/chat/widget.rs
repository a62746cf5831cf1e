use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::chat::events::{ExchangeResolved, Submit};
use crate::chat::message::{
    ChatTurn, ExchangeId, ExchangeState, ExchangeTarget, ExchangeTransition,
    ExchangeTransitionRejection, Transcript, TurnId, WidgetId,
};
use crate::chat::scroll_manager::ScrollManager;
use crate::session::SessionManager;

pub const HEADER_TITLE: &str = "AGIX AI";
pub const INPUT_PLACEHOLDER: &str = "Ask about builders, code...";

/// Floating chat widget state: transcript, input buffer, loading flag and
/// visibility.
///
/// At most one exchange is in flight per widget. While it is, `can_submit`
/// is false and further submissions are ignored, so the transcript always
/// alternates user and model turns after the greeting.
pub struct ChatWidget {
    id: WidgetId,
    sessions: Arc<SessionManager>,
    transcript: Transcript,
    input: String,
    exchange_state: ExchangeState,
    open: bool,
    scroll: ScrollManager,
    next_turn_id: u64,
    next_exchange_id: u64,
}

impl ChatWidget {
    pub fn new(id: WidgetId, sessions: Arc<SessionManager>) -> Self {
        let greeting = ChatTurn::model(TurnId::new(1), sessions.persona().greeting.clone());

        Self {
            id,
            sessions,
            transcript: Transcript::seeded(greeting),
            input: String::new(),
            exchange_state: ExchangeState::Idle,
            open: false,
            scroll: ScrollManager::new(),
            next_turn_id: 2,
            next_exchange_id: 1,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turns(&self) -> &[ChatTurn] {
        self.transcript.turns()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// True while an exchange awaits its reply; hosts show a typing indicator.
    pub fn is_loading(&self) -> bool {
        self.exchange_state.is_awaiting()
    }

    /// Whether the send affordance is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        if !self.open {
            self.open = true;
            self.scroll.request_scroll_to_bottom();
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Returns whether the view should jump to its newest turn.
    pub fn take_scroll_request(&mut self) -> bool {
        self.scroll.take_pending_scroll()
    }

    /// Accepts the current input as a user turn and marks the widget loading.
    ///
    /// Returns `None` for blank input or while another exchange is in flight.
    /// The returned `Submit` must be resolved and fed back through
    /// `complete_exchange`.
    pub fn begin_submit(&mut self) -> Option<Submit> {
        if let Some(active) = self.exchange_state.active_target() {
            tracing::debug!(
                widget_id = self.id.0,
                active_exchange = active.exchange_id.0,
                "ignoring submit while an exchange is in flight"
            );
            return None;
        }

        let content = self.input.trim().to_string();
        if content.is_empty() {
            return None;
        }

        let target = ExchangeTarget::new(self.id, self.alloc_exchange_id());
        let submit = Submit::new(target, content);
        if let Err(rejection) = self.apply_transition(submit.start_transition()) {
            tracing::warn!(?rejection, "exchange could not start");
            return None;
        }

        let turn_id = self.alloc_turn_id();
        self.transcript.push(ChatTurn::user(turn_id, submit.content.clone()));
        self.input.clear();
        self.scroll.request_scroll_to_bottom();

        Some(submit)
    }

    /// Appends the model turn for the awaited exchange and clears loading.
    ///
    /// Resolutions for another widget or a stale exchange are discarded.
    pub fn complete_exchange(&mut self, resolved: ExchangeResolved) -> bool {
        if resolved.target.widget_id != self.id {
            tracing::warn!(
                widget_id = self.id.0,
                target_widget_id = resolved.target.widget_id.0,
                "discarding resolution addressed to another widget"
            );
            return false;
        }

        if let Err(rejection) = self.apply_transition(resolved.transition()) {
            tracing::warn!(?rejection, "discarding stale exchange resolution");
            return false;
        }

        let turn_id = self.alloc_turn_id();
        self.transcript.push(ChatTurn::model(turn_id, resolved.text));
        self.scroll.request_scroll_to_bottom();
        true
    }

    /// Runs one full exchange inline. Returns whether anything was submitted.
    pub async fn submit(&mut self) -> bool {
        let Some(submit) = self.begin_submit() else {
            return false;
        };

        let sessions = Arc::clone(&self.sessions);
        let resolved = submit.resolve(&sessions).await;
        self.complete_exchange(resolved)
    }

    fn apply_transition(
        &mut self,
        transition: ExchangeTransition,
    ) -> Result<(), ExchangeTransitionRejection> {
        self.exchange_state = self.exchange_state.apply(transition)?;
        Ok(())
    }

    fn alloc_turn_id(&mut self) -> TurnId {
        let id = TurnId::new(self.next_turn_id);
        self.next_turn_id = self.next_turn_id.saturating_add(1);
        id
    }

    fn alloc_exchange_id(&mut self) -> ExchangeId {
        let id = ExchangeId::new(self.next_exchange_id);
        self.next_exchange_id = self.next_exchange_id.saturating_add(1);
        id
    }
}

/// Shared handle for hosts that keep reading input while a reply is pending.
#[derive(Clone)]
pub struct ChatWidgetHandle {
    inner: Arc<Mutex<ChatWidget>>,
}

impl ChatWidgetHandle {
    pub fn new(widget: ChatWidget) -> Self {
        Self {
            inner: Arc::new(Mutex::new(widget)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ChatWidget> {
        self.inner.lock().await
    }

    /// Starts an exchange and resolves it on a background task.
    ///
    /// The task only holds a weak reference, so a widget torn down before the
    /// reply arrives is left alone. Closing the widget does not cancel the
    /// call; the reply still lands in the hidden transcript.
    pub async fn submit(&self) -> Option<JoinHandle<bool>> {
        let (submit, sessions) = {
            let mut widget = self.inner.lock().await;
            let submit = widget.begin_submit()?;
            (submit, Arc::clone(&widget.sessions))
        };

        let widget = Arc::downgrade(&self.inner);
        Some(tokio::spawn(Self::resolve_exchange(widget, submit, sessions)))
    }

    async fn resolve_exchange(
        widget: Weak<Mutex<ChatWidget>>,
        submit: Submit,
        sessions: Arc<SessionManager>,
    ) -> bool {
        let target = submit.target;
        let resolved = submit.resolve(&sessions).await;

        let Some(widget) = widget.upgrade() else {
            tracing::debug!(
                widget_id = target.widget_id.0,
                exchange_id = target.exchange_id.0,
                "widget dropped before its exchange resolved"
            );
            return false;
        };

        let mut widget = widget.lock().await;
        widget.complete_exchange(resolved)
    }
}
