use crate::chat::message::{ExchangeTarget, ExchangeTransition};
use crate::session::SessionManager;

/// Emitted when the widget accepts a submission and the user turn is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub target: ExchangeTarget,
    pub content: String,
}

/// Display-ready reply for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResolved {
    pub target: ExchangeTarget,
    pub text: String,
}

impl Submit {
    pub fn new(target: ExchangeTarget, content: impl Into<String>) -> Self {
        Self {
            target,
            content: content.into(),
        }
    }

    /// Returns the transition that marks the exchange as awaited.
    pub fn start_transition(&self) -> ExchangeTransition {
        ExchangeTransition::Start(self.target)
    }

    /// Runs the remote call. Never fails: every outcome is reply text.
    pub async fn resolve(self, sessions: &SessionManager) -> ExchangeResolved {
        let text = sessions.send_message(&self.content).await;
        ExchangeResolved::new(self.target, text)
    }
}

impl ExchangeResolved {
    pub fn new(target: ExchangeTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            text: text.into(),
        }
    }

    pub fn transition(&self) -> ExchangeTransition {
        ExchangeTransition::Resolve(self.target)
    }
}
