use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::chat::{ChatWidget, ChatWidgetHandle, WidgetId};
use crate::persona::Persona;
use crate::session::SessionManager;
use crate::settings::SettingsStore;

/// Process-scoped context handed to whatever mounts chat widgets.
///
/// Owns the settings and the one `SessionManager`, so every widget mounted
/// from the same context shares one remote conversation.
pub struct AppContext {
    settings: Arc<SettingsStore>,
    sessions: Arc<SessionManager>,
    next_widget_id: AtomicU64,
}

impl AppContext {
    pub fn new(settings: SettingsStore) -> Self {
        let settings = Arc::new(settings);
        let sessions = Arc::new(SessionManager::new(Arc::clone(&settings), Persona::agix()));
        Self::with_sessions(settings, sessions)
    }

    pub fn with_sessions(settings: Arc<SettingsStore>, sessions: Arc<SessionManager>) -> Self {
        Self {
            settings,
            sessions,
            next_widget_id: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn mount_widget(&self) -> ChatWidgetHandle {
        let id = WidgetId::new(self.next_widget_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(widget_id = id.0, "mounting chat widget");
        ChatWidgetHandle::new(ChatWidget::new(id, Arc::clone(&self.sessions)))
    }
}
