/// Event contracts between the widget and the session manager.
pub mod events;
/// Domain entities and deterministic exchange state boundaries.
pub mod message;
pub mod scroll_manager;
pub mod widget;

pub use events::{ExchangeResolved, Submit};
pub use message::{
    ChatTurn, ExchangeId, ExchangeState, ExchangeTarget, ExchangeTransition,
    ExchangeTransitionRejection, ExchangeTransitionResult, Role, Transcript, TurnId, WidgetId,
};
pub use scroll_manager::ScrollManager;
pub use widget::{ChatWidget, ChatWidgetHandle, HEADER_TITLE, INPUT_PLACEHOLDER};
