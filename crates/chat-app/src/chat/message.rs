/// Identifier of one mounted widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

impl WidgetId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Stable identifier for one transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one submit/reply exchange.
///
/// This changes on every submit so stale resolutions can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Routing key of an in-flight exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeTarget {
    pub widget_id: WidgetId,
    pub exchange_id: ExchangeId,
}

impl ExchangeTarget {
    pub const fn new(widget_id: WidgetId, exchange_id: ExchangeId) -> Self {
        Self {
            widget_id,
            exchange_id,
        }
    }
}

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    id: TurnId,
    role: Role,
    text: String,
}

impl ChatTurn {
    pub fn new(id: TurnId, role: Role, text: impl Into<String>) -> Self {
        let text = text.into();
        debug_assert!(!text.trim().is_empty(), "chat turns must carry text");
        Self { id, role, text }
    }

    pub fn user(id: TurnId, text: impl Into<String>) -> Self {
        Self::new(id, Role::User, text)
    }

    pub fn model(id: TurnId, text: impl Into<String>) -> Self {
        Self::new(id, Role::Model, text)
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only turn sequence, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// Creates a transcript holding only the model greeting.
    pub fn seeded(greeting: ChatTurn) -> Self {
        Self {
            turns: vec![greeting],
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub(crate) fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }
}

/// Exchange lifecycle of one widget.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Awaiting(ExchangeTarget),
    Resolved(ExchangeTarget),
}

/// State transition input for the exchange lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeTransition {
    Start(ExchangeTarget),
    Resolve(ExchangeTarget),
}

/// Rejection reason for illegal exchange transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeTransitionRejection {
    AlreadyAwaiting {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
    NoActiveExchange,
    TargetMismatch {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
}

pub type ExchangeTransitionResult = Result<ExchangeState, ExchangeTransitionRejection>;

impl ExchangeState {
    /// Returns the awaited target if and only if state is `Awaiting`.
    pub fn active_target(&self) -> Option<ExchangeTarget> {
        match self {
            Self::Awaiting(target) => Some(*target),
            Self::Idle | Self::Resolved(_) => None,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.active_target().is_some()
    }

    /// Applies one transition deterministically.
    ///
    /// A new exchange may start only when nothing is awaited, and a
    /// resolution must match the awaited target exactly.
    pub fn apply(&self, transition: ExchangeTransition) -> ExchangeTransitionResult {
        match transition {
            ExchangeTransition::Start(target) => self.apply_start(target),
            ExchangeTransition::Resolve(target) => self.apply_resolve(target),
        }
    }

    fn apply_start(&self, target: ExchangeTarget) -> ExchangeTransitionResult {
        match self {
            Self::Awaiting(active) => Err(ExchangeTransitionRejection::AlreadyAwaiting {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Resolved(_) => Ok(Self::Awaiting(target)),
        }
    }

    fn apply_resolve(&self, target: ExchangeTarget) -> ExchangeTransitionResult {
        match self {
            Self::Awaiting(active) if *active == target => Ok(Self::Resolved(target)),
            Self::Awaiting(active) => Err(ExchangeTransitionRejection::TargetMismatch {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Resolved(_) => Err(ExchangeTransitionRejection::NoActiveExchange),
        }
    }
}
