#![deny(unsafe_code)]

/// AGIX chat assistant.
///
/// The crate owns the single remote conversation used by the promotional site
/// and the floating widget state that drives it. Rendering is left to hosts.
pub mod app;
/// Transcript, exchange lifecycle and the widget controller.
pub mod chat;
pub mod persona;
/// Lazily created remote session and the fallback replies.
pub mod session;
/// Settings and credential resolution.
pub mod settings;
