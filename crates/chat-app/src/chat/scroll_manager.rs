/// Tracks when the transcript view should jump to its newest turn.
///
/// Hosts consume requests with `take_pending_scroll`.
#[derive(Debug, Clone, Default)]
pub struct ScrollManager {
    pending_scroll_to_bottom: bool,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
    }

    /// Returns whether a scroll was requested since the last call.
    pub fn take_pending_scroll(&mut self) -> bool {
        std::mem::take(&mut self.pending_scroll_to_bottom)
    }
}
