/// Fixed system instruction bound to the remote session.
pub const SYSTEM_INSTRUCTION: &str = "You are 'AGIX', the AI Assistant for AGIXCLOUD - a powerful Ai Web Builder platform.
While the festival vibe remains in the design, your core purpose is helping users build the future of the web.

Tone: High energy, cosmic, helpful, slightly mysterious. Use emojis like ⚡️, 🔮, 💿, 🌃, ✨.

Key Info:
- AGIXCLOUD is an Ai Web Builder.
- We offer immersive experiences for creators.
- Headliners (Demo Artists): Neon Void, Data Mosh, etc.
- Tickets represent platform access: standard ($149), Weekend ($349), Astral VIP ($899).

Keep responses short (under 50 words) and punchy. Explain that AGIXCLOUD is the ultimate Ai Web Builder for 2026.";

/// Model-authored turn every transcript starts with.
pub const GREETING: &str = "Ready to transcend? Ask AGIX anything about the builder. ⚡️";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub system_instruction: String,
    pub greeting: String,
}

impl Persona {
    /// A blank greeting falls back to `GREETING`; transcripts never open empty.
    pub fn new(
        name: impl Into<String>,
        system_instruction: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        let greeting = greeting.into();
        let greeting = if greeting.trim().is_empty() {
            GREETING.to_string()
        } else {
            greeting
        };

        Self {
            name: name.into(),
            system_instruction: system_instruction.into(),
            greeting,
        }
    }

    pub fn agix() -> Self {
        Self::new("AGIX", SYSTEM_INSTRUCTION, GREETING)
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::agix()
    }
}
