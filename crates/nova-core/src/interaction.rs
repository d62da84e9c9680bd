//! The per-turn signal fed to the desire ledger and the self-state tracker.

use serde::{Deserialize, Serialize};

/// How the user reacted to the previous response, when the host knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserReaction {
    Positive,
    Negative,
    Helpful,
    Confused,
}

impl UserReaction {
    pub fn is_favourable(self) -> bool {
        matches!(self, UserReaction::Positive | UserReaction::Helpful)
    }

    pub fn is_unfavourable(self) -> bool {
        matches!(self, UserReaction::Negative | UserReaction::Confused)
    }
}

/// Session-lifecycle flags and timings supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionContext {
    pub session_ending: bool,
    pub browser_closing: bool,
    pub inactive: bool,
    pub session_starting: bool,
    pub active_use: bool,
    pub user_thinking: bool,
    pub interrupted: bool,
    pub action_taken: bool,
    pub error: bool,
    pub processing_time_ms: Option<u64>,
    pub response_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub input: String,
    pub response: String,
    #[serde(default)]
    pub user_reaction: Option<UserReaction>,
    #[serde(default)]
    pub context: InteractionContext,
}

impl Interaction {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
            ..Self::default()
        }
    }

    pub fn with_reaction(mut self, reaction: UserReaction) -> Self {
        self.user_reaction = Some(reaction);
        self
    }

    pub fn with_context(mut self, context: InteractionContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn reaction_is(&self, reaction: UserReaction) -> bool {
        self.user_reaction == Some(reaction)
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
