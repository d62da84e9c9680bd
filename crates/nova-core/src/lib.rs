//! Nova contextual orchestration core.
//!
//! Emotional context analysis, semantic memory ranking, agent routing,
//! the desire ledger, the self-state tracker, persona and ritual policy,
//! identity profiles and prompt composition.
//!
//! Zero I/O. Time enters as unix milliseconds supplied by the caller and
//! embedding vectors are computed elsewhere.

pub mod desire;
pub mod emotion;
pub mod error;
pub mod fallback;
pub mod interaction;
pub mod memory;
pub mod persona;
pub mod profile;
pub mod prompt;
pub mod ritual;
pub mod router;
pub mod self_state;
pub mod time;

pub use desire::{
    Condition, DEFAULT_PRIORITY, Desire, DesireChange, DesireInfluence, DesireLedger,
    DesireSummary, default_desires,
};
pub use emotion::{
    EmotionalContext, EmotionalLog, EmotionalSample, EmotionalSummary, Mood, analyze,
    classify_intensity,
};
pub use error::{CoreError, Result};
pub use fallback::{FALLBACK_RESPONSES, fallback_response};
pub use interaction::{Interaction, InteractionContext, UserReaction};
pub use memory::{MemoryBank, MemoryRecord, RetentionPolicy, ScoredRecord, cosine_similarity};
pub use persona::{PersonaDocument, PersonaId, PersonaSwitch, detect_persona_switch};
pub use profile::{AssistantProfile, UserProfile};
pub use prompt::PromptContext;
pub use ritual::{
    DEFAULT_STEP_PAUSE_MS, RitualDocument, RitualEffect, RitualKind, RitualStep, RitualTrigger,
    detect_ritual_trigger,
};
pub use router::{AgentProfile, AgentRouter, AgentScore, RoutingDecision, TaskType};
pub use self_state::{SelfModel, SelfModelSnapshot, SelfState, SelfStateView, ToneSuggestion};
pub use time::now_unix_millis;
