//! Rituals: trigger policy and the typed ritual document.
//!
//! A ritual is an ordered list of steps. Each step is one effect followed by
//! a pause; the pause defaults to [`DEFAULT_STEP_PAUSE_MS`] when the step
//! does not declare a `duration`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalContext, Mood, contains_any};
use crate::error::{CoreError, Result};

pub const DEFAULT_STEP_PAUSE_MS: u64 = 2000;

const COMPLETION_WORDS: &[&str] = &["done", "finished", "completed"];
const FOCUS_WORDS: &[&str] = &["start", "begin", "focus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RitualKind {
    FocusStart,
    Victory,
    Grounding,
    Burnout,
}

impl RitualKind {
    pub const ALL: [RitualKind; 4] = [
        RitualKind::FocusStart,
        RitualKind::Victory,
        RitualKind::Grounding,
        RitualKind::Burnout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RitualKind::FocusStart => "focus_start",
            RitualKind::Victory => "victory",
            RitualKind::Grounding => "grounding",
            RitualKind::Burnout => "burnout",
        }
    }
}

impl fmt::Display for RitualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RitualKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        RitualKind::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::InvalidDocument(format!("unknown ritual: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualTrigger {
    pub ritual: RitualKind,
    pub reason: String,
}

/// First matching rule wins: completion, focus, frustration, overwhelm.
pub fn detect_ritual_trigger(text: &str, context: &EmotionalContext) -> Option<RitualTrigger> {
    let lower = text.to_lowercase();
    let (ritual, reason) = if contains_any(&lower, COMPLETION_WORDS) {
        (RitualKind::Victory, "Task completion detected")
    } else if contains_any(&lower, FOCUS_WORDS) {
        (RitualKind::FocusStart, "Focus session detected")
    } else if context.mood == Mood::Frustration && context.intensity > 0.6 {
        (RitualKind::Grounding, "High frustration detected")
    } else if context.mood == Mood::Overwhelm && context.intensity > 0.7 {
        (RitualKind::Burnout, "High overwhelm detected")
    } else {
        return None;
    };
    Some(RitualTrigger {
        ritual,
        reason: reason.to_string(),
    })
}

/// What a ritual step asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RitualEffect {
    VoiceMessage {
        #[serde(default)]
        content: Option<String>,
    },
    VisualEffect {
        #[serde(default, alias = "visual")]
        content: Option<String>,
    },
    SystemEffect {
        #[serde(default, alias = "audio")]
        content: Option<String>,
    },
}

impl RitualEffect {
    pub fn action(&self) -> &'static str {
        match self {
            RitualEffect::VoiceMessage { .. } => "voice_message",
            RitualEffect::VisualEffect { .. } => "visual_effect",
            RitualEffect::SystemEffect { .. } => "system_effect",
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            RitualEffect::VoiceMessage { content }
            | RitualEffect::VisualEffect { content }
            | RitualEffect::SystemEffect { content } => content.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualStep {
    #[serde(flatten)]
    pub effect: RitualEffect,
    /// Pause after the step, in milliseconds.
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RitualStep {
    pub fn pause(&self, default: Duration) -> Duration {
        self.duration_ms.map(Duration::from_millis).unwrap_or(default)
    }
}

/// A ritual definition as stored under `rituals/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualDocument {
    pub name: String,
    #[serde(default)]
    pub sequence: Vec<RitualStep>,
}

impl RitualDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: RitualDocument = serde_json::from_str(json)?;
        if doc.name.trim().is_empty() {
            return Err(CoreError::InvalidDocument("ritual name is empty".to_string()));
        }
        Ok(doc)
    }

    /// Sum of all step pauses.
    pub fn total_pause(&self, default: Duration) -> Duration {
        self.sequence.iter().map(|s| s.pause(default)).sum()
    }
}
