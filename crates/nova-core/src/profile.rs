//! Identity documents: who the user is and which mode the assistant starts in.
//!
//! Both are host-authored JSON. Fields this crate does not model are kept in
//! `extra` and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::emotion::Mood;
use crate::error::{CoreError, Result};
use crate::persona::PersonaId;
use crate::time::iso8601;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEmotionalState {
    #[serde(default)]
    pub current_mood: Option<Mood>,
    /// ISO-8601 time of the last recorded mood.
    #[serde(default)]
    pub last_emotional_shift: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub emotional_state: UserEmotionalState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `identity/userProfile.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: UserInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: UserProfile = serde_json::from_str(json)?;
        if profile.user.name.trim().is_empty() {
            return Err(CoreError::InvalidDocument("user name is empty".to_string()));
        }
        Ok(profile)
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }

    pub fn current_mood(&self) -> Option<Mood> {
        self.user.emotional_state.current_mood
    }

    /// Record the latest detected mood and stamp the shift time.
    pub fn record_mood(&mut self, mood: Mood, now: u64) {
        let state = &mut self.user.emotional_state;
        state.current_mood = Some(mood);
        state.last_emotional_shift = Some(iso8601(now));
    }
}

/// `identity/assistantPersona.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantProfile {
    #[serde(default)]
    pub current_mode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssistantProfile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configured starting persona, if it names a known one.
    pub fn starting_persona(&self) -> Option<PersonaId> {
        self.current_mode.as_deref()?.trim().to_lowercase().parse().ok()
    }
}
