//! Personas: the id set, the switch policy, and the typed persona document.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalContext, Mood};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    #[default]
    Guide,
    Coach,
    Gremlin,
    Soft,
}

impl PersonaId {
    /// Listing order for hosts.
    pub const ALL: [PersonaId; 4] = [
        PersonaId::Guide,
        PersonaId::Coach,
        PersonaId::Gremlin,
        PersonaId::Soft,
    ];

    /// Order in which explicit switch commands are honoured.
    const COMMAND_PRIORITY: [PersonaId; 4] = [
        PersonaId::Gremlin,
        PersonaId::Guide,
        PersonaId::Coach,
        PersonaId::Soft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::Guide => "guide",
            PersonaId::Coach => "coach",
            PersonaId::Gremlin => "gremlin",
            PersonaId::Soft => "soft",
        }
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        PersonaId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::InvalidDocument(format!("unknown persona: {s}")))
    }
}

static SWITCH_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"switch to (gremlin|guide|coach|soft)|(gremlin|guide|coach|soft) mode").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSwitch {
    pub persona: PersonaId,
    pub reason: String,
}

/// Persona change requested by this turn, if any. Explicit commands take
/// precedence over the automatic emotional rules.
pub fn detect_persona_switch(text: &str, context: &EmotionalContext) -> Option<PersonaSwitch> {
    let lower = text.to_lowercase();

    let requested: Vec<&str> = SWITCH_COMMAND
        .captures_iter(&lower)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str())
        .collect();
    if let Some(persona) = PersonaId::COMMAND_PRIORITY
        .into_iter()
        .find(|p| requested.contains(&p.as_str()))
    {
        return Some(PersonaSwitch {
            persona,
            reason: format!("User requested {persona} mode"),
        });
    }

    match context.mood {
        Mood::Overwhelm if context.intensity > 0.7 => Some(PersonaSwitch {
            persona: PersonaId::Soft,
            reason: "High overwhelm detected".to_string(),
        }),
        Mood::Flow if context.intensity > 0.8 => Some(PersonaSwitch {
            persona: PersonaId::Guide,
            reason: "Flow state detected".to_string(),
        }),
        _ => None,
    }
}

/// A persona definition as stored under `modes/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDocument {
    pub name: String,
    pub system_prompt: String,
    #[serde(default)]
    pub response_style: Option<String>,
}

impl PersonaDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: PersonaDocument = serde_json::from_str(json)?;
        if doc.name.trim().is_empty() {
            return Err(CoreError::InvalidDocument("persona name is empty".to_string()));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral() -> EmotionalContext {
        EmotionalContext::default()
    }

    #[test]
    fn test_explicit_commands() {
        let s = detect_persona_switch("Switch to coach please", &neutral()).unwrap();
        assert_eq!(s.persona, PersonaId::Coach);
        assert_eq!(s.reason, "User requested coach mode");
        let s = detect_persona_switch("soft mode", &neutral()).unwrap();
        assert_eq!(s.persona, PersonaId::Soft);
    }

    #[test]
    fn test_command_priority_ignores_text_order() {
        let s = detect_persona_switch("switch to soft, no wait, gremlin mode", &neutral()).unwrap();
        assert_eq!(s.persona, PersonaId::Gremlin);
    }

    #[test]
    fn test_explicit_beats_automatic() {
        let ctx = EmotionalContext::new(Mood::Overwhelm, 0.9);
        let s = detect_persona_switch("gremlin mode", &ctx).unwrap();
        assert_eq!(s.persona, PersonaId::Gremlin);
    }

    #[test]
    fn test_automatic_rules() {
        let ctx = EmotionalContext::new(Mood::Overwhelm, 0.8);
        assert_eq!(detect_persona_switch("x", &ctx).unwrap().persona, PersonaId::Soft);
        let ctx = EmotionalContext::new(Mood::Flow, 0.9);
        assert_eq!(detect_persona_switch("x", &ctx).unwrap().persona, PersonaId::Guide);
        let ctx = EmotionalContext::new(Mood::Flow, 0.8);
        assert!(detect_persona_switch("x", &ctx).is_none());
        let ctx = EmotionalContext::new(Mood::Overwhelm, 0.7);
        assert!(detect_persona_switch("x", &ctx).is_none());
    }

    #[test]
    fn test_persona_id_round_trip_names() {
        for p in PersonaId::ALL {
            assert_eq!(p.as_str().parse::<PersonaId>().unwrap(), p);
        }
        assert!("pirate".parse::<PersonaId>().is_err());
        assert_eq!(PersonaId::default(), PersonaId::Guide);
    }

    #[test]
    fn test_document_loader() {
        let doc = PersonaDocument::from_json(
            r#"{"name":"Guide","system_prompt":"You are a calm guide.","tone":"warm"}"#,
        )
        .unwrap();
        assert_eq!(doc.name, "Guide");
        assert_eq!(doc.response_style, None);

        assert!(matches!(
            PersonaDocument::from_json(r#"{"name":" ","system_prompt":"x"}"#),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            PersonaDocument::from_json(r#"{"name":"Guide"}"#),
            Err(CoreError::InvalidDocument(_))
        ));
    }
}
