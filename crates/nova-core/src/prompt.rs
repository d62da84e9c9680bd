//! Composition of the augmented system prompt sent with every completion.

use std::fmt::Write;

use crate::desire::Desire;
use crate::emotion::{EmotionalContext, EmotionalSummary};
use crate::memory::ScoredRecord;
use crate::persona::PersonaDocument;
use crate::router::RoutingDecision;
use crate::self_state::ToneSuggestion;

pub const NO_MEMORIES: &str = "No relevant memories found.";

/// Everything the prompt is built from. Borrowed for one turn.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub persona: &'a PersonaDocument,
    pub emotion: &'a EmotionalContext,
    pub summary: Option<&'a EmotionalSummary>,
    pub memories: &'a [ScoredRecord],
    pub routing: Option<&'a RoutingDecision>,
    pub tone: ToneSuggestion,
    pub desires: &'a [&'a Desire],
}

impl PromptContext<'_> {
    pub fn compose(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{}", self.persona.system_prompt)?;
        writeln!(out)?;

        let patterns = self
            .summary
            .map(|s| s.recent_patterns.iter().map(|m| m.as_str()).collect::<Vec<_>>())
            .filter(|p| !p.is_empty())
            .map(|p| p.join(", "))
            .unwrap_or_else(|| "none".to_string());
        writeln!(out, "EMOTIONAL CONTEXT:")?;
        writeln!(out, "- Current mood: {}", self.emotion.mood)?;
        writeln!(out, "- Intensity: {:.2}", self.emotion.intensity)?;
        writeln!(out, "- Recent patterns: {patterns}")?;
        writeln!(out)?;

        writeln!(out, "MEMORY CONTEXT:")?;
        if self.memories.is_empty() {
            writeln!(out, "{NO_MEMORIES}")?;
        } else {
            writeln!(out, "Recent relevant memories:")?;
            for m in self.memories {
                writeln!(out, "{}: {}", m.record.input_text, m.record.response_text)?;
            }
        }
        writeln!(out)?;

        writeln!(out, "AGENT ROUTING:")?;
        match self.routing {
            Some(r) => {
                writeln!(out, "- Selected agent: {}", r.agent_id)?;
                writeln!(out, "- Reasoning: {}", r.rationale)?;
            }
            None => {
                writeln!(out, "- Selected agent: gpt4")?;
                writeln!(out, "- Reasoning: Default selection")?;
            }
        }
        writeln!(out)?;

        writeln!(out, "INNER STATE:")?;
        writeln!(out, "- Tone: {}", self.tone)?;
        if !self.desires.is_empty() {
            let listed = self
                .desires
                .iter()
                .map(|d| format!("{} ({:.2})", d.text, d.priority_score))
                .collect::<Vec<_>>()
                .join("; ");
            writeln!(out, "- Active desires: {listed}")?;
        }
        writeln!(out)?;

        write!(out, "Remember to respond in the {} persona style.", self.persona.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{Mood, analyze};
    use crate::memory::MemoryRecord;

    fn persona() -> PersonaDocument {
        PersonaDocument {
            name: "Guide".to_string(),
            system_prompt: "You are a calm guide.".to_string(),
            response_style: None,
        }
    }

    #[test]
    fn test_empty_context_sections() {
        let persona = persona();
        let emotion = EmotionalContext::default();
        let prompt = PromptContext {
            persona: &persona,
            emotion: &emotion,
            summary: None,
            memories: &[],
            routing: None,
            tone: ToneSuggestion::Balanced,
            desires: &[],
        }
        .compose();

        assert!(prompt.starts_with("You are a calm guide.\n\nEMOTIONAL CONTEXT:"));
        assert!(prompt.contains("- Current mood: neutral"));
        assert!(prompt.contains("- Intensity: 0.50"));
        assert!(prompt.contains("- Recent patterns: none"));
        assert!(prompt.contains(NO_MEMORIES));
        assert!(prompt.contains("- Reasoning: Default selection"));
        assert!(!prompt.contains("Active desires"));
        assert!(prompt.ends_with("Remember to respond in the Guide persona style."));
    }

    #[test]
    fn test_memories_and_desires_listed() {
        let persona = persona();
        let emotion = analyze("this is broken");
        let record = MemoryRecord::new("how do I fix it", "try restarting", &emotion, None, 0);
        let memories = vec![ScoredRecord {
            record,
            similarity: 0.9,
        }];
        let desire = Desire::new("be_useful", "Be useful", 0.8, 0.05, 0.02, 0);
        let desires = [&desire];
        let summary = EmotionalSummary {
            dominant_mood: Mood::Frustration,
            average_intensity: 0.6,
            recent_patterns: vec![Mood::Frustration, Mood::Neutral],
        };
        let prompt = PromptContext {
            persona: &persona,
            emotion: &emotion,
            summary: Some(&summary),
            memories: &memories,
            routing: None,
            tone: ToneSuggestion::Gentle,
            desires: &desires,
        }
        .compose();

        assert!(prompt.contains("- Current mood: frustration"));
        assert!(prompt.contains("- Recent patterns: frustration, neutral"));
        assert!(prompt.contains("Recent relevant memories:\nhow do I fix it: try restarting"));
        assert!(prompt.contains("- Active desires: Be useful (0.80)"));
    }
}
