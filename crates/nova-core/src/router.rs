//! Agent routing: score a fixed registry of agent profiles against the
//! input and emotional context, pick the best, keep a bounded history.
//!
//! Scoring per profile:
//! - +2 for every profile keyword found in the lower-cased input
//! - +3 / +1 for high / medium emotional awareness when intensity > 0.7
//! - +2 when the task type is technical or creative and the profile lists
//!   that strength (analytical and general never add a bonus)
//!
//! The highest score wins; ties go to the earliest registered profile.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalContext, contains_any};
use crate::error::{CoreError, Result};
use crate::interaction::truncate_chars;

pub const ROUTING_HISTORY_CAP: usize = 50;

const KEYWORD_POINTS: i32 = 2;
const STRENGTH_POINTS: i32 = 2;
const HIGH_AWARENESS_POINTS: i32 = 3;
const MEDIUM_AWARENESS_POINTS: i32 = 1;
const EMOTIONAL_INTENSITY_GATE: f64 = 0.7;
const HISTORY_INPUT_CHARS: usize = 100;
const ALTERNATIVES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalAwareness {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    pub display_name: String,
    pub model: String,
    pub strengths: Vec<String>,
    pub keywords: Vec<String>,
    pub emotional_awareness: EmotionalAwareness,
    pub response_style: String,
}

impl AgentProfile {
    fn new(
        id: &str,
        display_name: &str,
        model: &str,
        strengths: &[&str],
        keywords: &[&str],
        emotional_awareness: EmotionalAwareness,
        response_style: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            model: model.to_string(),
            strengths: strengths.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            emotional_awareness,
            response_style: response_style.to_string(),
        }
    }

    fn has_strength(&self, strength: &str) -> bool {
        self.strengths.iter().any(|s| s == strength)
    }

    /// Score against an already lower-cased input.
    fn score(&self, lower: &str, context: &EmotionalContext, task: TaskType) -> i32 {
        let mut score = self
            .keywords
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .count() as i32
            * KEYWORD_POINTS;

        if context.intensity > EMOTIONAL_INTENSITY_GATE {
            score += match self.emotional_awareness {
                EmotionalAwareness::High => HIGH_AWARENESS_POINTS,
                EmotionalAwareness::Medium => MEDIUM_AWARENESS_POINTS,
                EmotionalAwareness::Low => 0,
            };
        }

        if task.bonus_strength().is_some_and(|s| self.has_strength(s)) {
            score += STRENGTH_POINTS;
        }

        score
    }
}

/// The built-in registry, in tie-breaking order.
pub fn default_registry() -> Vec<AgentProfile> {
    use EmotionalAwareness::*;
    vec![
        AgentProfile::new(
            "claude",
            "Claude",
            "anthropic/claude-3-opus",
            &["analysis", "comprehension", "reasoning", "summarization"],
            &["analyze", "summarize", "explain", "understand", "comprehend", "break down"],
            High,
            "thoughtful",
        ),
        AgentProfile::new(
            "gpt4",
            "GPT-4",
            "gpt-4o",
            &["polish", "explanation", "emotional", "creative", "writing"],
            &["polish", "explain", "emotional", "creative", "write", "compose", "express"],
            Medium,
            "polished",
        ),
        AgentProfile::new(
            "mistral",
            "Mistral",
            "mistralai/mistral-7b-instruct",
            &["logic", "math", "code", "technical", "efficiency"],
            &["logic", "math", "code", "calculate", "solve", "technical", "efficient"],
            Low,
            "direct",
        ),
        AgentProfile::new(
            "gemini",
            "Gemini",
            "google/gemini-pro",
            &["multimodal", "vision", "integration", "synthesis"],
            &["image", "visual", "multimodal", "integrate", "synthesize", "combine"],
            Medium,
            "integrated",
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Technical,
    Creative,
    Analytical,
    General,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Technical => "technical",
            TaskType::Creative => "creative",
            TaskType::Analytical => "analytical",
            TaskType::General => "general",
        }
    }

    fn bonus_strength(self) -> Option<&'static str> {
        match self {
            TaskType::Technical => Some("technical"),
            TaskType::Creative => Some("creative"),
            TaskType::Analytical | TaskType::General => None,
        }
    }
}

const TECHNICAL: &[&str] = &["code", "debug", "error", "technical", "algorithm", "optimize"];
const CREATIVE: &[&str] = &["write", "create", "design", "imagine", "story", "art"];
const ANALYTICAL: &[&str] = &["analyze", "compare", "evaluate", "research", "study"];

/// Coarse task classifier over lower-cased text. Technical is checked first.
pub fn detect_task_type(lower: &str) -> TaskType {
    if contains_any(lower, TECHNICAL) {
        TaskType::Technical
    } else if contains_any(lower, CREATIVE) {
        TaskType::Creative
    } else if contains_any(lower, ANALYTICAL) {
        TaskType::Analytical
    } else {
        TaskType::General
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentScore {
    pub agent_id: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub agent_id: String,
    pub model: String,
    pub task_type: Option<TaskType>,
    pub rationale: String,
    pub alternatives: Vec<AgentScore>,
    /// Full score vector in registry order. Empty for forced routes.
    pub scores: Vec<AgentScore>,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingLogEntry {
    pub timestamp: u64,
    pub input: String,
    pub decision: RoutingDecision,
}

#[derive(Debug, Clone)]
pub struct AgentRouter {
    registry: Vec<AgentProfile>,
    current: usize,
    history: VecDeque<RoutingLogEntry>,
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRouter {
    /// Router over the built-in registry, with `gpt4` selected initially.
    pub fn new() -> Self {
        let registry = default_registry();
        let current = registry.iter().position(|a| a.id == "gpt4").unwrap_or(0);
        Self {
            registry,
            current,
            history: VecDeque::new(),
        }
    }

    /// Router over a custom registry. The first profile starts selected.
    /// Returns `None` for an empty registry.
    pub fn with_registry(registry: Vec<AgentProfile>) -> Option<Self> {
        if registry.is_empty() {
            return None;
        }
        Some(Self {
            registry,
            current: 0,
            history: VecDeque::new(),
        })
    }

    pub fn available_agents(&self) -> &[AgentProfile] {
        &self.registry
    }

    pub fn current_agent(&self) -> &AgentProfile {
        &self.registry[self.current]
    }

    pub fn history(&self) -> impl Iterator<Item = &RoutingLogEntry> {
        self.history.iter()
    }

    /// Score vector in registry order. Pure: does not touch selection state.
    pub fn score_all(&self, text: &str, context: &EmotionalContext) -> Vec<AgentScore> {
        let lower = text.to_lowercase();
        let task = detect_task_type(&lower);
        self.registry
            .iter()
            .map(|a| AgentScore {
                agent_id: a.id.clone(),
                score: a.score(&lower, context, task),
            })
            .collect()
    }

    /// Pick the best agent for `text`, record the decision, and make it current.
    pub fn route(&mut self, text: &str, context: &EmotionalContext, now: u64) -> RoutingDecision {
        let task = detect_task_type(&text.to_lowercase());
        let scores = self.score_all(text, context);

        // First maximum wins, so earlier registry entries take ties.
        let best = scores
            .iter()
            .enumerate()
            .fold(0, |best, (i, s)| if s.score > scores[best].score { i } else { best });

        let agent = &self.registry[best];
        let mut others: Vec<AgentScore> = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best)
            .map(|(_, s)| s.clone())
            .collect();
        others.sort_by(|a, b| b.score.cmp(&a.score));
        others.truncate(ALTERNATIVES);

        let decision = RoutingDecision {
            agent_id: agent.id.clone(),
            model: agent.model.clone(),
            task_type: Some(task),
            rationale: format!(
                "Selected {} for {} task. Strengths: {}. Score: {}",
                agent.display_name,
                task.as_str(),
                agent.strengths.join(", "),
                scores[best].score
            ),
            alternatives: others,
            scores,
            forced: false,
        };

        self.current = best;
        self.log(text, &decision, now);
        decision
    }

    /// Select `id` without scoring. Unknown ids leave the selection untouched.
    pub fn force_agent(&mut self, id: &str) -> Result<RoutingDecision> {
        let idx = self
            .registry
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::UnknownAgent(id.to_string()))?;
        self.current = idx;
        let agent = &self.registry[idx];
        Ok(RoutingDecision {
            agent_id: agent.id.clone(),
            model: agent.model.clone(),
            task_type: None,
            rationale: format!("Forced selection of {}", agent.display_name),
            alternatives: Vec::new(),
            scores: Vec::new(),
            forced: true,
        })
    }

    fn log(&mut self, input: &str, decision: &RoutingDecision, now: u64) {
        self.history.push_back(RoutingLogEntry {
            timestamp: now,
            input: truncate_chars(input, HISTORY_INPUT_CHARS),
            decision: decision.clone(),
        });
        while self.history.len() > ROUTING_HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// Number of logged selections per agent, in registry order.
    pub fn routing_stats(&self) -> Vec<(String, usize)> {
        self.registry
            .iter()
            .map(|a| {
                let n = self
                    .history
                    .iter()
                    .filter(|e| e.decision.agent_id == a.id)
                    .count();
                (a.id.clone(), n)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Mood;

    fn calm() -> EmotionalContext {
        EmotionalContext::new(Mood::Neutral, 0.5)
    }

    fn score_of(decision: &RoutingDecision, id: &str) -> i32 {
        decision.scores.iter().find(|s| s.agent_id == id).unwrap().score
    }

    #[test]
    fn test_task_type_order() {
        assert_eq!(detect_task_type("write code"), TaskType::Technical);
        assert_eq!(detect_task_type("write a story"), TaskType::Creative);
        assert_eq!(detect_task_type("compare these"), TaskType::Analytical);
        assert_eq!(detect_task_type("hello"), TaskType::General);
    }

    #[test]
    fn test_technical_routes_to_mistral() {
        let mut router = AgentRouter::new();
        let d = router.route("Can you debug this code and calculate the result", &calm(), 0);
        assert_eq!(d.agent_id, "mistral");
        // code + calculate keywords (4) + technical strength (2)
        assert_eq!(score_of(&d, "mistral"), 6);
        assert_eq!(router.current_agent().id, "mistral");
    }

    #[test]
    fn test_creative_bonus_goes_to_gpt4() {
        let mut router = AgentRouter::new();
        let d = router.route("write me a story", &calm(), 0);
        assert_eq!(d.agent_id, "gpt4");
        // write keyword (2) + creative strength (2)
        assert_eq!(score_of(&d, "gpt4"), 4);
    }

    #[test]
    fn test_analytical_has_no_strength_bonus() {
        let mut router = AgentRouter::new();
        let d = router.route("please analyze", &calm(), 0);
        assert_eq!(d.task_type, Some(TaskType::Analytical));
        assert_eq!(score_of(&d, "claude"), 2);
    }

    #[test]
    fn test_emotional_intensity_bonus() {
        let router = AgentRouter::new();
        let intense = EmotionalContext::new(Mood::Overwhelm, 0.8);
        let scores = router.score_all("hello", &intense);
        let by_id: Vec<i32> = scores.iter().map(|s| s.score).collect();
        assert_eq!(by_id, vec![3, 1, 0, 1]);
    }

    #[test]
    fn test_intensity_gate_is_strict() {
        let router = AgentRouter::new();
        let edge = EmotionalContext::new(Mood::Overwhelm, 0.7);
        assert!(router.score_all("hello", &edge).iter().all(|s| s.score == 0));
    }

    #[test]
    fn test_all_zero_tie_goes_to_first_registered() {
        let mut router = AgentRouter::new();
        let d = router.route("hello there", &calm(), 0);
        assert_eq!(d.agent_id, "claude");
        assert_eq!(d.alternatives.len(), 2);
        assert_eq!(d.alternatives[0].agent_id, "gpt4");
    }

    #[test]
    fn test_tie_between_first_and_second() {
        let mut router = AgentRouter::new();
        // "explain" is a keyword of both claude and gpt4.
        let d = router.route("explain", &calm(), 0);
        assert_eq!(score_of(&d, "claude"), score_of(&d, "gpt4"));
        assert_eq!(d.agent_id, "claude");
    }

    #[test]
    fn test_routing_is_deterministic() {
        let mut a = AgentRouter::new();
        let mut b = AgentRouter::new();
        let ctx = EmotionalContext::new(Mood::Flow, 0.9);
        let da = a.route("summarize and combine the image", &ctx, 0);
        let db = b.route("summarize and combine the image", &ctx, 0);
        assert_eq!(da, db);
    }

    #[test]
    fn test_rationale_text() {
        let mut router = AgentRouter::new();
        let d = router.route("write me a story", &calm(), 0);
        assert_eq!(
            d.rationale,
            "Selected GPT-4 for creative task. Strengths: polish, explanation, emotional, creative, writing. Score: 4"
        );
    }

    #[test]
    fn test_force_unknown_agent_keeps_current() {
        let mut router = AgentRouter::new();
        let err = router.force_agent("nonexistent").unwrap_err();
        assert_eq!(err, CoreError::UnknownAgent("nonexistent".to_string()));
        assert_eq!(router.current_agent().id, "gpt4");
    }

    #[test]
    fn test_force_known_agent() {
        let mut router = AgentRouter::new();
        let d = router.force_agent("gemini").unwrap();
        assert!(d.forced);
        assert_eq!(router.current_agent().id, "gemini");
        assert_eq!(router.history().count(), 0);
    }

    #[test]
    fn test_history_capped_and_stats() {
        let mut router = AgentRouter::new();
        for i in 0..60 {
            router.route("debug the code", &calm(), i);
        }
        assert_eq!(router.history().count(), ROUTING_HISTORY_CAP);
        assert_eq!(router.history().next().unwrap().timestamp, 10);
        let stats = router.routing_stats();
        assert_eq!(stats[2], ("mistral".to_string(), ROUTING_HISTORY_CAP));
    }

    #[test]
    fn test_history_input_truncated() {
        let mut router = AgentRouter::new();
        router.route(&"z".repeat(300), &calm(), 0);
        assert_eq!(router.history().next().unwrap().input.len(), 100);
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(AgentRouter::with_registry(Vec::new()).is_none());
    }
}
