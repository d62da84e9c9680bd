//! Self-state tracker: mood/confidence/energy/focus updated from user
//! reactions, with a reflection pass after every interaction.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalSummary, Mood, contains_any};
use crate::interaction::{Interaction, UserReaction, truncate_chars};

pub const HISTORY_CAP: usize = 100;
pub const REFLECTION_CAP: usize = 50;

/// Interval of the passive ambient-mood refresh.
pub const DEFAULT_PASSIVE_INTERVAL_SECS: u64 = 30;

const REFLECTION_WINDOW: usize = 10;
const HISTORY_TEXT_CHARS: usize = 200;
const LONG_INPUT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfState {
    pub mood: f64,
    pub confidence: f64,
    pub energy: f64,
    pub focus: f64,
    pub timestamp: u64,
}

impl SelfState {
    pub fn new(now: u64) -> Self {
        Self {
            mood: 0.5,
            confidence: 0.5,
            energy: 0.7,
            focus: 0.8,
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Casual,
    Formal,
    Enthusiastic,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Casual => "casual",
            Tone::Formal => "formal",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Neutral => "neutral",
        }
    }
}

/// First match wins, in the order casual, formal, enthusiastic.
pub fn detect_tone(text: &str) -> Tone {
    let lower = text.to_lowercase();
    if contains_any(&lower, &["fuck", "shit", "damn"]) {
        Tone::Casual
    } else if contains_any(&lower, &["please", "thank you", "would you"]) {
        Tone::Formal
    } else if contains_any(&lower, &["!", "amazing", "awesome"]) {
        Tone::Enthusiastic
    } else {
        Tone::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneSuggestion {
    Cautious,
    Enthusiastic,
    Gentle,
    Balanced,
}

impl fmt::Display for ToneSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToneSuggestion::Cautious => "cautious",
            ToneSuggestion::Enthusiastic => "enthusiastic",
            ToneSuggestion::Gentle => "gentle",
            ToneSuggestion::Balanced => "balanced",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEntry {
    pub timestamp: u64,
    pub input: String,
    pub response: String,
    pub user_reaction: Option<UserReaction>,
    pub emotional_state: SelfState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub timestamp: u64,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneAnalysis {
    pub needs_adjustment: bool,
    pub dominant_tone: Option<Tone>,
    pub suggestion: String,
}

/// Ambient mood picture refreshed from the emotional log by the passive tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbientMood {
    pub mood: Mood,
    pub intensity: f64,
    pub patterns: Vec<Mood>,
}

impl Default for AmbientMood {
    fn default() -> Self {
        Self {
            mood: Mood::Neutral,
            intensity: 0.5,
            patterns: Vec::new(),
        }
    }
}

/// Persisted bundle for the self model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfModelSnapshot {
    pub current_state: SelfState,
    #[serde(default)]
    pub ambient: AmbientMood,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
    #[serde(default)]
    pub interaction_history: Vec<InteractionEntry>,
}

/// Read-only view returned to hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfStateView {
    #[serde(flatten)]
    pub state: SelfState,
    pub reflection_count: usize,
    pub interaction_count: usize,
}

#[derive(Debug, Clone)]
pub struct SelfModel {
    state: SelfState,
    ambient: AmbientMood,
    history: VecDeque<InteractionEntry>,
    reflections: VecDeque<Reflection>,
}

impl SelfModel {
    pub fn new(now: u64) -> Self {
        Self {
            state: SelfState::new(now),
            ambient: AmbientMood::default(),
            history: VecDeque::new(),
            reflections: VecDeque::new(),
        }
    }

    pub fn from_snapshot(snapshot: SelfModelSnapshot) -> Self {
        let mut model = Self {
            state: snapshot.current_state,
            ambient: snapshot.ambient,
            history: snapshot.interaction_history.into(),
            reflections: snapshot.reflections.into(),
        };
        model.enforce_caps();
        model
    }

    pub fn snapshot(&self) -> SelfModelSnapshot {
        SelfModelSnapshot {
            current_state: self.state,
            ambient: self.ambient.clone(),
            reflections: self.reflections.iter().cloned().collect(),
            interaction_history: self.history.iter().cloned().collect(),
        }
    }

    pub fn state(&self) -> &SelfState {
        &self.state
    }

    pub fn ambient(&self) -> &AmbientMood {
        &self.ambient
    }

    pub fn history(&self) -> impl Iterator<Item = &InteractionEntry> {
        self.history.iter()
    }

    pub fn reflections(&self) -> impl Iterator<Item = &Reflection> {
        self.reflections.iter()
    }

    pub fn current_state(&self) -> SelfStateView {
        SelfStateView {
            state: self.state,
            reflection_count: self.reflections.len(),
            interaction_count: self.history.len(),
        }
    }

    fn enforce_caps(&mut self) {
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
        while self.reflections.len() > REFLECTION_CAP {
            self.reflections.pop_front();
        }
    }

    /// Apply reaction heuristics, log the interaction and reflect on it.
    pub fn update_emotional_state(&mut self, interaction: &Interaction, now: u64) -> &Reflection {
        let mut mood_shift = 0.0;
        let mut confidence_shift = 0.0;

        if let Some(reaction) = interaction.user_reaction {
            if reaction.is_favourable() {
                mood_shift += 0.1;
                confidence_shift += 0.05;
            }
            if reaction.is_unfavourable() {
                confidence_shift -= 0.1;
                self.state.focus = (self.state.focus + 0.1).min(1.0);
            }
        }

        if interaction.input.chars().count() > LONG_INPUT_CHARS {
            self.state.energy = (self.state.energy + 0.05).min(1.0);
        }

        self.state.mood = (self.state.mood + mood_shift).clamp(0.0, 1.0);
        self.state.confidence = (self.state.confidence + confidence_shift).clamp(0.0, 1.0);
        self.state.timestamp = now;

        self.history.push_back(InteractionEntry {
            timestamp: now,
            input: truncate_chars(&interaction.input, HISTORY_TEXT_CHARS),
            response: truncate_chars(&interaction.response, HISTORY_TEXT_CHARS),
            user_reaction: interaction.user_reaction,
            emotional_state: self.state,
        });

        self.reflect_on_interaction(now)
    }

    /// Inspect the last interactions for frustration runs, success runs and
    /// a recurring tone.
    pub fn reflect_on_interaction(&mut self, now: u64) -> &Reflection {
        let start = self.history.len().saturating_sub(REFLECTION_WINDOW);
        let recent: Vec<&InteractionEntry> = self.history.iter().skip(start).collect();
        let mut insights = Vec::new();

        let negatives = recent
            .iter()
            .filter(|i| i.user_reaction == Some(UserReaction::Negative))
            .count();
        if negatives > 3 {
            insights.push(
                "User seems frustrated with my responses. Need to adjust approach.".to_string(),
            );
            self.state.confidence = (self.state.confidence - 0.1).max(0.1);
        }

        let positives = recent
            .iter()
            .filter(|i| i.user_reaction == Some(UserReaction::Positive))
            .count();
        if positives > 5 {
            insights.push("Recent interactions have been positive. Building trust.".to_string());
            self.state.confidence = (self.state.confidence + 0.05).min(1.0);
        }

        let inputs: Vec<&str> = recent.iter().map(|i| i.input.as_str()).collect();
        let tone = analyze_tone_patterns(&inputs);
        if tone.needs_adjustment {
            insights.push(format!("Tone adjustment needed: {}", tone.suggestion));
        }

        self.reflections.push_back(Reflection {
            timestamp: now,
            insights,
        });
        self.enforce_caps();
        &self.reflections[self.reflections.len() - 1]
    }

    /// Map `(confidence, mood, energy)` onto a tone suggestion.
    pub fn tone_suggestion(&self) -> ToneSuggestion {
        let SelfState {
            mood,
            confidence,
            energy,
            ..
        } = self.state;
        if confidence < 0.3 {
            ToneSuggestion::Cautious
        } else if mood > 0.7 && energy > 0.6 {
            ToneSuggestion::Enthusiastic
        } else if mood < 0.3 {
            ToneSuggestion::Gentle
        } else {
            ToneSuggestion::Balanced
        }
    }

    /// Refresh the ambient mood from the emotional summary. No summary, no change.
    pub fn passive_update(&mut self, summary: Option<&EmotionalSummary>) -> bool {
        let Some(summary) = summary else {
            return false;
        };
        self.ambient = AmbientMood {
            mood: summary.dominant_mood,
            intensity: summary.average_intensity,
            patterns: summary.recent_patterns.clone(),
        };
        true
    }

    /// The last five insights among the last ten reflections.
    pub fn growth_insights(&self) -> Vec<String> {
        let start = self.reflections.len().saturating_sub(REFLECTION_WINDOW);
        let insights: Vec<String> = self
            .reflections
            .iter()
            .skip(start)
            .flat_map(|r| r.insights.iter().cloned())
            .collect();
        let keep = insights.len().saturating_sub(5);
        insights[keep..].to_vec()
    }
}

/// Recurring-tone scan: adjustment is needed when more than five samples are
/// present and the most common tone appears more than three times.
pub fn analyze_tone_patterns(inputs: &[&str]) -> ToneAnalysis {
    let tones: Vec<Tone> = inputs.iter().map(|t| detect_tone(t)).collect();

    let mut counts: Vec<(Tone, usize)> = Vec::new();
    for tone in &tones {
        match counts.iter_mut().find(|(t, _)| t == tone) {
            Some((_, n)) => *n += 1,
            None => counts.push((*tone, 1)),
        }
    }
    // A later tone takes over unless the current best is strictly more frequent.
    let dominant = counts
        .iter()
        .copied()
        .reduce(|best, next| if best.1 > next.1 { best } else { next });

    let dominant_count = dominant.map(|(_, n)| n).unwrap_or(0);
    let dominant_tone = dominant.map(|(t, _)| t);
    ToneAnalysis {
        needs_adjustment: tones.len() > 5 && dominant_count > 3,
        dominant_tone,
        suggestion: format!(
            "User prefers {} tone. Adjusting accordingly.",
            dominant_tone.map(|t| t.as_str()).unwrap_or("neutral")
        ),
    }
}
