//! Emotional context analysis: keyword-driven mood detection, the
//! independent intensity classifier, and the rolling sample log.
//!
//! Mood categories are scanned in a fixed order and every category with at
//! least one hit overwrites the previous result, so the *last* matching
//! category wins. Intensity is `0.5 + 0.1 × hits` for that category.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of trailing samples the emotional summary looks at.
pub const SUMMARY_WINDOW: usize = 10;

const BASE_INTENSITY: f64 = 0.5;
const INTENSITY_PER_MATCH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Frustration,
    Overwhelm,
    Flow,
    Avoidance,
    Mania,
    #[default]
    Neutral,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Frustration => "frustration",
            Mood::Overwhelm => "overwhelm",
            Mood::Flow => "flow",
            Mood::Avoidance => "avoidance",
            Mood::Mania => "mania",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation order matters: later entries overwrite earlier ones.
const MOOD_KEYWORDS: &[(Mood, &[&str])] = &[
    (
        Mood::Frustration,
        &["fuck", "shit", "damn", "hate", "annoying", "stupid", "broken"],
    ),
    (
        Mood::Overwhelm,
        &["too much", "overwhelmed", "drowning", "can't", "impossible", "stuck"],
    ),
    (
        Mood::Flow,
        &["flow", "zone", "crushing", "killing", "amazing", "perfect", "love"],
    ),
    (
        Mood::Avoidance,
        &["later", "tomorrow", "maybe", "not now", "procrastinate", "avoid"],
    ),
    (
        Mood::Mania,
        &["everything", "all", "now", "rush", "hyper", "manic", "crazy"],
    ),
];

/// Result of analysing one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalContext {
    pub mood: Mood,
    pub intensity: f64,
    /// Keywords of the winning category that were found in the text.
    #[serde(default)]
    pub triggers: BTreeSet<String>,
}

impl EmotionalContext {
    pub fn new(mood: Mood, intensity: f64) -> Self {
        Self {
            mood,
            intensity,
            triggers: BTreeSet::new(),
        }
    }
}

impl Default for EmotionalContext {
    fn default() -> Self {
        Self::new(Mood::Neutral, BASE_INTENSITY)
    }
}

/// Keywords from `keywords` that occur in the already lower-cased `text`.
pub(crate) fn matching<'a>(text: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    keywords.iter().copied().filter(|k| text.contains(k)).collect()
}

/// Whether any keyword occurs in the already lower-cased `text`.
pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Map raw text to a mood label and intensity. Pure.
pub fn analyze(text: &str) -> EmotionalContext {
    let lower = text.to_lowercase();
    let mut context = EmotionalContext::default();

    for (mood, keywords) in MOOD_KEYWORDS {
        let hits = matching(&lower, keywords);
        if !hits.is_empty() {
            context.mood = *mood;
            context.intensity =
                (BASE_INTENSITY + INTENSITY_PER_MATCH * hits.len() as f64).min(1.0);
            context.triggers = hits.into_iter().map(str::to_string).collect();
        }
    }

    context
}

const HIGH_INTENSITY: &[&str] = &["urgent", "emergency", "panic", "desperate", "critical"];
const MEDIUM_INTENSITY: &[&str] = &["frustrated", "annoyed", "concerned", "worried"];
const LOW_INTENSITY: &[&str] = &["calm", "relaxed", "peaceful", "content"];

/// Bucketed intensity classifier, independent of [`analyze`].
///
/// Returns the largest scalar among matched buckets (high 0.8, medium 0.5,
/// low 0.2), or 0.0 when nothing matches.
pub fn classify_intensity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    [(HIGH_INTENSITY, 0.8), (MEDIUM_INTENSITY, 0.5), (LOW_INTENSITY, 0.2)]
        .iter()
        .filter(|(keywords, _)| contains_any(&lower, keywords))
        .map(|(_, level)| *level)
        .fold(0.0, f64::max)
}

// --- Sample log ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalSample {
    pub timestamp: u64,
    pub source_text: String,
    pub mood: Mood,
    pub intensity: f64,
}

/// Rolling view over the most recent samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalSummary {
    pub dominant_mood: Mood,
    pub average_intensity: f64,
    pub recent_patterns: Vec<Mood>,
}

/// Ordered, append-only log of emotional samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionalLog {
    samples: Vec<EmotionalSample>,
}

impl EmotionalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<EmotionalSample>) -> Self {
        Self { samples }
    }

    /// Record a detected mood. Intensity comes from [`classify_intensity`],
    /// not from the mood analyzer.
    pub fn track(&mut self, input: &str, mood: Mood, now: u64) -> &EmotionalSample {
        self.samples.push(EmotionalSample {
            timestamp: now,
            source_text: input.to_string(),
            mood,
            intensity: classify_intensity(input),
        });
        &self.samples[self.samples.len() - 1]
    }

    pub fn samples(&self) -> &[EmotionalSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Dominant mood and mean intensity over the last [`SUMMARY_WINDOW`] samples.
    /// Count ties go to the mood seen first inside the window.
    pub fn summary(&self) -> Option<EmotionalSummary> {
        if self.samples.is_empty() {
            return None;
        }
        let start = self.samples.len().saturating_sub(SUMMARY_WINDOW);
        let recent = &self.samples[start..];

        let mut counts: Vec<(Mood, usize)> = Vec::new();
        for sample in recent {
            match counts.iter_mut().find(|(m, _)| *m == sample.mood) {
                Some((_, n)) => *n += 1,
                None => counts.push((sample.mood, 1)),
            }
        }
        let dominant_mood = counts
            .iter()
            .fold(None::<(Mood, usize)>, |best, &(mood, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((mood, n)),
            })
            .map(|(mood, _)| mood)
            .unwrap_or_default();

        let average_intensity =
            recent.iter().map(|s| s.intensity).sum::<f64>() / recent.len() as f64;

        Some(EmotionalSummary {
            dominant_mood,
            average_intensity,
            recent_patterns: recent.iter().map(|s| s.mood).collect(),
        })
    }
}
