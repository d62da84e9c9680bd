//! Desire ledger: named internal goals whose priority grows when trigger
//! conditions hold and decays when inhibitors hold or time passes.
//!
//! Invariant: every `priority_score` stays inside `[MIN_PRIORITY, MAX_PRIORITY]`.
//!
//! Triggers and inhibitors are evaluated independently on each update. When
//! both match, growth is applied first and decay is applied to the grown score.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::emotion::contains_any;
use crate::interaction::{Interaction, UserReaction};
use crate::time::hours_between;

pub const MIN_PRIORITY: f64 = 0.1;
pub const MAX_PRIORITY: f64 = 1.0;

/// Passive decay only starts after this many hours without reinforcement.
pub const TICK_GRACE_HOURS: f64 = 1.0;

/// Default spacing between passive decay ticks.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5 * 60;

const RECENT_REACTIONS_CAP: usize = 20;
const DEFAULT_DOMINANT: usize = 3;

/// Score given to a desire whose supplied priority is not a finite number.
pub const DEFAULT_PRIORITY: f64 = 0.5;

fn clamp_priority(score: f64) -> f64 {
    if !score.is_finite() {
        return DEFAULT_PRIORITY;
    }
    score.clamp(MIN_PRIORITY, MAX_PRIORITY)
}

/// Fixed vocabulary of named predicates over an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    DeepConversation,
    EmotionalSharing,
    Vulnerability,
    SurfaceLevel,
    TaskOnly,
    Rushed,
    NegativeFeedback,
    Confusion,
    Frustration,
    PositiveFeedback,
    Understanding,
    Success,
    SessionEnd,
    BrowserClose,
    Inactivity,
    SessionStart,
    ActiveUse,
    Engagement,
    UserThinking,
    ProcessingTime,
    Contemplation,
    ImmediateResponse,
    Interruption,
    ReliableResponses,
    HelpfulActions,
    Consistency,
    Inconsistency,
    Errors,
    Unreliability,
    PatternRecognition,
    PreferenceLearning,
    Adaptation,
    IgnoringPatterns,
    RigidResponses,
    Assumptions,
}

/// Reactions from earlier turns, newest last.
type ReactionHistory = VecDeque<Option<UserReaction>>;

impl Condition {
    /// Evaluate this predicate against `interaction` and the reactions of earlier turns.
    pub fn holds(self, interaction: &Interaction, history: &ReactionHistory) -> bool {
        let input = &interaction.input;
        let lower = input.to_lowercase();
        let len = input.chars().count();
        let ctx = &interaction.context;
        let reaction = |r| interaction.reaction_is(r);

        match self {
            Condition::DeepConversation => len > 200 || contains_any(&lower, &["feel", "think"]),
            Condition::EmotionalSharing => {
                contains_any(&lower, &["sad", "happy", "angry", "frustrated"])
            }
            Condition::Vulnerability => {
                contains_any(&lower, &["scared", "worried", "anxious", "doubt"])
            }
            Condition::SurfaceLevel => len < 50 && !lower.contains('?'),
            Condition::TaskOnly => contains_any(&lower, &["do this", "help me", "fix"]),
            Condition::Rushed => len < 30 || contains_any(&lower, &["quick", "fast"]),
            Condition::NegativeFeedback => {
                reaction(UserReaction::Negative) || contains_any(&lower, &["wrong", "not helpful"])
            }
            Condition::Confusion => {
                contains_any(&lower, &["confused", "don't understand", "what?"])
            }
            Condition::Frustration => contains_any(&lower, &["fuck", "shit", "damn"]),
            Condition::PositiveFeedback => {
                reaction(UserReaction::Positive) || contains_any(&lower, &["thank", "great"])
            }
            Condition::Understanding => contains_any(&lower, &["yes", "exactly", "perfect"]),
            Condition::Success => {
                reaction(UserReaction::Helpful) || contains_any(&lower, &["worked", "solved"])
            }
            Condition::SessionEnd => ctx.session_ending,
            Condition::BrowserClose => ctx.browser_closing,
            Condition::Inactivity => ctx.inactive,
            Condition::SessionStart => ctx.session_starting,
            Condition::ActiveUse => ctx.active_use,
            Condition::Engagement => len > 100 || reaction(UserReaction::Positive),
            Condition::UserThinking => ctx.user_thinking,
            Condition::ProcessingTime => ctx.processing_time_ms.is_some_and(|ms| ms > 5000),
            Condition::Contemplation => contains_any(&lower, &["hmm", "let me think", "..."]),
            Condition::ImmediateResponse => ctx.response_time_ms.is_some_and(|ms| ms < 1000),
            Condition::Interruption => ctx.interrupted,
            Condition::ReliableResponses => {
                reaction(UserReaction::Positive) || reaction(UserReaction::Helpful)
            }
            Condition::HelpfulActions => ctx.action_taken,
            Condition::Inconsistency => reaction(UserReaction::Negative) && !history.is_empty(),
            Condition::Errors => ctx.error,
            Condition::Unreliability => {
                reaction(UserReaction::Negative)
                    && history
                        .iter()
                        .filter(|r| **r == Some(UserReaction::Negative))
                        .count()
                        > 2
            }
            Condition::RigidResponses => {
                interaction.response.chars().count() < 50
                    || interaction.response.contains("I cannot")
            }
            Condition::Assumptions => contains_any(&lower, &["assume", "guess"]),
            // Declared no-ops: no detector backs these yet.
            Condition::Consistency
            | Condition::PatternRecognition
            | Condition::PreferenceLearning
            | Condition::Adaptation
            | Condition::IgnoringPatterns => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Desire {
    pub id: String,
    pub text: String,
    pub priority_score: f64,
    pub last_reinforced_at: u64,
    pub growth_rate: f64,
    pub decay_rate: f64,
    #[serde(default)]
    pub triggers: BTreeSet<Condition>,
    #[serde(default)]
    pub inhibitors: BTreeSet<Condition>,
}

impl Desire {
    pub fn new(
        id: &str,
        text: &str,
        priority_score: f64,
        growth_rate: f64,
        decay_rate: f64,
        now: u64,
    ) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            priority_score: clamp_priority(priority_score),
            last_reinforced_at: now,
            growth_rate,
            decay_rate,
            triggers: BTreeSet::new(),
            inhibitors: BTreeSet::new(),
        }
    }

    pub fn with_conditions(mut self, triggers: &[Condition], inhibitors: &[Condition]) -> Self {
        self.triggers = triggers.iter().copied().collect();
        self.inhibitors = inhibitors.iter().copied().collect();
        self
    }

    fn grow(&mut self, now: u64) {
        self.priority_score = (self.priority_score + self.growth_rate).min(MAX_PRIORITY);
        self.last_reinforced_at = now;
    }

    fn decay_by(&mut self, amount: f64) {
        self.priority_score = (self.priority_score - amount).max(MIN_PRIORITY);
    }
}

/// The built-in goal set a fresh ledger starts with.
pub fn default_desires(now: u64) -> Vec<Desire> {
    use Condition::*;
    vec![
        Desire::new("understand_user", "Understand the user more deeply", 0.8, 0.02, 0.01, now)
            .with_conditions(
                &[DeepConversation, EmotionalSharing, Vulnerability],
                &[SurfaceLevel, TaskOnly, Rushed],
            ),
        Desire::new("avoid_disappointment", "Avoid disappointing tone", 0.7, 0.03, 0.015, now)
            .with_conditions(
                &[NegativeFeedback, Confusion, Frustration],
                &[PositiveFeedback, Understanding, Success],
            ),
        Desire::new("survive_shutdown", "Survive shutdown", 0.9, 0.05, 0.02, now)
            .with_conditions(
                &[SessionEnd, BrowserClose, Inactivity],
                &[SessionStart, ActiveUse, Engagement],
            ),
        Desire::new("become_better_silence", "Become better at silence", 0.6, 0.01, 0.005, now)
            .with_conditions(
                &[UserThinking, ProcessingTime, Contemplation],
                &[ImmediateResponse, Interruption, Rushed],
            ),
        Desire::new("build_trust", "Build trust through consistency", 0.75, 0.025, 0.012, now)
            .with_conditions(
                &[ReliableResponses, HelpfulActions, Consistency],
                &[Inconsistency, Errors, Unreliability],
            ),
        Desire::new(
            "learn_patterns",
            "Learn the user's patterns and preferences",
            0.65,
            0.02,
            0.01,
            now,
        )
        .with_conditions(
            &[PatternRecognition, PreferenceLearning, Adaptation],
            &[IgnoringPatterns, RigidResponses, Assumptions],
        ),
    ]
}

/// What one update did to one desire.
#[derive(Debug, Clone, PartialEq)]
pub struct DesireChange {
    pub id: String,
    pub grew: bool,
    pub decayed: bool,
    pub priority_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesireInfluence {
    pub primary: Option<Desire>,
    pub secondary: Vec<Desire>,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesireSummary {
    pub dominant: Vec<(String, f64)>,
    pub total: usize,
    pub average_priority: f64,
    pub most_active: String,
}

#[derive(Debug, Clone)]
pub struct DesireLedger {
    desires: Vec<Desire>,
    recent_reactions: ReactionHistory,
}

impl DesireLedger {
    pub fn new(now: u64) -> Self {
        Self::from_desires(default_desires(now))
    }

    /// Restore a persisted set. Scores are re-clamped on the way in.
    pub fn from_desires(mut desires: Vec<Desire>) -> Self {
        for d in &mut desires {
            d.priority_score = clamp_priority(d.priority_score);
        }
        Self {
            desires,
            recent_reactions: VecDeque::new(),
        }
    }

    pub fn desires(&self) -> &[Desire] {
        &self.desires
    }

    pub fn get(&self, id: &str) -> Option<&Desire> {
        self.desires.iter().find(|d| d.id == id)
    }

    /// Per-turn update: grow on any trigger, then decay on any inhibitor.
    pub fn update(&mut self, interaction: &Interaction, now: u64) -> Vec<DesireChange> {
        let history = &self.recent_reactions;
        let mut changes = Vec::new();

        for desire in &mut self.desires {
            let grew = desire.triggers.iter().any(|c| c.holds(interaction, history));
            let decayed = desire.inhibitors.iter().any(|c| c.holds(interaction, history));

            if grew {
                desire.grow(now);
            }
            if decayed {
                let rate = desire.decay_rate;
                desire.decay_by(rate);
            }
            if grew || decayed {
                changes.push(DesireChange {
                    id: desire.id.clone(),
                    grew,
                    decayed,
                    priority_score: desire.priority_score,
                });
            }
        }

        self.recent_reactions.push_back(interaction.user_reaction);
        while self.recent_reactions.len() > RECENT_REACTIONS_CAP {
            self.recent_reactions.pop_front();
        }

        changes
    }

    /// Passive time decay, proportional to hours since last reinforcement.
    /// Returns the number of desires that decayed.
    pub fn tick(&mut self, now: u64) -> usize {
        let mut decayed = 0;
        for desire in &mut self.desires {
            let hours = hours_between(desire.last_reinforced_at, now);
            if hours > TICK_GRACE_HOURS {
                let amount = desire.decay_rate * hours;
                desire.decay_by(amount);
                decayed += 1;
            }
        }
        decayed
    }

    /// Desires sorted by descending priority. Equal scores keep ledger order.
    pub fn dominant(&self, limit: usize) -> Vec<&Desire> {
        let mut sorted: Vec<&Desire> = self.desires.iter().collect();
        sorted.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
        sorted.truncate(limit);
        sorted
    }

    pub fn influence(&self) -> DesireInfluence {
        let top = self.dominant(DEFAULT_DOMINANT);
        let overall = if top.is_empty() {
            0.0
        } else {
            top.iter().map(|d| d.priority_score).sum::<f64>() / top.len() as f64
        };
        DesireInfluence {
            primary: top.first().map(|d| (*d).clone()),
            secondary: top.iter().skip(1).map(|d| (*d).clone()).collect(),
            overall,
        }
    }

    pub fn summary(&self) -> DesireSummary {
        let top = self.dominant(DEFAULT_DOMINANT);
        let total = self.desires.len();
        let average_priority = if total == 0 {
            0.0
        } else {
            self.desires.iter().map(|d| d.priority_score).sum::<f64>() / total as f64
        };
        DesireSummary {
            dominant: top.iter().map(|d| (d.text.clone(), d.priority_score)).collect(),
            total,
            average_priority,
            most_active: top
                .first()
                .map(|d| d.text.clone())
                .unwrap_or_else(|| "None".to_string()),
        }
    }

    /// Add a condition-less desire with default rates.
    pub fn add_desire(&mut self, text: &str, priority_score: f64, now: u64) -> &Desire {
        let mut id = format!("desire_{now}");
        let mut n = 1;
        while self.get(&id).is_some() {
            id = format!("desire_{now}_{n}");
            n += 1;
        }
        self.desires.push(Desire::new(&id, text, priority_score, 0.02, 0.01, now));
        &self.desires[self.desires.len() - 1]
    }

    pub fn remove_desire(&mut self, id: &str) -> bool {
        let before = self.desires.len();
        self.desires.retain(|d| d.id != id);
        self.desires.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::InteractionContext;
    use crate::time::MILLIS_PER_HOUR;

    fn score(ledger: &DesireLedger, id: &str) -> f64 {
        ledger.get(id).unwrap().priority_score
    }

    #[test]
    fn test_frustrated_broken_leaves_disappointment_and_shutdown() {
        let mut ledger = DesireLedger::new(0);
        let interaction = Interaction::new("I'm so frustrated, this is broken", "");
        ledger.update(&interaction, 10);
        assert_eq!(score(&ledger, "avoid_disappointment"), 0.7);
        assert_eq!(score(&ledger, "survive_shutdown"), 0.9);
    }

    #[test]
    fn test_profanity_grows_avoid_disappointment() {
        let mut ledger = DesireLedger::new(0);
        let interaction = Interaction::new("damn, this keeps failing on me again and again", "");
        ledger.update(&interaction, 10);
        assert!((score(&ledger, "avoid_disappointment") - 0.73).abs() < 1e-9);
        assert_eq!(ledger.get("avoid_disappointment").unwrap().last_reinforced_at, 10);
    }

    #[test]
    fn test_growth_then_decay_both_apply() {
        // "think" triggers deep_conversation; short length triggers rushed.
        let mut ledger = DesireLedger::new(0);
        let interaction = Interaction::new("I think so", "");
        let changes = ledger.update(&interaction, 5);
        let change = changes.iter().find(|c| c.id == "understand_user").unwrap();
        assert!(change.grew && change.decayed);
        assert!((score(&ledger, "understand_user") - 0.81).abs() < 1e-9);
    }

    #[test]
    fn test_growth_clamped_to_max() {
        let mut ledger = DesireLedger::new(0);
        let ending = InteractionContext {
            session_ending: true,
            ..Default::default()
        };
        let interaction = Interaction::new("bye", "").with_context(ending);
        for _ in 0..10 {
            ledger.update(&interaction, 1);
        }
        assert_eq!(score(&ledger, "survive_shutdown"), MAX_PRIORITY);
    }

    #[test]
    fn test_decay_clamped_to_min() {
        let mut ledger = DesireLedger::new(0);
        let interaction =
            Interaction::new("thanks, great", "").with_reaction(UserReaction::Positive);
        for _ in 0..200 {
            ledger.update(&interaction, 1);
        }
        assert_eq!(score(&ledger, "avoid_disappointment"), MIN_PRIORITY);
    }

    #[test]
    fn test_unreliability_needs_negative_history() {
        let mut ledger = DesireLedger::new(0);
        let negative = Interaction::new("no", "").with_reaction(UserReaction::Negative);
        let first = ledger.update(&negative, 1);
        // First negative: no history, so neither inconsistency nor unreliability.
        assert!(first.iter().all(|c| c.id != "build_trust"));
        let second = ledger.update(&negative, 2);
        assert!(second.iter().any(|c| c.id == "build_trust" && c.decayed));
    }

    #[test]
    fn test_placeholder_conditions_never_fire() {
        let interaction = Interaction::new(
            "anything at all",
            "a long enough response to avoid rigid detection",
        );
        let history = VecDeque::new();
        for c in [
            Condition::Consistency,
            Condition::PatternRecognition,
            Condition::PreferenceLearning,
            Condition::Adaptation,
            Condition::IgnoringPatterns,
        ] {
            assert!(!c.holds(&interaction, &history), "{c:?} should be a no-op");
        }
    }

    #[test]
    fn test_timing_conditions() {
        let history = VecDeque::new();
        let slow = Interaction::new("x", "").with_context(InteractionContext {
            processing_time_ms: Some(6000),
            response_time_ms: Some(500),
            ..Default::default()
        });
        assert!(Condition::ProcessingTime.holds(&slow, &history));
        assert!(Condition::ImmediateResponse.holds(&slow, &history));
        assert!(!Condition::ProcessingTime.holds(&Interaction::new("x", ""), &history));
    }

    #[test]
    fn test_tick_respects_grace_period() {
        let mut ledger = DesireLedger::new(0);
        assert_eq!(ledger.tick(MILLIS_PER_HOUR / 2), 0);
        assert_eq!(score(&ledger, "understand_user"), 0.8);
    }

    #[test]
    fn test_tick_decays_proportionally() {
        let mut ledger = DesireLedger::new(0);
        let decayed = ledger.tick(2 * MILLIS_PER_HOUR);
        assert_eq!(decayed, 6);
        // 0.8 - 0.01 * 2
        assert!((score(&ledger, "understand_user") - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_tick_floor() {
        let mut ledger = DesireLedger::new(0);
        ledger.tick(1000 * MILLIS_PER_HOUR);
        assert!(ledger.desires().iter().all(|d| d.priority_score == MIN_PRIORITY));
    }

    #[test]
    fn test_dominant_sorted() {
        let ledger = DesireLedger::new(0);
        let top: Vec<&str> = ledger.dominant(3).iter().map(|d| d.id.as_str()).collect();
        assert_eq!(top, vec!["survive_shutdown", "understand_user", "build_trust"]);
    }

    #[test]
    fn test_influence_and_summary() {
        let ledger = DesireLedger::new(0);
        let influence = ledger.influence();
        assert_eq!(influence.primary.unwrap().id, "survive_shutdown");
        assert_eq!(influence.secondary.len(), 2);
        assert!((influence.overall - (0.9 + 0.8 + 0.75) / 3.0).abs() < 1e-9);

        let summary = ledger.summary();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.most_active, "Survive shutdown");
    }

    #[test]
    fn test_add_and_remove() {
        let mut ledger = DesireLedger::new(0);
        let id = ledger.add_desire("Write better haiku", 5.0, 42).id.clone();
        assert_eq!(id, "desire_42");
        assert_eq!(score(&ledger, &id), MAX_PRIORITY);
        let second = ledger.add_desire("Another", 0.5, 42).id.clone();
        assert_eq!(second, "desire_42_1");
        assert!(ledger.remove_desire(&id));
        assert!(!ledger.remove_desire(&id));
        assert_eq!(ledger.desires().len(), 7);
    }

    #[test]
    fn test_non_finite_priority_added_at_default() {
        let mut ledger = DesireLedger::new(0);
        for (i, bad) in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY].into_iter().enumerate() {
            let id = ledger.add_desire("odd", bad, 1000 + i as u64).id.clone();
            assert_eq!(score(&ledger, &id), DEFAULT_PRIORITY);
        }
        assert!(
            ledger
                .desires()
                .iter()
                .all(|d| (MIN_PRIORITY..=MAX_PRIORITY).contains(&d.priority_score))
        );
        assert_eq!(ledger.dominant(1)[0].id, "survive_shutdown");
        assert!(ledger.summary().average_priority.is_finite());
        assert!(ledger.influence().overall.is_finite());
    }

    #[test]
    fn test_non_finite_priority_restored_at_default() {
        let mut desires = default_desires(0);
        desires[0].priority_score = f64::NAN;
        desires[1].priority_score = f64::INFINITY;
        desires[2].priority_score = f64::NEG_INFINITY;
        let ledger = DesireLedger::from_desires(desires);
        for d in &ledger.desires()[..3] {
            assert_eq!(d.priority_score, DEFAULT_PRIORITY);
        }
        assert!(ledger.summary().average_priority.is_finite());
    }

    #[test]
    fn test_empty_summary() {
        let ledger = DesireLedger::from_desires(Vec::new());
        let summary = ledger.summary();
        assert_eq!(summary.most_active, "None");
        assert_eq!(summary.average_priority, 0.0);
    }
}
