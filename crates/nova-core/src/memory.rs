//! Turn records, cosine similarity, and the in-memory record set.
//!
//! The bank is append-only apart from the optional retention policy.
//! Embedding and persistence live in the engine; this module only ranks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emotion::{EmotionalContext, Mood};

/// Default number of records returned by recall.
pub const DEFAULT_RECALL_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: Uuid,
    pub timestamp: u64,
    pub input_text: String,
    pub response_text: String,
    pub mood: Mood,
    pub intensity: f64,
    #[serde(default)]
    pub trigger_tags: BTreeSet<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryRecord {
    pub fn new(
        input: &str,
        response: &str,
        context: &EmotionalContext,
        embedding: Option<Vec<f32>>,
        now: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            input_text: input.to_string(),
            response_text: response.to_string(),
            mood: context.mood,
            intensity: context.intensity,
            trigger_tags: context.triggers.clone(),
            embedding,
        }
    }

    /// Text that is embedded for this record: input and response joined by a space.
    pub fn embedding_text(input: &str, response: &str) -> String {
        format!("{input} {response}")
    }
}

/// `dot(a, b) / (|a| × |b|)`. Zero when either side is absent, empty or
/// has zero magnitude. Extra trailing dimensions on the longer side are ignored.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let mag_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let denom = mag_a * mag_b;
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Eviction hook applied after every append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "limit")]
pub enum RetentionPolicy {
    /// Keep everything. Growth is unbounded.
    #[default]
    Unbounded,
    /// Keep the newest `n` records, evicting oldest first.
    MaxRecords(usize),
}

/// A recalled record with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    records: Vec<MemoryRecord>,
    retention: RetentionPolicy,
}

impl MemoryBank {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            records: Vec::new(),
            retention,
        }
    }

    pub fn from_records(records: Vec<MemoryRecord>, retention: RetentionPolicy) -> Self {
        let mut bank = Self { records, retention };
        bank.enforce_retention();
        bank
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Append a record and apply retention. Returns how many records were evicted.
    pub fn push(&mut self, record: MemoryRecord) -> usize {
        self.records.push(record);
        self.enforce_retention()
    }

    fn enforce_retention(&mut self) -> usize {
        match self.retention {
            RetentionPolicy::Unbounded => 0,
            RetentionPolicy::MaxRecords(max) => {
                let excess = self.records.len().saturating_sub(max);
                self.records.drain(..excess);
                excess
            }
        }
    }

    /// Records with an embedding, ranked by descending similarity to `query`.
    /// Equal similarities keep insertion order.
    pub fn rank(&self, query: &[f32], limit: usize) -> Vec<ScoredRecord> {
        let mut scored: Vec<ScoredRecord> = self
            .records
            .iter()
            .filter_map(|r| {
                let embedding = r.embedding.as_deref()?;
                Some(ScoredRecord {
                    similarity: cosine_similarity(Some(query), Some(embedding)),
                    record: r.clone(),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(input: &str, embedding: Option<Vec<f32>>) -> MemoryRecord {
        MemoryRecord::new(input, "reply", &EmotionalContext::default(), embedding, 0)
    }

    #[test]
    fn test_cosine_absent_is_zero() {
        assert_eq!(cosine_similarity(None, Some(&[1.0, 2.0])), 0.0);
        assert_eq!(cosine_similarity(Some(&[1.0]), None), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_and_parallel() {
        assert!(cosine_similarity(Some(&[1.0, 0.0]), Some(&[0.0, 3.0])).abs() < 1e-12);
        assert!((cosine_similarity(Some(&[2.0, 2.0]), Some(&[5.0, 5.0])) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(Some(&[1.0, 0.0]), Some(&[-1.0, 0.0])) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(Some(&[0.0, 0.0]), Some(&[1.0, 1.0])), 0.0);
    }

    #[test]
    fn test_rank_skips_unembedded_and_orders() {
        let mut bank = MemoryBank::default();
        bank.push(record("far", Some(vec![0.0, 1.0])));
        bank.push(record("none", None));
        bank.push(record("near", Some(vec![1.0, 0.1])));
        bank.push(record("mid", Some(vec![1.0, 1.0])));

        let ranked = bank.rank(&[1.0, 0.0], 5);
        let inputs: Vec<&str> = ranked.iter().map(|s| s.record.input_text.as_str()).collect();
        assert_eq!(inputs, vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_rank_respects_limit() {
        let mut bank = MemoryBank::default();
        for i in 0..10 {
            bank.push(record(&format!("r{i}"), Some(vec![1.0, i as f32])));
        }
        assert_eq!(bank.rank(&[1.0, 0.0], 3).len(), 3);
    }

    #[test]
    fn test_unbounded_retention_keeps_everything() {
        let mut bank = MemoryBank::default();
        for i in 0..50 {
            assert_eq!(bank.push(record(&format!("r{i}"), None)), 0);
        }
        assert_eq!(bank.len(), 50);
    }

    #[test]
    fn test_max_records_evicts_oldest() {
        let mut bank = MemoryBank::new(RetentionPolicy::MaxRecords(2));
        bank.push(record("a", None));
        bank.push(record("b", None));
        assert_eq!(bank.push(record("c", None)), 1);
        let inputs: Vec<&str> = bank.records().iter().map(|r| r.input_text.as_str()).collect();
        assert_eq!(inputs, vec!["b", "c"]);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let r = record("hi", None);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("inputText").is_some());
        assert!(json.get("triggerTags").is_some());
    }
}
