//! Memory Store service: embeds and persists exchanges around the core
//! record set, keeps the emotional sample log, and answers recall queries.
//!
//! Writes are append-only and persisted as a full set after each append.
//! Lock order is entity then kv: the record or sample lock is held until
//! its write reaches the store. Recall never holds a lock across an
//! embedding call.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use nova_core::{
    EmotionalContext, EmotionalLog, EmotionalSample, EmotionalSummary, MemoryBank, MemoryRecord,
    Mood, RetentionPolicy, ScoredRecord,
};
use nova_store::KvStore;
use nova_store::state;

use crate::error::Result;
use crate::provider::EmbeddingProvider;

pub type SharedKv = Arc<Mutex<Box<dyn KvStore>>>;

pub fn shared_kv(store: impl KvStore + 'static) -> SharedKv {
    Arc::new(Mutex::new(Box::new(store)))
}

pub struct MemoryStore {
    bank: RwLock<MemoryBank>,
    log: RwLock<EmotionalLog>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    kv: SharedKv,
}

impl MemoryStore {
    pub fn new(
        kv: SharedKv,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            bank: RwLock::new(MemoryBank::new(retention)),
            log: RwLock::new(EmotionalLog::new()),
            embedder,
            kv,
        }
    }

    /// Load persisted records and samples. Failures are logged and leave the
    /// corresponding set empty. Returns the number of records loaded.
    pub async fn initialize(&self) -> usize {
        let (records, samples) = {
            let kv = self.kv.lock().await;
            let records = state::load_memories(&**kv).unwrap_or_else(|e| {
                tracing::error!("failed to load memories, starting empty: {e}");
                Vec::new()
            });
            let samples = state::load_emotional_log(&**kv).unwrap_or_else(|e| {
                tracing::error!("failed to load emotional log, starting empty: {e}");
                Vec::new()
            });
            (records, samples)
        };

        let count = records.len();
        let mut bank = self.bank.write().await;
        let retention = bank.retention();
        *bank = MemoryBank::from_records(records, retention);
        drop(bank);
        *self.log.write().await = EmotionalLog::from_samples(samples);

        tracing::info!(memories = count, "memory store initialized");
        count
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("embedding failed: {e}");
                None
            }
        }
    }

    /// Append an exchange and persist the full set. The record is kept even
    /// when embedding or persistence fails.
    pub async fn store(
        &self,
        input: &str,
        response: &str,
        context: &EmotionalContext,
        now: u64,
    ) -> MemoryRecord {
        let embedding = self.embed(&MemoryRecord::embedding_text(input, response)).await;
        let record = MemoryRecord::new(input, response, context, embedding, now);

        {
            let mut bank = self.bank.write().await;
            let evicted = bank.push(record.clone());
            if evicted > 0 {
                tracing::debug!(evicted, "retention evicted memories");
            }
            if let Err(e) = self.persist_records(bank.records()).await {
                tracing::error!(id = %record.id, "failed to persist memories: {e}");
            }
        }
        tracing::debug!(id = %record.id, embedded = record.embedding.is_some(), "memory stored");
        record
    }

    /// Up to `limit` records ranked by similarity to `query`. Empty when the
    /// store is empty or the query cannot be embedded.
    pub async fn recall(&self, query: &str, limit: usize) -> Vec<ScoredRecord> {
        if self.bank.read().await.is_empty() {
            return Vec::new();
        }
        let Some(query_vec) = self.embed(query).await else {
            return Vec::new();
        };
        self.bank.read().await.rank(&query_vec, limit)
    }

    /// Append an emotional sample and persist the log.
    pub async fn track(&self, input: &str, mood: Mood, now: u64) -> EmotionalSample {
        let mut log = self.log.write().await;
        let sample = log.track(input, mood, now).clone();
        let mut kv = self.kv.lock().await;
        if let Err(e) = state::save_emotional_log(&mut **kv, log.samples()) {
            tracing::error!("failed to persist emotional log: {e}");
        }
        sample
    }

    pub async fn emotional_summary(&self) -> Option<EmotionalSummary> {
        self.log.read().await.summary()
    }

    pub async fn len(&self) -> usize {
        self.bank.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bank.read().await.is_empty()
    }

    pub async fn records(&self) -> Vec<MemoryRecord> {
        self.bank.read().await.records().to_vec()
    }

    async fn persist_records(&self, records: &[MemoryRecord]) -> Result<()> {
        let mut kv = self.kv.lock().await;
        state::save_memories(&mut **kv, records)?;
        Ok(())
    }

    /// Write both sets out again.
    pub async fn flush(&self) -> Result<()> {
        let bank = self.bank.read().await;
        let log = self.log.read().await;
        let mut kv = self.kv.lock().await;
        state::save_memories(&mut **kv, bank.records())?;
        state::save_emotional_log(&mut **kv, log.samples())?;
        Ok(())
    }
}
