//! Nova orchestration engine.
//!
//! Wires the pure core to the outside world: embedding and completion
//! providers, persona and ritual documents, ritual effects, persistence
//! through a key-value store, and the background maintenance tickers.

pub mod clock;
pub mod config;
pub mod documents;
pub mod effects;
pub mod error;
pub mod logging;
pub mod memory_store;
pub mod openai;
pub mod orchestrator;
pub mod provider;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use documents::{DocumentSource, FsDocumentSource, InMemoryDocuments};
pub use effects::{LogEffects, RitualEffects};
pub use error::{EngineError, Result};
pub use logging::init_tracing;
pub use memory_store::{MemoryStore, SharedKv, shared_kv};
pub use openai::{Endpoint, OpenAiClient};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, StatusReport, TurnRequest, TurnResponse};
pub use provider::{CompletionProvider, CompletionRequest, EmbeddingProvider, MultimodalPayload};
pub use ticker::{BackgroundTasks, spawn_background};
