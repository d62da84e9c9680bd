use std::fmt;

use nova_core::CoreError;
use nova_store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// Embedding or completion backend missing, unreachable, or returned garbage.
    ProviderUnavailable(String),
    UnknownAgent(String),
    PersonaNotFound(String),
    RitualNotFound(String),
    /// A document was found but could not be used.
    InvalidDocument(String),
    PersistenceFailure(String),
    Config(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ProviderUnavailable(msg) => write!(f, "provider unavailable: {msg}"),
            EngineError::UnknownAgent(id) => write!(f, "unknown agent: {id}"),
            EngineError::PersonaNotFound(msg) => write!(f, "persona not found: {msg}"),
            EngineError::RitualNotFound(msg) => write!(f, "ritual not found: {msg}"),
            EngineError::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            EngineError::PersistenceFailure(msg) => write!(f, "persistence failure: {msg}"),
            EngineError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::PersistenceFailure(e.to_string())
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownAgent(id) => EngineError::UnknownAgent(id),
            CoreError::InvalidDocument(msg) => EngineError::InvalidDocument(msg),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::ProviderUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
