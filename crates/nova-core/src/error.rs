use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A forced route named an agent that is not in the registry.
    UnknownAgent(String),
    /// A persona, ritual or identity document failed shape validation.
    InvalidDocument(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnknownAgent(id) => write!(f, "unknown agent: {id}"),
            CoreError::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InvalidDocument(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
