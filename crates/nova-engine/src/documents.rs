//! Persona, ritual and identity document sources.
//!
//! On disk the layout is:
//! - `<root>/modes/<persona>.json`
//! - `<root>/rituals/<ritual>.json`
//! - `<root>/identity/userProfile.json` and `<root>/identity/assistantPersona.json`
//!
//! Identity documents are optional: a missing file is `Ok(None)`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use nova_core::{
    AssistantProfile, PersonaDocument, PersonaId, RitualDocument, RitualKind, UserProfile,
};

use crate::error::{EngineError, Result};

const USER_PROFILE_FILE: &str = "userProfile.json";
const ASSISTANT_PROFILE_FILE: &str = "assistantPersona.json";

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn persona(&self, id: PersonaId) -> Result<PersonaDocument>;
    async fn ritual(&self, kind: RitualKind) -> Result<RitualDocument>;

    async fn user_profile(&self) -> Result<Option<UserProfile>> {
        Ok(None)
    }

    async fn assistant_profile(&self) -> Result<Option<AssistantProfile>> {
        Ok(None)
    }
}

pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn persona_path(&self, id: PersonaId) -> PathBuf {
        self.root.join("modes").join(format!("{id}.json"))
    }

    pub fn ritual_path(&self, kind: RitualKind) -> PathBuf {
        self.root.join("rituals").join(format!("{kind}.json"))
    }

    pub fn user_profile_path(&self) -> PathBuf {
        self.root.join("identity").join(USER_PROFILE_FILE)
    }

    pub fn assistant_profile_path(&self) -> PathBuf {
        self.root.join("identity").join(ASSISTANT_PROFILE_FILE)
    }
}

/// Contents of an optional file. Only "not found" maps to `None`.
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::InvalidDocument(format!("{}: {e}", path.display()))),
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn persona(&self, id: PersonaId) -> Result<PersonaDocument> {
        let path = self.persona_path(id);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            EngineError::PersonaNotFound(format!("{id} ({}): {e}", path.display()))
        })?;
        PersonaDocument::from_json(&raw)
            .map_err(|e| EngineError::InvalidDocument(format!("persona {id}: {e}")))
    }

    async fn ritual(&self, kind: RitualKind) -> Result<RitualDocument> {
        let path = self.ritual_path(kind);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            EngineError::RitualNotFound(format!("{kind} ({}): {e}", path.display()))
        })?;
        RitualDocument::from_json(&raw)
            .map_err(|e| EngineError::InvalidDocument(format!("ritual {kind}: {e}")))
    }

    async fn user_profile(&self) -> Result<Option<UserProfile>> {
        match read_optional(&self.user_profile_path()).await? {
            Some(raw) => Ok(Some(UserProfile::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    async fn assistant_profile(&self) -> Result<Option<AssistantProfile>> {
        match read_optional(&self.assistant_profile_path()).await? {
            Some(raw) => Ok(Some(AssistantProfile::from_json(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Documents held in memory, for tests and embedded hosts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocuments {
    personas: HashMap<PersonaId, PersonaDocument>,
    rituals: HashMap<RitualKind, RitualDocument>,
    user_profile: Option<UserProfile>,
    assistant_profile: Option<AssistantProfile>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persona(mut self, id: PersonaId, doc: PersonaDocument) -> Self {
        self.personas.insert(id, doc);
        self
    }

    pub fn with_ritual(mut self, kind: RitualKind, doc: RitualDocument) -> Self {
        self.rituals.insert(kind, doc);
        self
    }

    pub fn with_user_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    pub fn with_assistant_profile(mut self, profile: AssistantProfile) -> Self {
        self.assistant_profile = Some(profile);
        self
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocuments {
    async fn persona(&self, id: PersonaId) -> Result<PersonaDocument> {
        self.personas
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::PersonaNotFound(id.to_string()))
    }

    async fn ritual(&self, kind: RitualKind) -> Result<RitualDocument> {
        self.rituals
            .get(&kind)
            .cloned()
            .ok_or_else(|| EngineError::RitualNotFound(kind.to_string()))
    }

    async fn user_profile(&self) -> Result<Option<UserProfile>> {
        Ok(self.user_profile.clone())
    }

    async fn assistant_profile(&self) -> Result<Option<AssistantProfile>> {
        Ok(self.assistant_profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_source_reads_layout() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        std::fs::create_dir_all(dir.path().join("modes")).unwrap();
        std::fs::create_dir_all(dir.path().join("rituals")).unwrap();
        std::fs::write(
            source.persona_path(PersonaId::Coach),
            r#"{"name":"Coach","system_prompt":"Push gently."}"#,
        )
        .unwrap();
        std::fs::write(
            source.ritual_path(RitualKind::FocusStart),
            r#"{"name":"Focus","sequence":[{"action":"voice_message","content":"Let's go"}]}"#,
        )
        .unwrap();

        assert_eq!(source.persona(PersonaId::Coach).await.unwrap().name, "Coach");
        assert_eq!(source.ritual(RitualKind::FocusStart).await.unwrap().sequence.len(), 1);
        assert!(source.ritual_path(RitualKind::FocusStart).ends_with("rituals/focus_start.json"));
    }

    #[tokio::test]
    async fn test_fs_source_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        assert!(matches!(
            source.persona(PersonaId::Soft).await,
            Err(EngineError::PersonaNotFound(_))
        ));
        assert!(matches!(
            source.ritual(RitualKind::Victory).await,
            Err(EngineError::RitualNotFound(_))
        ));

        std::fs::create_dir_all(dir.path().join("rituals")).unwrap();
        std::fs::write(
            source.ritual_path(RitualKind::Victory),
            r#"{"name":"Victory","sequence":[{"action":"fireworks"}]}"#,
        )
        .unwrap();
        let err = source.ritual(RitualKind::Victory).await.unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidDocument(ref m) if m.starts_with("ritual victory"))
        );
    }

    #[tokio::test]
    async fn test_fs_identity_documents_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        assert_eq!(source.user_profile().await.unwrap(), None);
        assert_eq!(source.assistant_profile().await.unwrap(), None);

        std::fs::create_dir_all(dir.path().join("identity")).unwrap();
        std::fs::write(
            source.user_profile_path(),
            r#"{"user":{"name":"Sam","emotional_state":{"current_mood":"neutral"}}}"#,
        )
        .unwrap();
        std::fs::write(source.assistant_profile_path(), r#"{"current_mode":"gremlin"}"#).unwrap();

        let profile = source.user_profile().await.unwrap().unwrap();
        assert_eq!(profile.name(), "Sam");
        let assistant = source.assistant_profile().await.unwrap().unwrap();
        assert_eq!(assistant.starting_persona(), Some(PersonaId::Gremlin));
    }

    #[tokio::test]
    async fn test_fs_invalid_user_profile_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        std::fs::create_dir_all(dir.path().join("identity")).unwrap();
        std::fs::write(source.user_profile_path(), r#"{"user":{}}"#).unwrap();
        assert!(matches!(source.user_profile().await, Err(EngineError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let docs = InMemoryDocuments::new().with_persona(
            PersonaId::Guide,
            PersonaDocument {
                name: "Guide".to_string(),
                system_prompt: "Be calm.".to_string(),
                response_style: None,
            },
        );
        assert!(docs.persona(PersonaId::Guide).await.is_ok());
        assert!(docs.persona(PersonaId::Gremlin).await.is_err());
        assert!(docs.ritual(RitualKind::Burnout).await.is_err());
        assert_eq!(docs.user_profile().await.unwrap(), None);
    }
}
