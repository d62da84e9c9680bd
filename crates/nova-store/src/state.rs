//! Typed JSON persistence of engine state under fixed namespaced keys.

use serde::Serialize;
use serde::de::DeserializeOwned;

use nova_core::desire::Desire;
use nova_core::emotion::EmotionalSample;
use nova_core::memory::MemoryRecord;
use nova_core::profile::UserProfile;
use nova_core::self_state::SelfModelSnapshot;

use crate::error::{Result, StoreError};
use crate::store::KvStore;

pub const MEMORIES_KEY: &str = "nova.memories";
pub const EMOTIONAL_LOG_KEY: &str = "nova.emotional_log";
pub const DESIRES_KEY: &str = "nova.desires";
pub const SELF_MODEL_KEY: &str = "nova.self_model";
pub const USER_PROFILE_KEY: &str = "nova.user_profile";

/// Decode the JSON value stored under `key`. A missing key is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .map_err(|e| StoreError::InvalidData(format!("{key}: {e}")))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Replace the value under `key` with the JSON encoding of `value`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn KvStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.put(key, &raw)
}

// --- Per-entity helpers ---

pub fn load_memories(store: &dyn KvStore) -> Result<Vec<MemoryRecord>> {
    Ok(load_json(store, MEMORIES_KEY)?.unwrap_or_default())
}

pub fn save_memories(store: &mut dyn KvStore, records: &[MemoryRecord]) -> Result<()> {
    save_json(store, MEMORIES_KEY, records)
}

pub fn load_emotional_log(store: &dyn KvStore) -> Result<Vec<EmotionalSample>> {
    Ok(load_json(store, EMOTIONAL_LOG_KEY)?.unwrap_or_default())
}

pub fn save_emotional_log(store: &mut dyn KvStore, samples: &[EmotionalSample]) -> Result<()> {
    save_json(store, EMOTIONAL_LOG_KEY, samples)
}

/// Persisted desires. An empty array counts as absent.
pub fn load_desires(store: &dyn KvStore) -> Result<Option<Vec<Desire>>> {
    let desires: Option<Vec<Desire>> = load_json(store, DESIRES_KEY)?;
    Ok(desires.filter(|d| !d.is_empty()))
}

pub fn save_desires(store: &mut dyn KvStore, desires: &[Desire]) -> Result<()> {
    save_json(store, DESIRES_KEY, desires)
}

pub fn load_self_model(store: &dyn KvStore) -> Result<Option<SelfModelSnapshot>> {
    load_json(store, SELF_MODEL_KEY)
}

pub fn save_self_model(store: &mut dyn KvStore, snapshot: &SelfModelSnapshot) -> Result<()> {
    save_json(store, SELF_MODEL_KEY, snapshot)
}

pub fn load_user_profile(store: &dyn KvStore) -> Result<Option<UserProfile>> {
    load_json(store, USER_PROFILE_KEY)
}

pub fn save_user_profile(store: &mut dyn KvStore, profile: &UserProfile) -> Result<()> {
    save_json(store, USER_PROFILE_KEY, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKv;
    use nova_core::EmotionalContext;
    use nova_core::desire::default_desires;

    #[test]
    fn test_missing_keys_are_defaults() {
        let store = MemoryKv::new();
        assert!(load_memories(&store).unwrap().is_empty());
        assert!(load_emotional_log(&store).unwrap().is_empty());
        assert!(load_desires(&store).unwrap().is_none());
        assert!(load_self_model(&store).unwrap().is_none());
        assert!(load_user_profile(&store).unwrap().is_none());
    }

    #[test]
    fn test_user_profile_persists_recorded_mood() {
        let mut store = MemoryKv::new();
        let mut profile = UserProfile::from_json(r#"{"user": {"name": "Sam"}}"#).unwrap();
        profile.record_mood(nova_core::Mood::Flow, 0);
        save_user_profile(&mut store, &profile).unwrap();

        let raw = store.get(USER_PROFILE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"current_mood\":\"flow\""));
        assert_eq!(load_user_profile(&store).unwrap(), Some(profile));
    }

    #[test]
    fn test_memories_persist_with_camel_case_fields() {
        let mut store = MemoryKv::new();
        let record = MemoryRecord::new("hi", "hello", &EmotionalContext::default(), None, 5);
        save_memories(&mut store, std::slice::from_ref(&record)).unwrap();

        let raw = store.get(MEMORIES_KEY).unwrap().unwrap();
        assert!(raw.contains("\"inputText\":\"hi\""));
        assert_eq!(load_memories(&store).unwrap(), vec![record]);
    }

    #[test]
    fn test_empty_desire_array_counts_as_absent() {
        let mut store = MemoryKv::new();
        save_desires(&mut store, &[]).unwrap();
        assert!(load_desires(&store).unwrap().is_none());

        save_desires(&mut store, &default_desires(0)).unwrap();
        assert_eq!(load_desires(&store).unwrap().unwrap().len(), 6);
    }

    #[test]
    fn test_corrupt_value_is_invalid_data() {
        let mut store = MemoryKv::new();
        store.put(SELF_MODEL_KEY, "{not json").unwrap();
        let err = load_self_model(&store).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(ref m) if m.starts_with(SELF_MODEL_KEY)));
    }
}
