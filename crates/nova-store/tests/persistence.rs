//! On-disk persistence: engine entities survive closing and reopening the
//! database file.

use nova_core::{DesireLedger, EmotionalContext, EmotionalLog, Interaction, MemoryRecord, Mood, SelfModel, UserReaction};
use nova_store::state::{
    DESIRES_KEY, MEMORIES_KEY, load_desires, load_emotional_log, load_memories, load_self_model,
    save_desires, save_emotional_log, save_memories, save_self_model,
};
use nova_store::{KvStore, SqliteStore, open_in_dir, schema};

const T0: u64 = 1_700_000_000_000;

#[test]
fn entities_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let record = MemoryRecord::new(
        "fix my build",
        "check the linker",
        &EmotionalContext::new(Mood::Frustration, 0.7),
        Some(vec![0.1, 0.2, 0.3]),
        T0,
    );
    let mut log = EmotionalLog::new();
    log.track("this is broken", Mood::Frustration, T0);
    let mut ledger = DesireLedger::new(T0);
    ledger.update(&Interaction::new("that was wrong", ""), T0);
    let mut model = SelfModel::new(T0);
    model.update_emotional_state(
        &Interaction::new("thanks", "any time").with_reaction(UserReaction::Positive),
        T0,
    );

    {
        let mut store = open_in_dir(dir.path()).unwrap();
        save_memories(&mut store, std::slice::from_ref(&record)).unwrap();
        save_emotional_log(&mut store, log.samples()).unwrap();
        save_desires(&mut store, ledger.desires()).unwrap();
        save_self_model(&mut store, &model.snapshot()).unwrap();
    }

    let store = open_in_dir(dir.path()).unwrap();
    assert_eq!(load_memories(&store).unwrap(), vec![record]);
    assert_eq!(load_emotional_log(&store).unwrap(), log.samples().to_vec());
    assert_eq!(load_desires(&store).unwrap().unwrap(), ledger.desires().to_vec());

    let restored = SelfModel::from_snapshot(load_self_model(&store).unwrap().unwrap());
    assert_eq!(restored.state(), model.state());
    assert_eq!(restored.history().count(), 1);

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert!(keys.contains(&MEMORIES_KEY.to_string()));
    assert!(keys.contains(&DESIRES_KEY.to_string()));
}

#[test]
fn reopen_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova.db");
    drop(SqliteStore::open(&path).unwrap());
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(
        schema::get_schema_version(store.conn()).unwrap(),
        Some(schema::SCHEMA_VERSION)
    );
}

#[test]
fn last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_in_dir(dir.path()).unwrap();
    let a = MemoryRecord::new("a", "1", &EmotionalContext::default(), None, T0);
    let b = MemoryRecord::new("b", "2", &EmotionalContext::default(), None, T0 + 1);
    save_memories(&mut store, std::slice::from_ref(&a)).unwrap();
    save_memories(&mut store, &[a.clone(), b.clone()]).unwrap();
    assert_eq!(load_memories(&store).unwrap(), vec![a, b]);
}
