use std::env;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::store::SqliteStore;

pub const DATA_DIR_ENV: &str = "NOVA_DATA_DIR";
pub const DB_FILE: &str = "nova.db";

/// `$NOVA_DATA_DIR` when set and non-empty, otherwise `~/.nova`.
pub fn default_base_dir() -> PathBuf {
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs_home().join(".nova"),
    }
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

pub fn db_path(base_dir: &Path) -> PathBuf {
    base_dir.join(DB_FILE)
}

/// Create `base_dir` if needed and open the database inside it.
pub fn open_in_dir(base_dir: &Path) -> Result<SqliteStore> {
    std::fs::create_dir_all(base_dir)?;
    SqliteStore::open(&db_path(base_dir))
}
