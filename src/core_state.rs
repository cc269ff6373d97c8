//! Shared application state.
//!
//! `CoreState` is wrapped in `Arc` at startup and shared by every request
//! handler. Database connections are opened per request; the session store
//! sits behind an `RwLock` (token validation is a write — it can expire
//! entries).

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::auth::SessionStore;
use crate::config;
use crate::db::{self, DatabaseError};

pub struct CoreState {
    /// Directory holding the database (and any future exports).
    pub data_dir: PathBuf,
    db_path: PathBuf,
    sessions: RwLock<SessionStore>,
}

impl CoreState {
    /// Create state pointing at the default data directory.
    pub fn new() -> Self {
        Self::in_dir(config::app_data_dir())
    }

    /// Create state rooted in an explicit directory (tests use a tempdir).
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let db_path = data_dir.join("praxia.db");
        Self {
            data_dir,
            db_path,
            sessions: RwLock::new(SessionStore::new()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a database connection, creating the data directory and schema on
    /// first use.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .map_err(|e| CoreError::DataDir(e.to_string()))?;
        }
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_db_creates_directory_and_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let state = CoreState::in_dir(tmp.path().join("nested"));

        let conn = state.open_db().unwrap();
        assert!(state.data_dir.exists());
        assert!(db::count_tables(&conn).unwrap() > 0);
    }

    #[test]
    fn open_db_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let state = CoreState::in_dir(tmp.path());

        let first = db::count_tables(&state.open_db().unwrap()).unwrap();
        let second = db::count_tables(&state.open_db().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn session_store_is_shared_through_locks() {
        let tmp = tempfile::tempdir().unwrap();
        let state = CoreState::in_dir(tmp.path());

        let user = crate::models::User {
            id: uuid::Uuid::new_v4(),
            username: "drkadiri".to_string(),
            display_name: "Dr. Kadiri".to_string(),
            role: crate::models::enums::UserRole::Admin,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let token = state.write_sessions().unwrap().issue(&user);
        let session = state.write_sessions().unwrap().resolve(&token).unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(state.read_sessions().unwrap().session_count(), 1);
    }

    #[test]
    fn concurrent_reads_do_not_block() {
        use std::sync::Arc;
        use std::thread;

        let tmp = tempfile::tempdir().unwrap();
        let state = Arc::new(CoreState::in_dir(tmp.path()));
        let mut handles = vec![];

        for _ in 0..10 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || {
                let guard = state.read_sessions().unwrap();
                assert_eq!(guard.session_count(), 0);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
