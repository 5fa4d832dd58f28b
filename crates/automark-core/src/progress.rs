//! Durable per-user completion records.
//!
//! # Record Layout
//!
//! ```text
//! users/user_progress/{user}.json   # {"matmul": true, "sigmoid": false}
//! ```
//!
//! A key that is absent means "not attempted", `false` means "attempted" and
//! `true` means "completed". Records only move forward: `true` is never
//! rewritten. Each write replaces the whole record, so every read-modify-write
//! runs under that user's lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GradeError, GradeResult};

/// Assignment name → completed flag.
pub type ProgressRecord = BTreeMap<String, bool>;

/// State of one (user, assignment) pair as shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressState {
    #[serde(rename = "not attempted")]
    NotAttempted,
    #[serde(rename = "attempted")]
    Attempted,
    #[serde(rename = "completed")]
    Completed,
}

impl ProgressState {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Self::NotAttempted,
            Some(false) => Self::Attempted,
            Some(true) => Self::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not attempted",
            Self::Attempted => "attempted",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence for progress records.
pub trait ProgressBackend: Send + Sync + fmt::Debug {
    /// Load a user's record; a user with no stored record has an empty one.
    fn load(&self, user: &str) -> GradeResult<ProgressRecord>;

    /// Replace a user's record as a whole.
    fn save(&self, user: &str, record: &ProgressRecord) -> GradeResult<()>;
}

/// One JSON file per user, replaced atomically via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileProgressBackend {
    dir: PathBuf,
}

impl FileProgressBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{}.json", user))
    }
}

impl ProgressBackend for FileProgressBackend {
    fn load(&self, user: &str) -> GradeResult<ProgressRecord> {
        let path = self.record_path(user);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressRecord::new())
            }
            Err(e) => {
                return Err(GradeError::storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            GradeError::storage(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    fn save(&self, user: &str, record: &ProgressRecord) -> GradeResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            GradeError::storage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.record_path(user);
        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(record)
            .map_err(|e| GradeError::storage(format!("failed to encode progress: {}", e)))?;

        std::fs::write(&temp_path, bytes)
            .map_err(|e| GradeError::storage(format!("failed to write temp file: {}", e)))?;
        std::fs::rename(&temp_path, &path)
            .map_err(|e| GradeError::storage(format!("failed to rename temp file: {}", e)))?;
        Ok(())
    }
}

/// In-memory backend that counts writes.
#[derive(Debug, Default)]
pub struct MemoryProgressBackend {
    records: Mutex<HashMap<String, ProgressRecord>>,
    saves: AtomicUsize,
}

impl MemoryProgressBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ProgressBackend for MemoryProgressBackend {
    fn load(&self, user: &str) -> GradeResult<ProgressRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(user).cloned().unwrap_or_default())
    }

    fn save(&self, user: &str, record: &ProgressRecord) -> GradeResult<()> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(user.to_string(), record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory view of every registered user's record, written through to a
/// backend.
#[derive(Debug)]
pub struct ProgressStore {
    backend: Arc<dyn ProgressBackend>,
    records: HashMap<String, Mutex<ProgressRecord>>,
}

impl ProgressStore {
    /// Load the records of `users` from `backend`.
    pub fn open<I, S>(backend: Arc<dyn ProgressBackend>, users: I) -> GradeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut records = HashMap::new();
        for user in users {
            let user = user.into();
            let record = backend.load(&user)?;
            records.insert(user, Mutex::new(record));
        }
        debug!(users = records.len(), "opened progress store");
        Ok(Self { backend, records })
    }

    pub fn get(&self, user: &str) -> GradeResult<ProgressRecord> {
        let record = self.slot(user)?;
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record.clone())
    }

    pub fn state(&self, user: &str, assignment: &str) -> GradeResult<ProgressState> {
        let record = self.slot(user)?;
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ProgressState::from_flag(record.get(assignment).copied()))
    }

    /// Tri-state view for each of `assignments`.
    pub fn states<'a, I>(
        &self,
        user: &str,
        assignments: I,
    ) -> GradeResult<BTreeMap<String, ProgressState>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let record = self.get(user)?;
        Ok(assignments
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    ProgressState::from_flag(record.get(name).copied()),
                )
            })
            .collect())
    }

    /// Create a `false` entry if the pair has none. Returns whether it wrote.
    pub fn record_attempt(&self, user: &str, assignment: &str) -> GradeResult<bool> {
        let wrote = self.update(user, |record| {
            if record.contains_key(assignment) {
                return false;
            }
            record.insert(assignment.to_string(), false);
            true
        })?;
        if wrote {
            debug!(user, assignment, "first attempt recorded");
        }
        Ok(wrote)
    }

    /// Mark the pair completed unless it already is. Returns whether it wrote.
    pub fn record_completion(&self, user: &str, assignment: &str) -> GradeResult<bool> {
        let wrote = self.update(user, |record| {
            if record.get(assignment) == Some(&true) {
                return false;
            }
            record.insert(assignment.to_string(), true);
            true
        })?;
        if wrote {
            info!(user, assignment, "assignment completed");
        }
        Ok(wrote)
    }

    /// Monotonic setter: `true` completes, `false` only records an attempt.
    pub fn set(&self, user: &str, assignment: &str, completed: bool) -> GradeResult<bool> {
        if completed {
            self.record_completion(user, assignment)
        } else {
            self.record_attempt(user, assignment)
        }
    }

    fn update<F>(&self, user: &str, change: F) -> GradeResult<bool>
    where
        F: FnOnce(&mut ProgressRecord) -> bool,
    {
        let slot = self.slot(user)?;
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        // Persist first so a failed write leaves the in-memory view untouched.
        self.backend.save(user, &next)?;
        *current = next;
        Ok(true)
    }

    fn slot(&self, user: &str) -> GradeResult<&Mutex<ProgressRecord>> {
        self.records
            .get(user)
            .ok_or_else(|| GradeError::UnknownUser {
                user: user.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> (ProgressStore, Arc<MemoryProgressBackend>) {
        let backend = Arc::new(MemoryProgressBackend::new());
        let store = ProgressStore::open(backend.clone(), ["alice", "bob"]).unwrap();
        (store, backend)
    }

    #[test]
    fn tri_state_follows_attempt_then_completion() {
        let (store, _) = memory_store();
        assert_eq!(
            store.state("alice", "matmul").unwrap(),
            ProgressState::NotAttempted
        );

        assert!(store.record_attempt("alice", "matmul").unwrap());
        assert_eq!(
            store.state("alice", "matmul").unwrap(),
            ProgressState::Attempted
        );

        assert!(store.record_completion("alice", "matmul").unwrap());
        assert_eq!(
            store.state("alice", "matmul").unwrap(),
            ProgressState::Completed
        );
    }

    #[test]
    fn completed_never_reverts_or_rewrites() {
        let (store, backend) = memory_store();
        store.record_completion("alice", "matmul").unwrap();
        let saves = backend.save_count();

        assert!(!store.set("alice", "matmul", false).unwrap());
        assert!(!store.record_completion("alice", "matmul").unwrap());
        assert_eq!(backend.save_count(), saves);
        assert_eq!(
            store.state("alice", "matmul").unwrap(),
            ProgressState::Completed
        );
    }

    #[test]
    fn unknown_user_is_rejected() {
        let (store, _) = memory_store();
        assert!(matches!(
            store.record_attempt("ghost", "matmul"),
            Err(GradeError::UnknownUser { .. })
        ));
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn ProgressBackend> = Arc::new(FileProgressBackend::new(dir.path()));

        let store = ProgressStore::open(backend.clone(), ["alice"]).unwrap();
        store.record_attempt("alice", "sigmoid").unwrap();
        store.record_completion("alice", "matmul").unwrap();
        drop(store);

        let reopened = ProgressStore::open(backend, ["alice"]).unwrap();
        let states = reopened
            .states("alice", ["matmul", "sigmoid", "conv"])
            .unwrap();
        assert_eq!(states["matmul"], ProgressState::Completed);
        assert_eq!(states["sigmoid"], ProgressState::Attempted);
        assert_eq!(states["conv"], ProgressState::NotAttempted);
        assert!(!dir.path().join("alice.json.tmp").exists());
    }

    #[test]
    fn state_labels_match_wire_text() {
        let json = serde_json::to_string(&ProgressState::NotAttempted).unwrap();
        assert_eq!(json, "\"not attempted\"");
        assert_eq!(ProgressState::Completed.to_string(), "completed");
    }
}
