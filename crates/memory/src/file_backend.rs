//! JSON-file session store — the default conversation backend.
//!
//! The whole store is one JSON object mapping session id to its turns:
//!
//! ```json
//! {
//!   "sv-001": [
//!     {"role": "user", "content": "Học phí kỳ này là bao nhiêu?"},
//!     {"role": "assistant", "content": "..."}
//!   ]
//! }
//! ```
//!
//! The file is pretty-printed UTF-8 with non-ASCII text kept as-is, so it
//! stays human-readable. Every mutation rewrites the file through a synced
//! sibling temp file and a rename; a crash mid-write leaves the previous
//! version, and a returned write survives power loss.

use async_trait::async_trait;
use edupolicy_core::error::StoreError;
use edupolicy_core::session::{SessionStore, Turn};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type Sessions = BTreeMap<String, Vec<Turn>>;

/// A file-backed session store.
///
/// Sessions are loaded into memory on open and flushed to disk on every
/// mutation. The write lock is held across the flush, so mutations are
/// serialized and the file always reflects a consistent snapshot.
pub struct JsonFileStore {
    path: PathBuf,
    sessions: Arc<RwLock<Sessions>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty (it is created on first write).
    /// An unreadable or malformed file is an error rather than silently
    /// discarded history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sessions = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), sessions = sessions.len(), "JSON session store loaded");
        Ok(Self {
            path,
            sessions: Arc::new(RwLock::new(sessions)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<Sessions, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Sessions::new()),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read session file {}: {e}",
                    path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Sessions::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StoreError::Storage(format!("Malformed session file {}: {e}", path.display()))
        })
    }

    /// Serialize a snapshot and write it durably off the async runtime.
    async fn flush(&self, sessions: &Sessions) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(sessions)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize sessions: {e}")))?;
        let path = self.path.clone();
        let tmp_path = self.temp_path();

        tokio::task::spawn_blocking(move || write_durably(&path, &tmp_path, content.as_bytes()))
            .await
            .map_err(|e| StoreError::Storage(format!("Session write task failed: {e}")))?
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sessions.json".into());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    /// Apply `mutate` to a copy of the state, persist it, then publish it.
    /// On a failed write the in-memory state is left untouched.
    async fn commit<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Sessions) -> bool,
    {
        let mut sessions = self.sessions.write().await;
        let mut next = sessions.clone();
        if !mutate(&mut next) {
            return Ok(false);
        }
        self.flush(&next).await?;
        *sessions = next;
        Ok(true)
    }
}

/// Replace `path` with `content`: temp file, fsync, rename, then fsync the
/// directory so the rename itself survives power loss.
fn write_durably(path: &Path, tmp_path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Storage(format!("Failed to create session directory: {e}")))?;
    }

    let written = std::fs::File::create(tmp_path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(tmp_path);
        return Err(StoreError::Storage(format!("Failed to write session file: {e}")));
    }

    std::fs::rename(tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(tmp_path);
        StoreError::Storage(format!("Failed to replace session file: {e}"))
    })?;

    #[cfg(unix)]
    {
        let dir = parent.unwrap_or_else(|| Path::new("."));
        std::fs::File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| StoreError::Storage(format!("Failed to sync session directory: {e}")))?;
    }

    Ok(())
}

#[async_trait]
impl SessionStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), StoreError> {
        self.commit(|s| {
            s.entry(session_id.to_string()).or_default().push(turn);
            true
        })
        .await?;
        Ok(())
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> Result<(), StoreError> {
        self.commit(|s| {
            s.entry(session_id.to_string())
                .or_default()
                .extend([user, assistant]);
            true
        })
        .await?;
        Ok(())
    }

    async fn reset(&self, session_id: &str) -> Result<bool, StoreError> {
        self.commit(|s| s.remove(session_id).is_some()).await
    }

    async fn session_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.sessions.read().await.keys().cloned().collect())
    }
}
