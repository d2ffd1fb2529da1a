use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::Mutex;

use crate::core::errors::HistoryError;

use super::{HistoryMessage, HistoryStore};

/// user id -> pairs in insertion order
type HistoryDocument = BTreeMap<String, Vec<HistoryMessage>>;

/// Local history kept as a single pretty-printed JSON document.
///
/// Every mutation is a full read-modify-write. Writers in this process are
/// serialized by an async mutex; other processes are kept out by an
/// exclusive advisory lock on a sibling `.lock` file. The document is
/// replaced atomically through a temp file.
#[derive(Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HistoryError::Storage(format!(
                    "cannot create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against the loaded document on the blocking pool. `f`
    /// returns its result plus whether the document must be written back.
    async fn with_document<R, F>(&self, f: F) -> Result<R, HistoryError>
    where
        F: FnOnce(&mut HistoryDocument) -> (R, bool) + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let lock_file = open_lock_file(&path)?;
            lock_file.lock_exclusive().map_err(HistoryError::storage)?;

            let outcome = load_document(&path).and_then(|mut document| {
                let (result, dirty) = f(&mut document);
                if dirty {
                    save_document(&path, &document)?;
                }
                Ok(result)
            });

            if let Err(err) = lock_file.unlock() {
                tracing::warn!("Failed to release history lock for {}: {}", path.display(), err);
            }
            outcome
        })
        .await
        .map_err(HistoryError::storage)?
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn append(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), HistoryError> {
        let user_id = user_id.to_string();
        let pair = HistoryMessage {
            message: question.to_string(),
            response: answer.to_string(),
        };

        self.with_document(move |document| {
            document.entry(user_id).or_default().push(pair);
            ((), true)
        })
        .await
    }

    async fn read_recent(
        &self,
        user_id: &str,
        n: usize,
    ) -> Result<Vec<HistoryMessage>, HistoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let user_id = user_id.to_string();

        self.with_document(move |document| {
            let recent = document
                .get(&user_id)
                .map(|history| history.iter().rev().take(n).cloned().collect())
                .unwrap_or_default();
            (recent, false)
        })
        .await
    }

    async fn delete_recent(&self, user_id: &str, n: usize) -> Result<usize, HistoryError> {
        if n == 0 {
            return Ok(0);
        }
        let user_id = user_id.to_string();

        self.with_document(move |document| {
            let Some(history) = document.get_mut(&user_id) else {
                return (0, false);
            };
            let removed = n.min(history.len());
            if removed == 0 {
                return (0, false);
            }
            history.truncate(history.len() - removed);
            if history.is_empty() {
                document.remove(&user_id);
            }
            (removed, true)
        })
        .await
    }
}

fn open_lock_file(path: &Path) -> Result<File, HistoryError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path.with_extension("lock"))
        .map_err(|e| HistoryError::Storage(format!("cannot open history lock: {}", e)))
}

fn load_document(path: &Path) -> Result<HistoryDocument, HistoryError> {
    if !path.exists() {
        return Ok(HistoryDocument::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HistoryError::Storage(format!("cannot read {}: {}", path.display(), e))
    })?;
    if contents.trim().is_empty() {
        return Ok(HistoryDocument::new());
    }

    match serde_json::from_str::<HistoryDocument>(&contents) {
        Ok(document) => Ok(document),
        Err(err) => {
            let backup = path.with_extension("json.bak");
            tracing::warn!(
                "History file {} is not valid JSON ({}); starting fresh, previous content kept at {}",
                path.display(),
                err,
                backup.display()
            );
            fs::copy(path, &backup).map_err(HistoryError::storage)?;
            Ok(HistoryDocument::new())
        }
    }
}

fn save_document(path: &Path, document: &HistoryDocument) -> Result<(), HistoryError> {
    let serialized = serde_json::to_string_pretty(document).map_err(HistoryError::storage)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut tmp = File::create(&tmp_path).map_err(|e| {
        HistoryError::Storage(format!("cannot write {}: {}", tmp_path.display(), e))
    })?;
    tmp.write_all(serialized.as_bytes())
        .and_then(|_| tmp.sync_all())
        .map_err(HistoryError::storage)?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| {
        HistoryError::Storage(format!("cannot replace {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn store_in(dir: &tempfile::TempDir) -> JsonHistoryStore {
        JsonHistoryStore::new(dir.path().join("silver").join("chat_history.json")).unwrap()
    }

    #[tokio::test]
    async fn appends_keep_call_order_and_read_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for i in 0..5 {
            store
                .append("user_123", &format!("q{}", i), &format!("a{}", i))
                .await
                .unwrap();
        }

        let recent = store.read_recent("user_123", 3).await.unwrap();
        let questions: Vec<&str> = recent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(questions, vec!["q4", "q3", "q2"]);

        let all = store.read_recent("user_123", 50).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.last().unwrap().message, "q0");

        assert!(store.read_recent("user_123", 0).await.unwrap().is_empty());
        assert!(store.read_recent("nobody", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_recent_trims_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for i in 0..4 {
            store.append("u", &format!("q{}", i), "a").await.unwrap();
        }
        store.append("other", "keep", "me").await.unwrap();

        assert_eq!(store.delete_recent("u", 0).await.unwrap(), 0);
        assert_eq!(store.delete_recent("u", 3).await.unwrap(), 3);

        let left = store.read_recent("u", 10).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "q0");

        assert_eq!(store.delete_recent("u", 10).await.unwrap(), 1);
        assert_eq!(store.delete_recent("u", 10).await.unwrap(), 0);
        assert_eq!(store.read_recent("other", 1).await.unwrap().len(), 1);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw.get("u").is_none());
    }

    #[tokio::test]
    async fn non_ascii_round_trips_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let question = "¿Cuánto mide la muralla china? 長城 🧱";
        let answer = "Mide aproximadamente 21.196 km, según la UNESCO.";

        store.append("josé@example.com", question, answer).await.unwrap();

        let recent = store.read_recent("josé@example.com", 1).await.unwrap();
        assert_eq!(recent[0].message.as_bytes(), question.as_bytes());
        assert_eq!(recent[0].response.as_bytes(), answer.as_bytes());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("¿Cuánto mide"));
        assert!(!raw.contains("\\u00bf"));
    }

    #[tokio::test]
    async fn document_shape_maps_user_to_message_response_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append("u1", "hola", "adiós").await.unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({ "u1": [ { "message": "hola", "response": "adiós" } ] })
        );
    }

    #[tokio::test]
    async fn corrupted_file_is_backed_up_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.read_recent("u", 1).await.unwrap().is_empty());
        store.append("u", "q", "a").await.unwrap();

        assert_eq!(store.read_recent("u", 5).await.unwrap().len(), 1);
        let backup = store.path().with_extension("json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let tasks = (0..20).map(|i| {
            let store = store.clone();
            async move { store.append("u", &format!("q{}", i), "a").await }
        });
        for result in futures_util::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(store.read_recent("u", 100).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn unwritable_location_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let err = JsonHistoryStore::new(blocker.join("chat_history.json")).err();
        assert!(matches!(err, Some(HistoryError::Storage(_))));
    }
}
