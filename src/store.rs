use crate::db_types::{Assistant, Database, PhoneNumber, Record};

use async_trait::async_trait;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Backing source for the record collections.  Every collection operation loads the whole
/// document, changes it in memory and saves the whole document back.  There is no locking, so two
/// interleaved writers can lose each other's updates.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<Database, StoreError>;
    async fn save(&self, db: &Database) -> Result<(), StoreError>;
}

impl<'s> dyn Store + 's {
    pub fn assistants(&self) -> Collection<'_, Assistant> {
        Collection::new(self)
    }

    pub fn phone_numbers(&self) -> Collection<'_, PhoneNumber> {
        Collection::new(self)
    }
}

/// Handle for one collection of a `Store`.
pub struct Collection<'a, R> {
    store: &'a dyn Store,
    kind: PhantomData<R>,
}

impl<'a, R: Record> Collection<'a, R> {
    fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            kind: PhantomData,
        }
    }

    pub async fn get_all(&self) -> Result<Vec<R>, StoreError> {
        let db = self.store.load().await?;
        Ok(R::collection(&db).clone())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<R>, StoreError> {
        let db = self.store.load().await?;
        Ok(R::collection(&db).iter().find(|r| r.id() == id).cloned())
    }

    pub async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let mut db = self.store.load().await?;
        let record = R::from_draft(
            draft,
            Uuid::new_v4().to_string(),
            OffsetDateTime::now_utc(),
        );
        R::collection_mut(&mut db).push(record.clone());
        self.store.save(&db).await?;
        Ok(record)
    }

    pub async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let mut db = self.store.load().await?;
        let updated = match R::collection_mut(&mut db).iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                record.apply(patch);
                record.clone()
            }
            None => return Ok(None),
        };
        self.store.save(&db).await?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut db = self.store.load().await?;
        let records = R::collection_mut(&mut db);
        match records.iter().position(|r| r.id() == id) {
            Some(idx) => {
                records.remove(idx);
                self.store.save(&db).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Production store: one pretty-printed JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh sibling per save; concurrent saves must never share one.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "data.json".into());
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load(&self) -> Result<Database, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path=%self.path.display(), "no data file yet; starting empty");
                return Ok(Database::default());
            }
            Err(e) => {
                error!(error=%e, path=%self.path.display(), "failed to read data file");
                return Err(e.into());
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(error=%e, path=%self.path.display(), "failed to parse data file");
            e.into()
        })
    }

    async fn save(&self, db: &Database) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(db)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // Write a sibling and rename it over the target so readers never see a torn document.
        let tmp = self.tmp_path();
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            error!(error=%e, path=%self.path.display(), "failed to replace data file");
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                debug!(error=%cleanup, tmp=%tmp.display(), "temp file not removed");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Store that never touches the disk.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    db: tokio::sync::Mutex<Database>,
}

#[cfg(test)]
impl MemoryStore {
    pub async fn snapshot(&self) -> Database {
        self.db.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Database, StoreError> {
        Ok(self.db.lock().await.clone())
    }

    async fn save(&self, db: &Database) -> Result<(), StoreError> {
        *self.db.lock().await = db.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_types::{AssistantPatch, NewAssistant, NewPhoneNumber, PhoneNumberPatch};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn draft(name: &str) -> NewAssistant {
        NewAssistant {
            name: name.to_string(),
            first_message: "Hi".to_string(),
            system_prompt: format!("You are {name}"),
            vapi_assistant_id: Some(format!("remote-{name}")),
        }
    }

    fn file_store(dir: &tempfile::TempDir) -> Arc<dyn Store> {
        Arc::new(JsonFileStore::new(dir.path().join("data.json")))
    }

    fn dir_entries(dir: &tempfile::TempDir) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = file_store(&dir);
        assert!(store.assistants().get_all().await.unwrap().is_empty());
        assert!(store.phone_numbers().get_all().await.unwrap().is_empty());
        assert!(!dir.path().join("data.json").exists());
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_and_persists_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = file_store(&dir);
        let mut ids = HashSet::new();
        for name in ["a", "b", "c", "d"] {
            let created = store.assistants().create(draft(name)).await.unwrap();
            assert!(ids.insert(created.id.clone()), "duplicate id {}", created.id);
        }

        let reopened = JsonFileStore::new(dir.path().join("data.json"));
        let db = reopened.load().await.unwrap();
        let names: Vec<_> = db.assistants.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn save_leaves_no_tmp_file_and_writes_both_collections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = file_store(&dir);
        store.assistants().create(draft("a")).await.unwrap();
        assert_eq!(dir_entries(&dir), ["data.json"]);

        let raw = std::fs::read_to_string(dir.path().join("data.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["assistants"].is_array());
        assert!(json["phoneNumbers"].is_array());
        assert!(raw.contains("\n  \"assistants\""), "expected pretty output: {raw}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_never_fail_or_corrupt_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = file_store(&dir);
        for round in 0..10 {
            let tasks: Vec<_> = (0..16)
                .map(|i| {
                    let store = store.clone();
                    // Uneven names give documents of different lengths.
                    let name = "x".repeat(1 + (i * 7 + round) % 40);
                    tokio::spawn(async move { store.assistants().create(draft(&name)).await })
                })
                .collect();
            for task in tasks {
                if let Err(e) = task.await.expect("task panicked") {
                    panic!("round {round}: create failed: {e}");
                }
            }

            let raw = std::fs::read(dir.path().join("data.json")).expect("data file");
            let db: Database = serde_json::from_slice(&raw)
                .unwrap_or_else(|e| panic!("round {round}: data file unreadable: {e}"));
            // Interleaved writers may lose updates, but at least one create per round lands.
            assert!(!db.assistants.is_empty());
            assert_eq!(dir_entries(&dir), ["data.json"]);
        }
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state").join("data.json");
        let store: Arc<dyn Store> = Arc::new(JsonFileStore::new(&path));
        store
            .phone_numbers()
            .create(NewPhoneNumber {
                name: "Line1".to_string(),
                number: None,
                area_code: Some("207".to_string()),
                assistant_id: None,
                vapi_phone_number_id: None,
            })
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_json_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("data.json"), b"{ not json").unwrap();
        let store = file_store(&dir);
        let err = store.assistants().get_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)), "got: {err}");
    }

    #[tokio::test]
    async fn update_merges_and_unknown_id_is_none() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let created = store.assistants().create(draft("a")).await.unwrap();

        let updated = store
            .assistants()
            .update(
                &created.id,
                AssistantPatch {
                    voice_id: Some("v1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("record exists");
        assert_eq!(updated.voice_id.as_deref(), Some("v1"));
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.created_at, created.created_at);

        let missing = store
            .assistants()
            .update("nope", AssistantPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = file_store(&dir);
        let kept = store.assistants().create(draft("keep")).await.unwrap();
        let gone = store.assistants().create(draft("gone")).await.unwrap();

        assert!(store.assistants().delete(&gone.id).await.unwrap());
        assert!(!store.assistants().delete(&gone.id).await.unwrap());
        assert!(!store.assistants().delete("never-existed").await.unwrap());

        let remaining: Vec<_> = store
            .assistants()
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(remaining, vec![kept.id]);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let assistant = store.assistants().create(draft("a")).await.unwrap();
        let phone = store
            .phone_numbers()
            .create(NewPhoneNumber {
                name: "Line1".to_string(),
                number: Some("+12075550100".to_string()),
                area_code: Some("207".to_string()),
                assistant_id: Some(assistant.id.clone()),
                vapi_phone_number_id: Some("remote-p1".to_string()),
            })
            .await
            .unwrap();

        assert!(store.phone_numbers().get_by_id(&assistant.id).await.unwrap().is_none());
        store
            .phone_numbers()
            .update(&phone.id, PhoneNumberPatch { assistant_id: Some(None) })
            .await
            .unwrap();
        let phone = store.phone_numbers().get_by_id(&phone.id).await.unwrap().unwrap();
        assert_eq!(phone.assistant_id, None);
        assert_eq!(store.assistants().get_all().await.unwrap().len(), 1);
    }
}
