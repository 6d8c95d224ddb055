//! The document store handle.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::store::durable::{parent_dir, DurableWriter};
use crate::store::error::{StoreError, UpdateError};
use crate::store::recovery::CorruptDocument;
use crate::versioning::{EntityTag, TagCache, Versioned};

type Normalizer<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
type CorruptPolicy<T> = Arc<dyn Fn(&CorruptDocument) -> Option<T> + Send + Sync>;

/// Options for [`DocumentStore::open`].
pub struct StoreOptions<T> {
    default_value: T,
    normalize: Normalizer<T>,
    on_corrupt: Option<CorruptPolicy<T>>,
}

impl<T: 'static> StoreOptions<T> {
    /// Options with `default_value` used when the file does not exist yet.
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            normalize: Arc::new(|value| value),
            on_corrupt: None,
        }
    }

    /// Applied to the loaded value and to every mutation result before it is persisted.
    pub fn normalize<F>(mut self, normalize: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.normalize = Arc::new(normalize);
        self
    }

    /// Called when the file exists but does not decode. Returning `None`
    /// makes `open` fail.
    pub fn on_corrupt<F>(mut self, policy: F) -> Self
    where
        F: Fn(&CorruptDocument) -> Option<T> + Send + Sync + 'static,
    {
        self.on_corrupt = Some(Arc::new(policy));
        self
    }
}

/// A committed state and the generation it belongs to.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub generation: u64,
    pub value: T,
}

struct Committed<T> {
    generation: u64,
    value: T,
}

#[derive(Default)]
struct QueueState {
    closed: bool,
}

struct Inner<T> {
    name: String,
    path: PathBuf,
    state: ArcSwap<Committed<T>>,
    queue: Arc<Mutex<QueueState>>,
    normalize: Normalizer<T>,
    writer: Arc<DurableWriter>,
    tags: TagCache,
}

/// Handle to one JSON document on disk.
///
/// Cloning is cheap; all clones share the same canonical state and
/// mutation queue.
pub struct DocumentStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DocumentStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for DocumentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("path", &self.inner.path)
            .field("generation", &self.inner.state.load().generation)
            .finish()
    }
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Load `path`, creating it from the default value when absent.
    pub async fn open(path: impl Into<PathBuf>, options: StoreOptions<T>) -> Result<Self, StoreError> {
        let path = path.into();
        let StoreOptions {
            default_value,
            normalize,
            on_corrupt,
        } = options;
        let writer = Arc::new(DurableWriter::new());

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => normalize(value),
                Err(err) => {
                    let report = CorruptDocument {
                        path: path.clone(),
                        reason: err.to_string(),
                        byte_len: bytes.len(),
                    };
                    recover(&path, &writer, &normalize, on_corrupt.as_deref(), report).await?
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let dir = parent_dir(&path);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| StoreError::io("create directory", &dir, e))?;
                let value = normalize(default_value);
                persist(&writer, &path, &value).await?;
                tracing::info!(path = %path.display(), "Created document");
                value
            }
            Err(err) => return Err(StoreError::io("read", &path, err)),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!(store = %name, path = %path.display(), "Document store ready");

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                path,
                state: ArcSwap::from_pointee(Committed {
                    generation: 0,
                    value: initial,
                }),
                queue: Arc::new(Mutex::new(QueueState::default())),
                normalize,
                writer,
                tags: TagCache::new(),
            }),
        })
    }

    /// Owned deep copy of the last committed state.
    pub fn snapshot(&self) -> T {
        self.inner.state.load().value.clone()
    }

    /// Like [`snapshot`](Self::snapshot), with the commit generation.
    pub fn snapshot_versioned(&self) -> Snapshot<T> {
        let committed = self.inner.state.load();
        Snapshot {
            generation: committed.generation,
            value: committed.value.clone(),
        }
    }

    /// Number of commits since open.
    pub fn generation(&self) -> u64 {
        self.inner.state.load().generation
    }

    /// Entity tag of `resource` as found in the snapshot of `generation`,
    /// memoized under `key` until the next commit.
    pub fn tag_for<V: Versioned>(&self, generation: u64, key: &str, resource: &V) -> EntityTag {
        self.inner
            .tags
            .get_or_compute(generation, key, || resource.entity_tag())
    }

    /// Apply `mutator` to a private copy of the current state and commit the
    /// result once it is durable.
    ///
    /// Mutations run one at a time in the order their calls reached the
    /// queue. `Err` from the mutator aborts without writing. A write failure
    /// leaves the canonical state untouched; later mutations still run.
    pub async fn update<R, E, F>(&self, mutator: F) -> Result<R, UpdateError<E>>
    where
        F: FnOnce(&mut T) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let slot = self.inner.queue.clone().lock_owned().await;
        if slot.closed {
            return Err(StoreError::Closed {
                path: self.inner.path.clone(),
            }
            .into());
        }

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _slot = slot;
            let start = Instant::now();

            let current = inner.state.load_full();
            let mut draft = current.value.clone();
            let output = mutator(&mut draft).map_err(UpdateError::Rejected)?;
            let next = (inner.normalize)(draft);

            if let Err(err) = persist(&inner.writer, &inner.path, &next).await {
                tracing::error!(store = %inner.name, error = %err, "Durable write failed");
                metrics::record_store_write(&inner.name, "error", start);
                return Err(err.into());
            }

            let generation = current.generation + 1;
            inner.state.store(Arc::new(Committed {
                generation,
                value: next,
            }));
            inner.tags.invalidate(generation);
            metrics::record_store_write(&inner.name, "ok", start);
            tracing::debug!(store = %inner.name, generation, "Committed");

            Ok::<R, UpdateError<E>>(output)
        });

        match task.await {
            Ok(result) => result,
            Err(join) => Err(StoreError::Interrupted(join.to_string()).into()),
        }
    }

    /// Wait for every queued mutation, then refuse new ones.
    pub async fn close(&self) {
        let mut queue = self.inner.queue.lock().await;
        if !queue.closed {
            queue.closed = true;
            tracing::info!(store = %self.inner.name, "Document store closed");
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

async fn recover<T>(
    path: &Path,
    writer: &Arc<DurableWriter>,
    normalize: &Normalizer<T>,
    policy: Option<&(dyn Fn(&CorruptDocument) -> Option<T> + Send + Sync)>,
    report: CorruptDocument,
) -> Result<T, StoreError>
where
    T: Serialize + 'static,
{
    tracing::error!(path = %path.display(), reason = %report.reason, "Document failed to parse");

    let replacement = policy.and_then(|policy| policy(&report));
    let Some(replacement) = replacement else {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: report.reason,
        });
    };

    let backup = corrupt_backup_path(path);
    tokio::fs::rename(path, &backup)
        .await
        .map_err(|e| StoreError::io("preserve corrupt document", path, e))?;
    tracing::warn!(backup = %backup.display(), "Corrupt document preserved");

    let value = normalize(replacement);
    persist(writer, path, &value).await?;
    Ok(value)
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".corrupt-{}", millis));
    path.with_file_name(name)
}

async fn persist<T: Serialize>(
    writer: &Arc<DurableWriter>,
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let writer = writer.clone();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || writer.write_atomic(&path, &bytes))
        .await
        .map_err(|e| StoreError::Interrupted(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::collection::{Collection, Identified};
    use crate::store::recovery::start_fresh;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        text: String,
    }

    impl Identified for Note {
        fn id(&self) -> u64 {
            self.id
        }
    }

    fn notes_options() -> StoreOptions<Collection<Note>> {
        StoreOptions::new(Collection::default()).normalize(Collection::normalized)
    }

    fn read_disk<T: DeserializeOwned>(path: &Path) -> T {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.json");

        let store = DocumentStore::open(&path, notes_options()).await.unwrap();

        assert!(path.exists());
        let on_disk: Collection<Note> = read_disk(&path);
        assert_eq!(on_disk, Collection::default());
        assert_eq!(store.generation(), 0);
        assert_eq!(store.name(), "notes.json");
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("v.json"), StoreOptions::new(vec![1u32]))
            .await
            .unwrap();

        let mut copy = store.snapshot();
        copy.push(2);

        assert_eq!(store.snapshot(), vec![1]);
    }

    #[tokio::test]
    async fn test_update_persists_then_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = DocumentStore::open(&path, notes_options()).await.unwrap();

        let id = store
            .update(|doc: &mut Collection<Note>| {
                Ok::<_, ()>(doc.insert_with(|id| Note { id, text: "hello".into() }).id)
            })
            .await
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(store.generation(), 1);
        let on_disk: Collection<Note> = read_disk(&path);
        assert_eq!(on_disk, store.snapshot());

        let reopened = DocumentStore::open(&path, notes_options()).await.unwrap();
        assert_eq!(reopened.snapshot().find(1).unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_rejected_mutation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = DocumentStore::open(&path, notes_options()).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = store
            .update(|doc: &mut Collection<Note>| {
                doc.insert_with(|id| Note { id, text: "draft".into() });
                Err::<(), _>("nope")
            })
            .await;

        assert!(matches!(result, Err(UpdateError::Rejected("nope"))));
        assert!(store.snapshot().is_empty());
        assert_eq!(store.generation(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = DocumentStore::open(&path, notes_options()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(move |doc: &mut Collection<Note>| {
                        Ok::<_, ()>(doc.insert_with(|id| Note { id, text: format!("n{}", i) }).id)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let on_disk: Collection<Note> = read_disk(&path);
        let mut ids: Vec<u64> = on_disk.items.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(on_disk.next_id, 11);
        assert_eq!(store.generation(), 10);
    }

    #[tokio::test]
    async fn test_mutations_apply_in_queue_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        let store = DocumentStore::open(&path, StoreOptions::new(Vec::<u32>::new()))
            .await
            .unwrap();

        let push = |n: u32| {
            let store = store.clone();
            async move {
                store
                    .update(move |v: &mut Vec<u32>| {
                        v.push(n);
                        Ok::<_, ()>(())
                    })
                    .await
            }
        };

        let (a, b, c, d) = tokio::join!(push(1), push(2), push(3), push(4));
        assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());

        assert_eq!(store.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(read_disk::<Vec<u32>>(&path), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_state_and_queue_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = DocumentStore::open(&path, notes_options()).await.unwrap();

        // Replace the target with a non-empty directory so the rename fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("blocker"), b"x").unwrap();

        let failed = store
            .update(|doc: &mut Collection<Note>| {
                Ok::<_, ()>(doc.insert_with(|id| Note { id, text: "lost".into() }).id)
            })
            .await;
        assert!(matches!(failed, Err(UpdateError::Store(StoreError::Io { .. }))));
        assert!(store.snapshot().is_empty());
        assert_eq!(store.generation(), 0);

        std::fs::remove_dir_all(&path).unwrap();

        let id = store
            .update(|doc: &mut Collection<Note>| {
                Ok::<_, ()>(doc.insert_with(|id| Note { id, text: "kept".into() }).id)
            })
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(read_disk::<Collection<Note>>(&path).len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_without_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = DocumentStore::open(&path, notes_options()).await.unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
    }

    #[tokio::test]
    async fn test_corrupt_document_recovered_by_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, b"[truncated").unwrap();

        let store = DocumentStore::open(
            &path,
            notes_options().on_corrupt(start_fresh(Collection::default())),
        )
        .await
        .unwrap();

        assert!(store.snapshot().is_empty());
        assert_eq!(read_disk::<Collection<Note>>(&path), Collection::default());

        let preserved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("notes.json.corrupt-"))
            .collect();
        assert_eq!(preserved.len(), 1);
        assert_eq!(
            std::fs::read(dir.path().join(&preserved[0])).unwrap(),
            b"[truncated"
        );
    }

    #[tokio::test]
    async fn test_leftover_temp_file_does_not_affect_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        {
            let store = DocumentStore::open(&path, notes_options()).await.unwrap();
            store
                .update(|doc: &mut Collection<Note>| {
                    Ok::<_, ()>(doc.insert_with(|id| Note { id, text: "safe".into() }).id)
                })
                .await
                .unwrap();
        }
        // A crash between temp write and rename leaves a half-written temp file.
        std::fs::write(dir.path().join(".notes.json.1.2.tmp"), b"{\"nextId\":").unwrap();

        let store = DocumentStore::open(&path, notes_options()).await.unwrap();
        assert_eq!(store.snapshot().find(1).unwrap().text, "safe");
    }

    #[tokio::test]
    async fn test_close_drains_then_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("v.json"), StoreOptions::new(0u32))
            .await
            .unwrap();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(|n: &mut u32| {
                        *n += 1;
                        Ok::<_, ()>(())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        pending.await.unwrap().unwrap();
        store.close().await;

        let after = store
            .update(|n: &mut u32| {
                *n += 1;
                Ok::<_, ()>(())
            })
            .await;
        assert!(matches!(after, Err(UpdateError::Store(StoreError::Closed { .. }))));
        assert_eq!(store.snapshot(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_not_blocked_by_pending_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("v.json"), StoreOptions::new(0u32))
            .await
            .unwrap();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(move |n: &mut u32| {
                        release_rx.recv().ok();
                        *n = 42;
                        Ok::<_, ()>(())
                    })
                    .await
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.snapshot(), 0);

        release_tx.send(()).unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(store.snapshot(), 42);
    }

    #[tokio::test]
    async fn test_tag_cache_invalidated_on_commit() {
        use crate::versioning::Versioned;
        use serde_json::{json, Value};

        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Doc {
            title: String,
        }
        impl Versioned for Doc {
            fn tag_fields(&self) -> Value {
                json!({ "title": self.title })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(
            dir.path().join("d.json"),
            StoreOptions::new(Doc { title: "a".into() }),
        )
        .await
        .unwrap();

        let snap = store.snapshot_versioned();
        let first = store.tag_for(snap.generation, "doc", &snap.value);

        store
            .update(|d: &mut Doc| {
                d.title = "b".into();
                Ok::<_, ()>(())
            })
            .await
            .unwrap();

        let snap = store.snapshot_versioned();
        let second = store.tag_for(snap.generation, "doc", &snap.value);
        assert_ne!(first, second);
        assert_eq!(second, snap.value.entity_tag());
    }
}
