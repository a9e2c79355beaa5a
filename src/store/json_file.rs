use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use futures::{stream, Stream};
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, trace};

use crate::utils::clock::Clock;

use super::KeyValueStore;

pub const STORE_FILE_NAME: &str = "storage.json";

/// The main realization of [KeyValueStore]. The whole store is a single JSON object on disk.
/// Both the host and the dashboard open the same file, so every access is guarded by an
/// advisory file lock.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Store living in the standard file inside an application directory.
    pub fn in_dir(dir: &Path) -> Result<Self, std::io::Error> {
        Self::new(dir.join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e).with_context(|| format!("Opening store {:?}", self.path)),
        };
        let mut file = file;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read.with_context(|| format!("Reading store {:?}", self.path))?;

        parse_store(&contents).with_context(|| format!("Store {:?} is corrupted", self.path))
    }

    /// Read-modify-write under an exclusive lock.
    async fn modify(&self, change: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.path)
            .await
            .with_context(|| format!("Opening store {:?}", self.path))?;

        file.lock_exclusive()?;
        let result = Self::modify_with_file(&mut file, change).await;
        file.unlock_async().await?;
        result
    }

    async fn modify_with_file(
        file: &mut File,
        change: impl FnOnce(&mut Map<String, Value>),
    ) -> Result<()> {
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        let mut entries = parse_store(&contents)?;

        change(&mut entries);

        let buffer = serde_json::to_vec_pretty(&entries)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_data().await?;
        trace!("Wrote {} entries to store", entries.len());
        Ok(())
    }

    /// Stream that yields whenever the store file differs from what it was at the previous
    /// poll. Writes from any process are noticed, including deletion of the file.
    pub fn changes(
        &self,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> impl Stream<Item = ()> {
        let path = self.path.clone();
        let initial = std::fs::read(&path).ok();

        stream::unfold(initial, move |mut last| {
            let path = path.clone();
            let clock = clock.clone();
            async move {
                loop {
                    clock.sleep(poll_interval).await;
                    let current = tokio::fs::read(&path).await.ok();
                    if current != last {
                        debug!("Store {:?} changed", path);
                        last = current;
                        return Some(((), last));
                    }
                }
            }
        })
    }
}

fn parse_store(contents: &str) -> Result<Map<String, Value>> {
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    Ok(serde_json::from_str(contents)?)
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        self.read_all().await
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.modify(move |stored| stored.extend(entries)).await
    }

    async fn clear(&self) -> Result<()> {
        self.modify(|stored| stored.clear()).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio_stream::StreamExt;

    use crate::{
        store::{entry, KeyValueStore},
        utils::clock::DefaultClock,
    };

    use super::JsonFileStore;

    #[tokio::test]
    async fn test_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::in_dir(dir.path())?;

        assert!(store.get_all().await?.is_empty());
        assert_eq!(store.get("example.com").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_merges_and_persists() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::in_dir(dir.path())?;
        store.set(entry("a.com", 10)).await?;
        store.set(entry("b.com", 20)).await?;
        store.set(entry("a.com", 11)).await?;

        let reopened = JsonFileStore::in_dir(dir.path())?;
        let all = reopened.get_all().await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a.com"), Some(&json!(11)));
        assert_eq!(all.get("b.com"), Some(&json!(20)));
        Ok(())
    }

    #[tokio::test]
    async fn test_shorter_rewrite_leaves_no_trailing_bytes() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::in_dir(dir.path())?;
        store
            .set(entry("a-very-long-domain-name.example.com", 123456789))
            .await?;
        store.clear().await?;
        store.set(entry("b.io", 1)).await?;

        let all = store.get_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("b.io"), Some(&json!(1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::in_dir(dir.path())?;
        std::fs::write(store.path(), "{ not json")?;

        assert!(store.get_all().await.is_err());
        assert!(store.set(entry("a.com", 1)).await.is_err());
        // A failed write must not replace the damaged file.
        assert_eq!(std::fs::read_to_string(store.path())?, "{ not json");
        Ok(())
    }

    #[tokio::test]
    async fn test_changes_notices_writes() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::in_dir(dir.path())?;
        store.set(entry("a.com", 1)).await?;

        let changes = store
            .changes(Duration::from_millis(10), Arc::new(DefaultClock))
            .timeout(Duration::from_secs(5));
        tokio::pin!(changes);

        let writer = JsonFileStore::in_dir(dir.path())?;
        writer.set(entry("a.com", 2)).await?;

        let changed = changes.next().await;
        assert!(matches!(changed, Some(Ok(()))));

        let quiet = tokio::time::timeout(Duration::from_millis(100), changes.next()).await;
        assert!(quiet.is_err());
        Ok(())
    }
}
