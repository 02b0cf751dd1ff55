use std::path::PathBuf;

use perch_config::persist::{self, Format as _, Json};
use tokio::sync::RwLock;

use crate::Grant;

/// Where grants live.
///
/// Reads hand out a snapshot, writers are serialized by the
/// [`Authority`](crate::Authority).
#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    async fn grants(&self, server_name: &str) -> anyhow::Result<Vec<Grant>>;
    async fn insert(&self, grant: Grant) -> anyhow::Result<()>;
    async fn update(&self, server_name: &str, old_mask: &str, grant: Grant) -> anyhow::Result<()>;
    async fn delete(&self, server_name: &str, mask: &str) -> anyhow::Result<()>;
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    grants: RwLock<Vec<Grant>>,
}

impl MemoryStore {
    pub fn new(grants: impl IntoIterator<Item = Grant>) -> Self {
        Self {
            grants: RwLock::new(grants.into_iter().collect()),
        }
    }

    pub async fn snapshot(&self) -> Vec<Grant> {
        self.grants.read().await.clone()
    }
}

fn position(grants: &[Grant], server_name: &str, mask: &str) -> anyhow::Result<usize> {
    grants
        .iter()
        .position(|g| g.server_name == server_name && g.mask.eq_ignore_ascii_case(mask))
        .ok_or_else(|| anyhow::anyhow!("no grant for '{mask}' on {server_name}"))
}

#[async_trait::async_trait]
impl GrantStore for MemoryStore {
    async fn grants(&self, server_name: &str) -> anyhow::Result<Vec<Grant>> {
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .filter(|g| g.server_name == server_name)
            .cloned()
            .collect())
    }

    async fn insert(&self, grant: Grant) -> anyhow::Result<()> {
        self.grants.write().await.push(grant);
        Ok(())
    }

    async fn update(&self, server_name: &str, old_mask: &str, grant: Grant) -> anyhow::Result<()> {
        let mut grants = self.grants.write().await;
        let index = position(&grants, server_name, old_mask)?;
        grants[index] = grant;
        Ok(())
    }

    async fn delete(&self, server_name: &str, mask: &str) -> anyhow::Result<()> {
        let mut grants = self.grants.write().await;
        let index = position(&grants, server_name, mask)?;
        grants.remove(index);
        Ok(())
    }
}

/// A [`MemoryStore`] written out as JSON after every change.
#[derive(Debug)]
pub struct FileStore {
    memory: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    /// Loads the grants at `path` (`.json` is appended), starting empty if
    /// the file doesn't exist yet
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let file = Json::path(&path);

        let grants = if tokio::fs::metadata(&file).await.is_ok() {
            persist::load::<Json, Vec<Grant>>(&path).await?
        } else {
            log::info!("no grants at {}, starting empty", file.display());
            vec![]
        };

        log::debug!("loaded {} grant(s) from {}", grants.len(), file.display());
        Ok(Self {
            memory: MemoryStore::new(grants),
            path,
        })
    }

    async fn sync(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let grants = self.memory.snapshot().await;
        persist::save::<Json, _>(&grants, &self.path).await
    }
}

#[async_trait::async_trait]
impl GrantStore for FileStore {
    async fn grants(&self, server_name: &str) -> anyhow::Result<Vec<Grant>> {
        self.memory.grants(server_name).await
    }

    async fn insert(&self, grant: Grant) -> anyhow::Result<()> {
        self.memory.insert(grant).await?;
        self.sync().await
    }

    async fn update(&self, server_name: &str, old_mask: &str, grant: Grant) -> anyhow::Result<()> {
        self.memory.update(server_name, old_mask, grant).await?;
        self.sync().await
    }

    async fn delete(&self, server_name: &str, mask: &str) -> anyhow::Result<()> {
        self.memory.delete(server_name, mask).await?;
        self.sync().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_is_keyed_by_server() {
        let store = MemoryStore::new([
            Grant::new("rizon", "*!*@*", 1),
            Grant::new("libera", "alice!*@*", 50),
        ]);

        let grants = store.grants("rizon").await.unwrap();
        assert_eq!(grants, [Grant::new("rizon", "*!*@*", 1)]);

        store
            .update("rizon", "*!*@*", Grant::new("rizon", "*!*@*", 5))
            .await
            .unwrap();
        assert_eq!(store.grants("rizon").await.unwrap()[0].level, 5);

        assert!(store.delete("rizon", "alice!*@*").await.is_err());
        store.delete("libera", "ALICE!*@*").await.unwrap();
        assert!(store.grants("libera").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("perch_grants_{}", std::process::id()));
        let path = dir.join("permissions");

        let store = FileStore::open(&path).await.unwrap();
        assert!(store.grants("rizon").await.unwrap().is_empty());

        store.insert(Grant::new("rizon", "Owner!*@*", 100)).await.unwrap();
        store.insert(Grant::new("rizon", "*!*@*", 1)).await.unwrap();
        store.delete("rizon", "*!*@*").await.unwrap();
        assert!(dir.join("permissions.json").exists());

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.grants("rizon").await.unwrap(),
            [Grant::new("rizon", "owner!*@*", 100)]
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
