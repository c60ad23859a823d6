use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `body` under `name` and returns the public URL it is served from.
    async fn put(&self, name: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn delete(&self, url: &str) -> anyhow::Result<()>;
}

/// Files on local disk, served by the HTTP layer under `public_prefix`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStore {
    pub async fn new(root: impl Into<PathBuf>, public_prefix: &str) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self {
            root,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.public_prefix, name)
    }

    fn name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let name = url.strip_prefix(self.public_prefix.as_str())?.strip_prefix('/')?;
        is_plain_name(name).then_some(name)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, name: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        anyhow::ensure!(is_plain_name(name), "invalid file name {:?}", name);
        let path = self.root.join(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(file = %name, bytes = body.len(), %content_type, "file stored");
        Ok(self.url_for(name))
    }

    async fn delete(&self, url: &str) -> anyhow::Result<()> {
        let name = self
            .name_from_url(url)
            .with_context(|| format!("url {:?} is not managed by this store", url))?;
        let path = self.root.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(file = %name, "file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Keeps track of stored and deleted URLs without touching disk.
    /// With `fail_after: Some(n)`, every put after the n-th fails.
    #[derive(Default)]
    pub struct MemoryFileStore {
        pub stored: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
        pub fail_after: Option<usize>,
    }

    #[async_trait]
    impl FileStore for MemoryFileStore {
        async fn put(&self, name: &str, _body: Bytes, _ct: &str) -> anyhow::Result<String> {
            let mut stored = self.stored.lock().unwrap();
            if self.fail_after.is_some_and(|n| stored.len() >= n) {
                anyhow::bail!("disk full");
            }
            let url = format!("/uploads/{}", name);
            stored.push(url.clone());
            Ok(url)
        }

        async fn delete(&self, url: &str) -> anyhow::Result<()> {
            self.deleted.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }
}
