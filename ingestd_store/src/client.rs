use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{DynObjectStore, path::Path};
use observability_deps::tracing::{debug, info};

use crate::{Cluster, Error, Lifecycle, Result};

/// Keyed access to the store through a [`Cluster`]
///
/// Every operation requires both the client and its cluster to be running.
#[derive(Debug)]
pub struct Client {
    cluster: Arc<Cluster>,
    started: AtomicBool,
}

impl Client {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self {
            cluster,
            started: AtomicBool::new(false),
        }
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    fn object_store(&self) -> Result<&DynObjectStore> {
        if !self.is_running() {
            return Err(Error::NotRunning {
                component: "client",
            });
        }
        self.cluster.object_store()
    }

    pub async fn put(&self, key: &Path, value: Bytes) -> Result<()> {
        let len = value.len();
        self.object_store()?.put(key, value.into()).await?;
        debug!(%key, bytes = len, "put");
        Ok(())
    }

    /// Value stored under `key`, `None` if there is none
    pub async fn get(&self, key: &Path) -> Result<Option<Bytes>> {
        match self.object_store()?.get(key).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `key`; removing a missing key succeeds
    pub async fn delete(&self, key: &Path) -> Result<()> {
        match self.object_store()?.delete(key).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys under `prefix`, sorted
    pub async fn list(&self, prefix: Option<&Path>) -> Result<Vec<Path>> {
        let mut keys: Vec<Path> = self
            .object_store()?
            .list(prefix)
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;
        keys.sort();
        Ok(keys)
    }
}

impl Lifecycle for Client {
    fn start(&self) -> Result<bool> {
        let started = self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if started {
            info!("client started");
        }
        Ok(started)
    }

    fn stop(&self) -> bool {
        let stopped = self
            .started
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if stopped {
            info!("client stopped");
        }
        stopped
    }

    fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use object_store::{local::LocalFileSystem, memory::InMemory};
    use pretty_assertions::assert_eq;

    use super::*;

    fn started(object_store: Arc<DynObjectStore>) -> Client {
        let cluster = Arc::new(Cluster::new(object_store));
        cluster.start().unwrap();
        let client = Client::new(cluster);
        client.start().unwrap();
        client
    }

    #[tokio::test]
    async fn put_get_delete() {
        let client = started(Arc::new(InMemory::new()));
        let key = Path::from("docs/orders/1.xml");

        assert_eq!(client.get(&key).await.unwrap(), None);

        client.put(&key, Bytes::from_static(b"<order/>")).await.unwrap();
        assert_eq!(
            client.get(&key).await.unwrap(),
            Some(Bytes::from_static(b"<order/>"))
        );

        client.delete(&key).await.unwrap();
        assert_eq!(client.get(&key).await.unwrap(), None);
        client.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let client = started(Arc::new(InMemory::new()));
        for k in ["p/b/2.xml", "p/a/1.xml", "p/b/1.xml", "q/1.xml"] {
            client.put(&Path::from(k), Bytes::new()).await.unwrap();
        }

        let keys = client.list(Some(&Path::from("p"))).await.unwrap();
        let keys: Vec<_> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["p/a/1.xml", "p/b/1.xml", "p/b/2.xml"]);
    }

    #[tokio::test]
    async fn local_file_system() {
        let dir = tempfile::tempdir().unwrap();
        let client = started(Arc::new(
            LocalFileSystem::new_with_prefix(dir.path()).unwrap(),
        ));
        let key = Path::from("docs/a.xml");

        client.put(&key, Bytes::from_static(b"<a/>")).await.unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("docs/a.xml")).unwrap(),
            b"<a/>"
        );
        assert_eq!(client.list(None).await.unwrap(), vec![key.clone()]);

        client.delete(&key).await.unwrap();
        client.delete(&key).await.unwrap();
        assert_eq!(client.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn operations_require_running_handles() {
        let cluster = Arc::new(Cluster::new(Arc::new(InMemory::new())));
        let client = Client::new(Arc::clone(&cluster));
        let key = Path::from("k");

        let err = client.get(&key).await.unwrap_err();
        assert!(matches!(err, Error::NotRunning { component: "client" }));

        client.start().unwrap();
        let err = client.put(&key, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotRunning { component: "cluster" }));

        cluster.start().unwrap();
        client.put(&key, Bytes::new()).await.unwrap();

        assert!(client.stop());
        assert!(!client.stop());
        assert!(client.get(&key).await.is_err());

        // clients may be restarted as long as the cluster is up
        assert!(client.start().unwrap());
        assert!(client.get(&key).await.unwrap().is_some());
        assert!(client.cluster().is_running());
    }
}
