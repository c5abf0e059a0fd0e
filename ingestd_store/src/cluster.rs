use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use object_store::DynObjectStore;
use observability_deps::tracing::info;

use crate::{Error, Lifecycle, Result};

const NEW: u8 = 0;
const RUNNING: u8 = 1;
const SHUT_DOWN: u8 = 2;

/// Handle on the object store backing the key-value store
#[derive(Debug)]
pub struct Cluster {
    object_store: Arc<DynObjectStore>,
    state: AtomicU8,
}

impl Cluster {
    pub fn new(object_store: Arc<DynObjectStore>) -> Self {
        Self {
            object_store,
            state: AtomicU8::new(NEW),
        }
    }

    /// The object store, if the cluster is running
    pub(crate) fn object_store(&self) -> Result<&DynObjectStore> {
        if self.is_running() {
            Ok(self.object_store.as_ref())
        } else {
            Err(Error::NotRunning {
                component: "cluster",
            })
        }
    }
}

impl Lifecycle for Cluster {
    fn start(&self) -> Result<bool> {
        match self
            .state
            .compare_exchange(NEW, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                info!(object_store = %self.object_store, "cluster started");
                Ok(true)
            }
            Err(RUNNING) => Ok(false),
            Err(_) => Err(Error::ShutDown),
        }
    }

    fn stop(&self) -> bool {
        let stopped = self
            .state
            .compare_exchange(RUNNING, SHUT_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if stopped {
            info!(object_store = %self.object_store, "cluster shut down");
        }
        stopped
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use object_store::memory::InMemory;

    use super::*;

    fn cluster() -> Cluster {
        Cluster::new(Arc::new(InMemory::new()))
    }

    #[test]
    fn start_is_idempotent() {
        let cluster = cluster();
        assert!(!cluster.is_running());
        assert!(cluster.object_store().is_err());

        assert!(cluster.start().unwrap());
        assert!(!cluster.start().unwrap());
        assert!(cluster.is_running());
        assert!(cluster.object_store().is_ok());
    }

    #[test]
    fn stop_before_start_does_nothing() {
        let cluster = cluster();
        assert!(!cluster.stop());
        assert!(cluster.start().unwrap());
    }

    #[test]
    fn no_restart_after_shutdown() {
        let cluster = cluster();
        cluster.start().unwrap();
        assert!(cluster.stop());
        assert!(!cluster.stop());
        assert!(!cluster.is_running());
        assert!(matches!(cluster.start(), Err(Error::ShutDown)));
        assert!(matches!(
            cluster.object_store(),
            Err(Error::NotRunning {
                component: "cluster"
            })
        ));
    }

    #[test]
    fn concurrent_stop_shuts_down_once() {
        let cluster = Arc::new(cluster());
        cluster.start().unwrap();

        let stops = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cluster = Arc::clone(&cluster);
                let stops = Arc::clone(&stops);
                std::thread::spawn(move || {
                    if cluster.stop() {
                        stops.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
