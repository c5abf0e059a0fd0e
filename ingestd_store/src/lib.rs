//! Key-value persistence for extracted documents
//!
//! The store is an [`ObjectStore`][object_store::ObjectStore] reached through two handles with an
//! explicit lifecycle:
//!
//! * [`Cluster`] owns the object store connection. It is acquired once at process start and
//!   shut down once on exit.
//! * [`Client`] performs keyed reads and writes through a started cluster.
//!
//! Both implement [`Lifecycle`], whose transitions are idempotent: repeated `start` or `stop`
//! calls after the first are no-ops, including when racing from several threads. Shutdown is
//! expected in reverse acquisition order, client first.

mod client;
mod cluster;
mod paths;
mod sink;

pub use client::Client;
pub use cluster::Cluster;
pub use paths::{DOCUMENT_FILE_EXTENSION, DocumentPath};
pub use sink::{DocumentSink, SinkError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{component} is not running")]
    NotRunning { component: &'static str },

    #[error("cluster has been shut down and cannot be restarted")]
    ShutDown,

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Start/stop contract shared by the store handles
pub trait Lifecycle {
    /// Start the component, returning `true` if this call performed the transition
    fn start(&self) -> Result<bool>;

    /// Stop the component, returning `true` if this call performed the transition.
    ///
    /// Stopping a component that is not running does nothing.
    fn stop(&self) -> bool;

    fn is_running(&self) -> bool;
}
