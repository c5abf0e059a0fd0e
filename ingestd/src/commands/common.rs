use std::sync::Arc;

use clap::Parser;
use ingestd_clap_blocks::object_store::{ObjectStoreConfig, ParseError};
use ingestd_store::{Client, Cluster, Lifecycle};
use object_store::path::Path;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("Cannot parse object store config: {0}")]
    ObjectStoreParsing(#[from] ParseError),

    #[error("Cannot start store: {0}")]
    Start(#[from] ingestd_store::Error),
}

/// Where persisted documents live
#[derive(Debug, Parser)]
pub(crate) struct StoreConfig {
    #[clap(flatten)]
    pub(crate) object_store_config: ObjectStoreConfig,

    /// Key prefix persisted documents are written under
    #[clap(
        long = "prefix",
        env = "INGESTD_PREFIX",
        default_value = "documents",
        action
    )]
    pub(crate) prefix: String,
}

/// Started store handles, stopped client first when dropped
#[derive(Debug)]
pub(crate) struct Store {
    client: Arc<Client>,
}

impl Store {
    pub(crate) fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let object_store = config.object_store_config.make_object_store()?;

        let cluster = Arc::new(Cluster::new(object_store));
        cluster.start()?;
        let client = Arc::new(Client::new(cluster));
        client.start()?;

        Ok(Self { client })
    }

    pub(crate) fn client(&self) -> &Arc<Client> {
        &self.client
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.client.stop();
        self.client.cluster().stop();
    }
}

/// A clap `value_parser` for store keys
pub(crate) fn parse_key(s: &str) -> Result<Path, object_store::path::Error> {
    Path::parse(s)
}
