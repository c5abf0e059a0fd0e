use object_store::path::Path;

use super::common::{Store, StoreConfig, StoreError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Open(#[from] StoreError),

    #[error(transparent)]
    Store(#[from] ingestd_store::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    store_config: StoreConfig,

    /// Only list documents read from this source, e.g. `catalog.xml`
    #[clap(long = "source", action)]
    source: Option<String>,
}

pub(crate) async fn command(config: Config) -> Result<()> {
    let store = Store::open(&config.store_config)?;

    let prefix = match &config.source {
        Some(source) => ingestd_store::DocumentPath::dir(&config.store_config.prefix, source),
        None => Path::from(config.store_config.prefix.as_str()),
    };

    for key in store.client().list(Some(&prefix)).await? {
        println!("{key}");
    }

    Ok(())
}
