use object_store::path::Path;
use tokio::io::{self, AsyncWriteExt};

use super::common::{Store, StoreConfig, StoreError, parse_key};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Open(#[from] StoreError),

    #[error(transparent)]
    Store(#[from] ingestd_store::Error),

    #[error("no document stored under '{0}'")]
    NotFound(Path),

    #[error("error writing to stdout: {0}")]
    Io(#[from] io::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    store_config: StoreConfig,

    /// Key of the document to print, as shown by `ingestd list`
    #[clap(value_parser = parse_key)]
    key: Path,
}

pub(crate) async fn command(config: Config) -> Result<()> {
    let store = Store::open(&config.store_config)?;

    let value = store
        .client()
        .get(&config.key)
        .await?
        .ok_or(Error::NotFound(config.key))?;

    let mut stdout = io::stdout();
    stdout.write_all(&value).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}
