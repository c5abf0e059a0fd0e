use std::{convert::Infallible, fmt, io, path::PathBuf, sync::Arc};

use ingestd_accumulator::AccumulateExt;
use ingestd_clap_blocks::source::SourceConfig;
use ingestd_store::{DocumentPath, DocumentSink, SinkError};
use ingestd_xml::{Projection, Select, StreamError, extract_stream};
use observability_deps::tracing::{info, warn};
use tokio::{fs::File, io::AsyncRead};
use tokio_util::{io::ReaderStream, sync::CancellationToken};
use trogging::cli::LoggingConfig;

use super::common::{Store, StoreConfig, StoreError};

type PipelineError = SinkError<StreamError<ingestd_accumulator::Error<io::Error>>>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Open(#[from] StoreError),

    #[error(transparent)]
    Store(#[from] ingestd_store::Error),

    #[error("error opening {input}: {source}")]
    Input { input: Input, source: io::Error },

    #[error("error ingesting {input}: {source}")]
    Ingest {
        input: Input,
        source: PipelineError,
    },

    #[error("cancelled while ingesting {input}")]
    Cancelled { input: Input },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    store_config: StoreConfig,

    #[clap(flatten)]
    source_config: SourceConfig,

    /// logging options
    #[clap(flatten)]
    pub(crate) logging_config: LoggingConfig,

    /// Only persist the elements found at this path below the document root.
    ///
    /// The path is a `/` separated list of element names where `*` matches any name, e.g.
    /// `book` or `shelf/*/book`. Without it the root element itself is persisted.
    #[clap(long = "select", env = "INGESTD_SELECT", action)]
    select: Option<String>,

    /// Documents to read, in order. `-` reads standard input.
    #[clap(required = true, value_parser = parse_input)]
    inputs: Vec<Input>,
}

/// Where a document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// Name the input's documents are stored under
    fn source(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_owned(),
            Self::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn parse_input(s: &str) -> Result<Input, Infallible> {
    Ok(match s {
        "-" => Input::Stdin,
        path => Input::File(PathBuf::from(path)),
    })
}

pub(crate) async fn command(config: Config, shutdown: CancellationToken) -> Result<()> {
    let store = Store::open(&config.store_config)?;
    let prefix = &config.store_config.prefix;

    let projection: Option<Arc<dyn Projection>> = config
        .select
        .map(|path| Arc::new(Select::new(path)) as Arc<dyn Projection>);

    for input in &config.inputs {
        let source = input.source();
        let mut sink = DocumentSink::resume(Arc::clone(store.client()), prefix, &source).await?;
        let first = sink.next_sequence();

        // dropping the pipeline drops the reader, which is how cancellation reaches the input
        let persisted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                warn!(%input, "ingestion cancelled");
                return Err(Error::Cancelled { input: input.clone() });
            }
            persisted = ingest(
                input,
                &config.source_config,
                projection.as_ref().map(Arc::clone),
                &mut sink,
            ) => persisted?,
        };

        info!(%input, persisted, first_sequence = first, "ingested document");
        println!(
            "{input}: persisted {persisted} element(s) under {}",
            DocumentPath::dir(prefix, &source)
        );
    }

    Ok(())
}

/// Read `input` through the accumulate, extract and persist stages
async fn ingest(
    input: &Input,
    config: &SourceConfig,
    projection: Option<Arc<dyn Projection>>,
    sink: &mut DocumentSink,
) -> Result<usize> {
    let open_err = |source| Error::Input {
        input: input.clone(),
        source,
    };

    let mut size_hint = None;
    let reader: Box<dyn AsyncRead + Send + Unpin> = match input {
        Input::Stdin => Box::new(tokio::io::stdin()),
        Input::File(path) => {
            let file = File::open(path).await.map_err(open_err)?;
            size_hint = Some(file.metadata().await.map_err(open_err)?.len());
            Box::new(file)
        }
    };

    let chunks = ReaderStream::with_capacity(reader, config.chunk_size.get());
    let mut document = chunks.accumulate();
    if let Some(limit) = config.document_limit() {
        document = document.with_limit(limit);
    }
    if let Some(hint) = size_hint.and_then(|len| usize::try_from(len).ok()) {
        document = document.with_capacity_hint(hint);
    }

    sink.persist(extract_stream(document, projection))
        .await
        .map_err(|source| Error::Ingest {
            input: input.clone(),
            source,
        })
}
