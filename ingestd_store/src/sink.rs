use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use ingestd_xml::Element;
use observability_deps::tracing::{debug, info};

use crate::{Client, DocumentPath, Error, Result};

/// Error returned by [`DocumentSink::persist`]
#[derive(Debug, thiserror::Error)]
pub enum SinkError<E> {
    #[error(transparent)]
    Upstream(E),

    #[error("failed to persist document: {0}")]
    Store(#[from] Error),
}

/// Writes elements of one source under consecutive [`DocumentPath`]s
#[derive(Debug)]
pub struct DocumentSink {
    client: Arc<Client>,
    prefix: String,
    source: String,
    next_sequence: u64,
}

impl DocumentSink {
    pub fn new(client: Arc<Client>, prefix: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            source: source.into(),
            next_sequence: 0,
        }
    }

    /// Create a sink that continues after the highest sequence already stored for `source`
    pub async fn resume(
        client: Arc<Client>,
        prefix: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self> {
        let mut sink = Self::new(client, prefix, source);
        let dir = DocumentPath::dir(&sink.prefix, &sink.source);
        let last = sink
            .client
            .list(Some(&dir))
            .await?
            .iter()
            .filter_map(DocumentPath::sequence)
            .max();
        if let Some(last) = last {
            sink.next_sequence = last + 1;
            info!(source = %sink.source, next_sequence = sink.next_sequence, "resuming sink");
        }
        Ok(sink)
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Persist one element, returning the key it was written under
    pub async fn write(&mut self, element: &Element) -> Result<DocumentPath> {
        let path = DocumentPath::new(&self.prefix, &self.source, self.next_sequence);
        self.client
            .put(&path, Bytes::from(element.to_string()))
            .await?;
        self.next_sequence += 1;
        debug!(%path, element = element.name(), "persisted element");
        Ok(path)
    }

    /// Persist every element of `elements` in order, returning how many were written.
    ///
    /// The first error, from upstream or from the store, stops the sink.
    pub async fn persist<S, E>(&mut self, elements: S) -> Result<usize, SinkError<E>>
    where
        S: Stream<Item = std::result::Result<Element, E>> + Send,
        E: Send,
    {
        let mut elements = std::pin::pin!(elements);
        let mut written = 0;
        while let Some(element) = elements.next().await {
            let element = element.map_err(SinkError::Upstream)?;
            self.write(&element).await?;
            written += 1;
        }
        Ok(written)
    }
}
