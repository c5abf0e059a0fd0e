use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use futures::{Stream, stream::FusedStream};
use pin_project_lite::pin_project;

use crate::{Element, Error, Projection, extract};

/// Error yielded by [`ExtractStream`]
#[derive(Debug, thiserror::Error)]
pub enum StreamError<E> {
    #[error(transparent)]
    Upstream(E),

    #[error(transparent)]
    Extract(Error),
}

/// Apply [`extract`] to every buffer of `buffers`, yielding the extracted elements in order.
///
/// The first error, from upstream or from extraction, is yielded and ends the stream.
pub fn extract_stream<S>(buffers: S, projection: Option<Arc<dyn Projection>>) -> ExtractStream<S> {
    ExtractStream {
        upstream: buffers,
        projection,
        pending: Vec::new().into_iter(),
        done: false,
    }
}

pin_project! {
    /// Stream returned by [`extract_stream`]
    #[must_use = "streams do nothing unless polled"]
    pub struct ExtractStream<S> {
        #[pin]
        upstream: S,
        projection: Option<Arc<dyn crate::Projection>>,
        pending: std::vec::IntoIter<Element>,
        done: bool,
    }
}

impl<S> fmt::Debug for ExtractStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractStream")
            .field("projected", &self.projection.is_some())
            .field("pending", &self.pending.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<S, B, E> Stream for ExtractStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Element, StreamError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(element) = this.pending.next() {
                return Poll::Ready(Some(Ok(element)));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match ready!(this.upstream.as_mut().poll_next(cx)) {
                Some(Ok(buffer)) => match extract(buffer.as_ref(), this.projection.as_deref()) {
                    Ok(elements) => *this.pending = elements.into_iter(),
                    Err(e) => {
                        *this.done = true;
                        return Poll::Ready(Some(Err(StreamError::Extract(e))));
                    }
                },
                Some(Err(e)) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(StreamError::Upstream(e))));
                }
                None => *this.done = true,
            }
        }
    }
}

impl<S, B, E> FusedStream for ExtractStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    fn is_terminated(&self) -> bool {
        self.done && self.pending.as_slice().is_empty()
    }
}
