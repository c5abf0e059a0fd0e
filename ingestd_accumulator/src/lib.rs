//! Accumulate a stream of byte chunks into a single buffer
//!
//! The [`Accumulate`] stage intercepts an upstream [`Stream`] of [`Buf`] chunks and yields exactly
//! one item: either the contiguous [`Bytes`] holding every chunk in arrival order, emitted once the
//! upstream ends, or the error that terminated the upstream. Partial buffers are never emitted.
//!
//! Backpressure follows the usual poll model: the upstream is only polled while the stage itself
//! is polled, and the stage drains it eagerly since nothing can be emitted before completion.
//! Dropping the stage drops the upstream, which is how cancellation propagates.
//!
//! ```
//! # futures::executor::block_on(async {
//! use bytes::Bytes;
//! use futures::{StreamExt, stream};
//! use ingestd_accumulator::AccumulateExt;
//!
//! let chunks = stream::iter([
//!     Ok::<_, std::io::Error>(Bytes::from_static(b"<a>")),
//!     Ok(Bytes::from_static(b"1</a>")),
//! ]);
//! let assembled: Vec<_> = chunks.accumulate().collect().await;
//! assert_eq!(assembled.len(), 1);
//! assert_eq!(assembled[0].as_ref().unwrap(), &Bytes::from_static(b"<a>1</a>"));
//! # });
//! ```

use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{Stream, stream::FusedStream};
use observability_deps::tracing::{debug, warn};
use pin_project_lite::pin_project;

/// Error yielded in place of the assembled buffer
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The upstream failed; the error is forwarded as it was received
    #[error(transparent)]
    Upstream(E),

    #[error("accumulated buffer exceeds the limit of {limit} bytes")]
    LimitExceeded { limit: usize },
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;

/// Wrap `upstream` in an [`Accumulate`] stage
pub fn intercept<S, B, E>(upstream: S) -> Accumulate<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: Buf,
{
    Accumulate::new(upstream)
}

/// Extension trait adding [`accumulate`][AccumulateExt::accumulate] to any [`Stream`]
pub trait AccumulateExt: Stream + Sized {
    /// See [`intercept`]
    fn accumulate(self) -> Accumulate<Self> {
        Accumulate::new(self)
    }
}

impl<S: Stream> AccumulateExt for S {}

#[derive(Debug)]
enum State {
    Accumulating { buf: BytesMut, chunks: usize },
    Terminated,
}

pin_project! {
    /// Stream returned by [`intercept`] and [`AccumulateExt::accumulate`]
    ///
    /// Yields one item per subscription and then stays exhausted; it never polls the upstream
    /// again once that item has been produced.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct Accumulate<S> {
        #[pin]
        upstream: S,
        state: State,
        limit: Option<usize>,
        capacity_hint: Option<usize>,
    }
}

impl<S> Accumulate<S> {
    fn new(upstream: S) -> Self {
        Self {
            upstream,
            state: State::Accumulating {
                buf: BytesMut::new(),
                chunks: 0,
            },
            limit: None,
            capacity_hint: None,
        }
    }

    /// Fail with [`Error::LimitExceeded`] instead of buffering more than `limit` bytes
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Preallocate the accumulation buffer on the first poll.
    ///
    /// The hint usually comes from the source and can't be trusted, so when a limit is set it is
    /// only honoured if it is at most a quarter of that limit. The check happens when the buffer
    /// is allocated, so this and [`Self::with_limit`] can be called in either order.
    pub fn with_capacity_hint(mut self, hint: usize) -> Self {
        self.capacity_hint = Some(hint);
        self
    }

    /// Number of bytes buffered so far, `None` once the stage has yielded its item
    pub fn buffered(&self) -> Option<usize> {
        match &self.state {
            State::Accumulating { buf, .. } => Some(buf.len()),
            State::Terminated => None,
        }
    }
}

impl<S, B, E> Stream for Accumulate<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: Buf,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        let State::Accumulating { buf, chunks } = &mut *this.state else {
            return Poll::Ready(None);
        };

        if let Some(hint) = this.capacity_hint.take() {
            if this.limit.is_none_or(|limit| hint <= limit / 4) {
                buf.reserve(hint);
            }
        }

        loop {
            match ready!(this.upstream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if let Some(limit) = *this.limit {
                        if buf.len() + chunk.remaining() > limit {
                            warn!(
                                limit,
                                buffered = buf.len(),
                                chunk = chunk.remaining(),
                                "discarding accumulated buffer, limit exceeded"
                            );
                            *this.state = State::Terminated;
                            return Poll::Ready(Some(Err(Error::LimitExceeded { limit })));
                        }
                    }
                    buf.put(chunk);
                    *chunks += 1;
                }
                Some(Err(e)) => {
                    debug!(
                        buffered = buf.len(),
                        chunks = *chunks,
                        "upstream failed, discarding accumulated buffer"
                    );
                    *this.state = State::Terminated;
                    return Poll::Ready(Some(Err(Error::Upstream(e))));
                }
                None => {
                    let assembled = std::mem::take(buf).freeze();
                    debug!(bytes = assembled.len(), chunks = *chunks, "sealed buffer");
                    *this.state = State::Terminated;
                    return Poll::Ready(Some(Ok(assembled)));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            State::Accumulating { .. } => (1, Some(1)),
            State::Terminated => (0, Some(0)),
        }
    }
}

impl<S, B, E> FusedStream for Accumulate<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: Buf,
{
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Terminated)
    }
}
