use crate::error::DbxResult;
use crate::row::FromRow;
use crate::session::RowStream;
use futures_core::Stream;
use futures_util::StreamExt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Lazily pulled rows of one query.
///
/// Rows are fetched as they are requested. [`RowIter::close`] (or dropping the
/// iterator) releases the underlying cursor; a closed iterator yields nothing.
#[must_use]
pub struct RowIter<T> {
    stream: Option<RowStream>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRow> RowIter<T> {
    pub(crate) fn new(stream: RowStream) -> Self {
        Self {
            stream: Some(stream),
            _marker: PhantomData,
        }
    }

    /// Next row, or `None` once exhausted or closed.
    pub async fn next(&mut self) -> Option<DbxResult<T>> {
        StreamExt::next(self).await
    }

    /// Stop early and release the cursor.
    pub fn close(&mut self) {
        self.stream = None;
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl<T: FromRow> Stream for RowIter<T> {
    type Item = DbxResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(stream) = self.stream.as_mut() else {
            return Poll::Ready(None);
        };
        match Pin::new(stream).poll_next(cx) {
            Poll::Ready(Some(row)) => Poll::Ready(Some(row.and_then(|r| T::from_row(&r)))),
            Poll::Ready(None) => {
                self.stream = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
