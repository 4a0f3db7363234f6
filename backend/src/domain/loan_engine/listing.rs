//! Lazy, restartable listing of available books.

use std::sync::Arc;

use futures_util::stream::{self, Stream, TryStreamExt};

use crate::domain::ports::CatalogueStore;
use crate::domain::store_call::{StoreDeadline, map_catalogue_error};
use crate::domain::{Book, BookCursor, BookQuery, DomainError, QueryRange};

/// Handle over the books currently available for loan.
///
/// Nothing is fetched until [`AvailableBooks::stream`] is polled, and each
/// call starts a fresh read of the catalogue, so consumers always observe the
/// current state rather than a cached snapshot.
#[derive(Clone)]
pub struct AvailableBooks {
    catalogue: Arc<dyn CatalogueStore>,
    query: BookQuery,
    batch_size: usize,
    deadline: StoreDeadline,
}

impl AvailableBooks {
    pub(super) fn new(
        catalogue: Arc<dyn CatalogueStore>,
        query: BookQuery,
        batch_size: usize,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            catalogue,
            query,
            batch_size: batch_size.max(1),
            deadline,
        }
    }

    /// Query the listing is evaluated with.
    pub fn query(&self) -> &BookQuery {
        &self.query
    }

    /// Stream matching books in title order, one catalogue page at a time.
    ///
    /// Each page resumes after the last book already yielded, so a book
    /// borrowed mid-stream never pushes a still-available one out of view.
    pub fn stream(&self) -> impl Stream<Item = Result<Book, DomainError>> + Send + 'static {
        let cursor = Cursor {
            catalogue: Arc::clone(&self.catalogue),
            query: self.query.clone(),
            batch_size: self.batch_size,
            deadline: self.deadline,
            after: None,
            exhausted: false,
        };
        stream::try_unfold(cursor, Cursor::next_batch)
            .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<Book, DomainError>)))
            .try_flatten()
    }

    /// Drain a fresh stream into a vector.
    pub async fn collect(&self) -> Result<Vec<Book>, DomainError> {
        self.stream().try_collect().await
    }
}

struct Cursor {
    catalogue: Arc<dyn CatalogueStore>,
    query: BookQuery,
    batch_size: usize,
    deadline: StoreDeadline,
    after: Option<BookCursor>,
    exhausted: bool,
}

impl Cursor {
    async fn next_batch(mut self) -> Result<Option<(Vec<Book>, Self)>, DomainError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut query = self
            .query
            .clone()
            .with_range(QueryRange::new(0, self.batch_size));
        if let Some(cursor) = self.after.take() {
            query = query.starting_after(cursor);
        }
        let batch = self
            .deadline
            .run("list available books", self.catalogue.find(&query))
            .await?
            .map_err(map_catalogue_error)?;
        let Some(last) = batch.last() else {
            return Ok(None);
        };
        self.after = Some(self.query.sort.cursor_for(last));
        self.exhausted = batch.len() < self.batch_size;
        Ok(Some((batch, self)))
    }
}
