//! Port for the catalogue of books and their availability flags.

use async_trait::async_trait;

use crate::domain::{Book, BookDraft, BookId, BookQuery};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue store adapters.
    pub enum CatalogueStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "catalogue store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalogue store query failed: {message}",
        /// Referenced book does not exist.
        NotFound { book_id: u64 } =>
            "book {book_id} does not exist",
        /// Conditional availability write found a different current value.
        AvailabilityConflict { book_id: u64, actual: bool } =>
            "book {book_id} availability is already {actual}",
    }
}

/// Port for reading and writing catalogue books.
///
/// `available` is only ever written through
/// [`CatalogueStore::compare_and_set_availability`]; detail edits and inserts
/// cannot change it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Books matching `query`, in query order and window.
    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>, CatalogueStoreError>;

    /// Number of books matching `query`, ignoring its window.
    async fn count(&self, query: &BookQuery) -> Result<usize, CatalogueStoreError>;

    /// Find a book by id.
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, CatalogueStoreError>;

    /// Insert a new, available book and return it with its assigned id.
    async fn insert(&self, draft: &BookDraft) -> Result<Book, CatalogueStoreError>;

    /// Replace title and author of an existing book.
    async fn update_details(
        &self,
        id: BookId,
        draft: &BookDraft,
    ) -> Result<Book, CatalogueStoreError>;

    /// Remove a book while it is available. Returns `false` when it did not
    /// exist.
    ///
    /// A book whose flag is cleared is on loan and yields
    /// [`CatalogueStoreError::AvailabilityConflict`]; the check and the removal
    /// are one atomic step so a concurrent claim cannot slip in between.
    async fn delete(&self, id: BookId) -> Result<bool, CatalogueStoreError>;

    /// Set `available = desired` only when it currently equals `expected`.
    ///
    /// A mismatch yields [`CatalogueStoreError::AvailabilityConflict`] and
    /// leaves the record untouched.
    async fn compare_and_set_availability(
        &self,
        id: BookId,
        expected: bool,
        desired: bool,
    ) -> Result<(), CatalogueStoreError>;
}

/// Fixture implementation for tests that do not exercise the catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCatalogueStore;

#[async_trait]
impl CatalogueStore for FixtureCatalogueStore {
    async fn find(&self, _query: &BookQuery) -> Result<Vec<Book>, CatalogueStoreError> {
        Ok(Vec::new())
    }

    async fn count(&self, _query: &BookQuery) -> Result<usize, CatalogueStoreError> {
        Ok(0)
    }

    async fn find_by_id(&self, _id: BookId) -> Result<Option<Book>, CatalogueStoreError> {
        Ok(None)
    }

    async fn insert(&self, draft: &BookDraft) -> Result<Book, CatalogueStoreError> {
        Ok(Book::new(BookId::new(1), draft.clone(), true))
    }

    async fn update_details(
        &self,
        id: BookId,
        _draft: &BookDraft,
    ) -> Result<Book, CatalogueStoreError> {
        Err(CatalogueStoreError::not_found(id.get()))
    }

    async fn delete(&self, _id: BookId) -> Result<bool, CatalogueStoreError> {
        Ok(false)
    }

    async fn compare_and_set_availability(
        &self,
        id: BookId,
        _expected: bool,
        _desired: bool,
    ) -> Result<(), CatalogueStoreError> {
        Err(CatalogueStoreError::not_found(id.get()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_find_returns_empty() {
        let store = FixtureCatalogueStore;
        let books = store
            .find(&BookQuery::all())
            .await
            .expect("fixture find succeeds");
        assert!(books.is_empty());
        assert_eq!(store.count(&BookQuery::all()).await.expect("count"), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_insert_returns_available_book() {
        let store = FixtureCatalogueStore;
        let draft = BookDraft::try_from_strings("Moon", "Author").expect("valid draft");
        let book = store.insert(&draft).await.expect("fixture insert succeeds");
        assert!(book.is_available());
        assert_eq!(book.title(), draft.title());
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_availability_write_reports_missing_book() {
        let store = FixtureCatalogueStore;
        let err = store
            .compare_and_set_availability(BookId::new(9), true, false)
            .await
            .expect_err("fixture has no books");
        assert_eq!(err, CatalogueStoreError::not_found(9_u64));
    }

    #[rstest]
    fn conflict_error_formats_fields() {
        let err = CatalogueStoreError::availability_conflict(3_u64, false);
        assert_eq!(err.to_string(), "book 3 availability is already false");
    }
}
