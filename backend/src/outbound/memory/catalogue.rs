//! In-memory catalogue store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{CatalogueStore, CatalogueStoreError};
use crate::domain::{Book, BookDraft, BookId, BookQuery};

use super::poisoned;

#[derive(Debug, Default)]
struct Shelf {
    books: BTreeMap<BookId, Book>,
    last_id: u64,
}

/// Catalogue held in a mutex-guarded ordered map. Ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryCatalogue {
    shelf: Mutex<Shelf>,
}

impl InMemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    fn shelf(&self) -> Result<MutexGuard<'_, Shelf>, CatalogueStoreError> {
        self.shelf
            .lock()
            .map_err(|_| CatalogueStoreError::query(poisoned("catalogue")))
    }
}

#[async_trait]
impl CatalogueStore for InMemoryCatalogue {
    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>, CatalogueStoreError> {
        let shelf = self.shelf()?;
        let mut hits: Vec<Book> = shelf
            .books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect();
        hits.sort_by(|left, right| query.sort.compare(left, right));
        Ok(match query.range {
            Some(range) => range.slice(hits),
            None => hits,
        })
    }

    async fn count(&self, query: &BookQuery) -> Result<usize, CatalogueStoreError> {
        let shelf = self.shelf()?;
        Ok(shelf.books.values().filter(|book| query.matches(book)).count())
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, CatalogueStoreError> {
        Ok(self.shelf()?.books.get(&id).cloned())
    }

    async fn insert(&self, draft: &BookDraft) -> Result<Book, CatalogueStoreError> {
        let mut shelf = self.shelf()?;
        shelf.last_id += 1;
        let book = Book::new(BookId::new(shelf.last_id), draft.clone(), true);
        shelf.books.insert(book.id(), book.clone());
        debug!(book_id = %book.id(), "catalogue insert");
        Ok(book)
    }

    async fn update_details(
        &self,
        id: BookId,
        draft: &BookDraft,
    ) -> Result<Book, CatalogueStoreError> {
        let mut shelf = self.shelf()?;
        let book = shelf
            .books
            .get_mut(&id)
            .ok_or_else(|| CatalogueStoreError::not_found(id.get()))?;
        *book = book.with_details(draft);
        Ok(book.clone())
    }

    async fn delete(&self, id: BookId) -> Result<bool, CatalogueStoreError> {
        let mut shelf = self.shelf()?;
        match shelf.books.get(&id) {
            None => Ok(false),
            Some(book) if !book.is_available() => {
                Err(CatalogueStoreError::availability_conflict(id.get(), false))
            }
            Some(_) => Ok(shelf.books.remove(&id).is_some()),
        }
    }

    async fn compare_and_set_availability(
        &self,
        id: BookId,
        expected: bool,
        desired: bool,
    ) -> Result<(), CatalogueStoreError> {
        let mut shelf = self.shelf()?;
        let book = shelf
            .books
            .get_mut(&id)
            .ok_or_else(|| CatalogueStoreError::not_found(id.get()))?;
        let actual = book.is_available();
        if actual != expected {
            return Err(CatalogueStoreError::availability_conflict(id.get(), actual));
        }
        *book = book.with_availability(desired);
        Ok(())
    }
}
