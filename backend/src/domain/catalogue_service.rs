//! Administrative catalogue curation.
//!
//! Curation edits titles and authors only. Availability belongs to the loan
//! engine; the store's detail update has no availability parameter and deletes
//! are refused while a book is on loan.

use std::sync::Arc;

use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::access::ensure_admin;
use crate::domain::ports::{CatalogueStore, CatalogueStoreError, LoanStore};
use crate::domain::store_call::{StoreDeadline, map_catalogue_error, map_loan_error};
use crate::domain::{
    Book, BookDraft, BookId, BookQuery, BookSort, CurrentUser, DomainError, LoanQuery, QueryRange,
};

/// Default number of books per catalogue page.
pub const DEFAULT_CATALOGUE_PAGE_SIZE: usize = 5;

/// Catalogue service tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueConfig {
    pub page_size: usize,
    pub store_deadline: StoreDeadline,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_CATALOGUE_PAGE_SIZE,
            store_deadline: StoreDeadline::default(),
        }
    }
}

/// Filter, sort, and page selection for the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueListing {
    /// Case-insensitive title substring.
    #[serde(default)]
    pub title_filter: Option<String>,
    #[serde(default)]
    pub sort: BookSort,
    /// 1-based page number.
    pub page: usize,
}

impl Default for CatalogueListing {
    fn default() -> Self {
        Self {
            title_filter: None,
            sort: BookSort::default(),
            page: 1,
        }
    }
}

/// Create, edit, delete, and list catalogue books on behalf of an admin.
#[derive(Clone)]
pub struct CatalogueService {
    catalogue: Arc<dyn CatalogueStore>,
    loans: Arc<dyn LoanStore>,
    config: CatalogueConfig,
}

impl CatalogueService {
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        loans: Arc<dyn LoanStore>,
        config: CatalogueConfig,
    ) -> Self {
        Self {
            catalogue,
            loans,
            config,
        }
    }

    /// Add a book; new books start available.
    pub async fn create_book(
        &self,
        actor: &CurrentUser,
        draft: &BookDraft,
    ) -> Result<Book, DomainError> {
        ensure_admin(actor)?;
        let book = self
            .config
            .store_deadline
            .run("insert book", self.catalogue.insert(draft))
            .await?
            .map_err(map_catalogue_error)?;
        info!(book_id = %book.id(), actor = %actor.id(), "book added to catalogue");
        Ok(book)
    }

    /// Replace title and author.
    pub async fn update_book(
        &self,
        actor: &CurrentUser,
        id: BookId,
        draft: &BookDraft,
    ) -> Result<Book, DomainError> {
        ensure_admin(actor)?;
        let book = self
            .config
            .store_deadline
            .run("update book", self.catalogue.update_details(id, draft))
            .await?
            .map_err(map_catalogue_error)?;
        info!(book_id = %id, actor = %actor.id(), "book details updated");
        Ok(book)
    }

    /// Remove a book that is not on loan.
    ///
    /// # Errors
    /// `BookUnavailable` while an active loan references the book; `NotFound`
    /// when it does not exist.
    pub async fn delete_book(&self, actor: &CurrentUser, id: BookId) -> Result<(), DomainError> {
        ensure_admin(actor)?;

        let active = LoanQuery::active_for_book(id).with_range(QueryRange::new(0, 1));
        let on_loan = !self
            .config
            .store_deadline
            .run("find active loans", self.loans.find(&active))
            .await?
            .map_err(map_loan_error)?
            .is_empty();
        if on_loan {
            return Err(on_loan_error(id));
        }

        let deleted = self
            .config
            .store_deadline
            .run("delete book", self.catalogue.delete(id))
            .await?
            .map_err(|err| match err {
                CatalogueStoreError::AvailabilityConflict { .. } => on_loan_error(id),
                other => map_catalogue_error(other),
            })?;
        if !deleted {
            return Err(DomainError::not_found(format!("book {id} not found")));
        }
        info!(book_id = %id, actor = %actor.id(), "book removed from catalogue");
        Ok(())
    }

    /// One page of the catalogue, filtered and sorted.
    pub async fn list_books(
        &self,
        actor: &CurrentUser,
        listing: &CatalogueListing,
    ) -> Result<Page<Book>, DomainError> {
        ensure_admin(actor)?;
        let request = PageRequest::new(listing.page, self.config.page_size)
            .map_err(|err| DomainError::invalid_request(format!("invalid page request: {err}")))?;

        let mut query = BookQuery::all().sorted_by(listing.sort.key, listing.sort.direction);
        if let Some(needle) = listing.title_filter.as_deref() {
            query = query.with_title_contains(needle);
        }
        let total_count = self
            .config
            .store_deadline
            .run("count books", self.catalogue.count(&query))
            .await?
            .map_err(map_catalogue_error)?;
        let query = query.with_range(QueryRange::from(request));
        let items = self
            .config
            .store_deadline
            .run("list books", self.catalogue.find(&query))
            .await?
            .map_err(map_catalogue_error)?;

        Ok(Page::new(request, items, total_count))
    }
}

fn on_loan_error(id: BookId) -> DomainError {
    DomainError::book_unavailable(format!("book {id} is on loan and cannot be removed"))
}

#[cfg(test)]
#[path = "catalogue_service_tests.rs"]
mod tests;
