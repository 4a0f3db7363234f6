//! Page request and page envelope primitives for offset-paginated listings.
//!
//! Listings are addressed by a 1-based page number and a fixed page size.
//! [`PageRequest`] validates both and derives the store offset;
//! [`Page`] wraps one slice of results together with the total match count so
//! callers can render page controls without a second query.

use serde::Serialize;
use thiserror::Error;

/// Largest page size accepted by [`PageRequest::new`].
pub const MAX_PAGE_SIZE: usize = 100;

/// Errors raised while constructing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Page numbers start at one.
    #[error("page number must be at least 1")]
    ZeroPage,
    /// Page size must be positive.
    #[error("page size must be at least 1")]
    ZeroPageSize,
    /// Page size exceeds [`MAX_PAGE_SIZE`].
    #[error("page size must be at most {max}, got {requested}")]
    PageSizeTooLarge {
        /// Requested page size.
        requested: usize,
        /// Maximum permitted page size.
        max: usize,
    },
    /// The derived offset does not fit in `usize`.
    #[error("page {page} with size {page_size} overflows the addressable range")]
    OffsetOverflow {
        /// Requested page number.
        page: usize,
        /// Requested page size.
        page_size: usize,
    },
}

/// Validated request for one page of a listing.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(3, 5).expect("valid page request");
/// assert_eq!(request.offset(), 10);
/// assert_eq!(request.limit(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: usize,
    page_size: usize,
    offset: usize,
}

impl PageRequest {
    /// Validate a 1-based page number and page size.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] when either value is zero, the page size
    /// exceeds [`MAX_PAGE_SIZE`], or the offset would overflow.
    pub const fn new(page: usize, page_size: usize) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(PaginationError::PageSizeTooLarge {
                requested: page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        let Some(offset) = (page - 1).checked_mul(page_size) else {
            return Err(PaginationError::OffsetOverflow { page, page_size });
        };
        Ok(Self {
            page,
            page_size,
            offset,
        })
    }

    /// Request the first page with the given size.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] when the page size is invalid.
    pub const fn first(page_size: usize) -> Result<Self, PaginationError> {
        Self::new(1, page_size)
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of items on this page.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.page_size
    }
}

/// One page of results plus the total number of matches.
///
/// ## Invariants
/// - `items.len() <= page_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    page: usize,
    page_size: usize,
    total_count: usize,
}

impl<T> Page<T> {
    /// Build a page from the request that produced it.
    ///
    /// Items beyond the requested page size are dropped.
    #[must_use]
    pub fn new(request: PageRequest, mut items: Vec<T>, total_count: usize) -> Self {
        items.truncate(request.page_size());
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total_count,
        }
    }

    /// Items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Consume the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Page size used for the request.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of matches across all pages.
    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.total_count
    }

    /// Total number of pages; zero when nothing matched.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageRequest};
    ///
    /// let request = PageRequest::first(5).expect("valid page request");
    /// let page = Page::new(request, vec!["a", "b"], 12);
    /// assert_eq!(page.total_pages(), 3);
    /// ```
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size)
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Transform each item while keeping the page metadata.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}
