//! Store-agnostic query specifications for books and loans.
//!
//! Adapters translate these objects into their own dialect; the in-memory
//! adapters evaluate them directly through [`BookQuery::matches`] and
//! [`BookSort::compare`].

use std::cmp::Ordering;

use pagination::PageRequest;
use serde::{Deserialize, Serialize};

use super::{Book, BookId, Loan, UserId};

/// Direction applied to a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Book field a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Title,
    Author,
}

/// Sort order for book queries. Ties fall back to ascending id so paging is
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl BookSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Total order over books under this sort.
    pub fn compare(&self, left: &Book, right: &Book) -> Ordering {
        self.order(self.key_of(left), left.id(), self.key_of(right), right.id())
    }

    /// Position of `book` under this sort, for resuming a read after it.
    pub fn cursor_for(&self, book: &Book) -> BookCursor {
        BookCursor::new(self.key_of(book), book.id())
    }

    /// Whether `book` sorts strictly after `cursor`.
    pub fn is_after(&self, book: &Book, cursor: &BookCursor) -> bool {
        self.order(self.key_of(book), book.id(), &cursor.key, cursor.id) == Ordering::Greater
    }

    fn key_of<'a>(&self, book: &'a Book) -> &'a str {
        match self.key {
            SortKey::Title => book.title().as_ref(),
            SortKey::Author => book.author().as_ref(),
        }
    }

    fn order(&self, left: &str, left_id: BookId, right: &str, right_id: BookId) -> Ordering {
        self.direction
            .apply(left.cmp(right))
            .then_with(|| left_id.cmp(&right_id))
    }
}

/// Sort-key value and id of the last book a keyset read returned.
///
/// Resuming strictly after this position is unaffected by rows that stop
/// matching the predicate between reads, unlike an offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCursor {
    pub key: String,
    pub id: BookId,
}

impl BookCursor {
    pub fn new(key: impl Into<String>, id: BookId) -> Self {
        Self {
            key: key.into(),
            id,
        }
    }
}

/// Offset/limit window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRange {
    pub offset: usize,
    pub limit: usize,
}

impl QueryRange {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Apply the window to an already ordered iterator.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

impl From<PageRequest> for QueryRange {
    fn from(request: PageRequest) -> Self {
        Self::new(request.offset(), request.limit())
    }
}

/// Predicate, order, and window for catalogue reads.
///
/// # Examples
/// ```
/// use lending::domain::{BookQuery, SortDirection, SortKey};
///
/// let query = BookQuery::all()
///     .available_only()
///     .with_title_contains("moon")
///     .sorted_by(SortKey::Author, SortDirection::Descending);
/// assert_eq!(query.available, Some(true));
/// assert_eq!(query.title_contains.as_deref(), Some("moon"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookQuery {
    pub available: Option<bool>,
    /// Lower-cased needle; `None` matches every title.
    pub title_contains: Option<String>,
    pub sort: BookSort,
    /// Keyset bound: only books ordered strictly after this position match.
    pub after: Option<BookCursor>,
    pub range: Option<QueryRange>,
}

impl BookQuery {
    /// Every book, title ascending.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to books whose availability flag is set.
    pub fn available_only(mut self) -> Self {
        self.available = Some(true);
        self
    }

    /// Case-insensitive title substring filter. An empty needle clears the
    /// filter; whitespace is matched literally.
    pub fn with_title_contains(mut self, needle: impl AsRef<str>) -> Self {
        let needle = needle.as_ref();
        self.title_contains = (!needle.is_empty()).then(|| needle.to_lowercase());
        self
    }

    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = BookSort::new(key, direction);
        self
    }

    /// Resume after `cursor` under the query's sort.
    pub fn starting_after(mut self, cursor: BookCursor) -> Self {
        self.after = Some(cursor);
        self
    }

    pub fn with_range(mut self, range: QueryRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Same predicate with the window removed, as used for counting.
    pub fn unranged(&self) -> Self {
        Self {
            range: None,
            ..self.clone()
        }
    }

    /// Whether `book` satisfies the predicate part of the query.
    pub fn matches(&self, book: &Book) -> bool {
        if self
            .available
            .is_some_and(|expected| book.is_available() != expected)
        {
            return false;
        }
        if self
            .after
            .as_ref()
            .is_some_and(|cursor| !self.sort.is_after(book, cursor))
        {
            return false;
        }
        match &self.title_contains {
            Some(needle) => book
                .title()
                .as_ref()
                .to_lowercase()
                .contains(needle.as_str()),
            None => true,
        }
    }
}

/// Order applied to loan reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanOrder {
    /// Most recent `borrowed_at` first.
    #[default]
    NewestFirst,
    OldestFirst,
}

impl LoanOrder {
    /// Total order over loans; ties fall back to loan id in the same direction.
    pub fn compare(self, left: &Loan, right: &Loan) -> Ordering {
        let ascending = left
            .borrowed_at()
            .cmp(&right.borrowed_at())
            .then_with(|| left.id().cmp(&right.id()));
        match self {
            Self::OldestFirst => ascending,
            Self::NewestFirst => ascending.reverse(),
        }
    }
}

/// Predicate, order, and window for loan reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanQuery {
    pub user_id: Option<UserId>,
    pub book_id: Option<BookId>,
    pub active_only: bool,
    pub order: LoanOrder,
    pub range: Option<QueryRange>,
}

impl LoanQuery {
    /// All loans of one patron, newest first.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Open loans referencing one book.
    pub fn active_for_book(book_id: BookId) -> Self {
        Self {
            book_id: Some(book_id),
            active_only: true,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: QueryRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        self.user_id.as_ref().is_none_or(|id| loan.user_id() == id)
            && self.book_id.is_none_or(|id| loan.book_id() == id)
            && (!self.active_only || loan.is_active())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{BookDraft, BookTitle, LoanId, LoanPeriod, NewLoan};
    use chrono::{Duration, TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn book(id: u64, title: &str, author: &str, available: bool) -> Book {
        Book::new(
            BookId::new(id),
            BookDraft::try_from_strings(title, author).expect("valid draft"),
            available,
        )
    }

    #[fixture]
    fn shelf() -> Vec<Book> {
        vec![
            book(1, "Moon", "Zed", true),
            book(2, "Honeymoon", "Amy", false),
            book(3, "Kokoro", "Natsume", true),
            book(4, "Moon", "Bea", true),
        ]
    }

    fn run(query: &BookQuery, shelf: &[Book]) -> Vec<u64> {
        let mut hits: Vec<Book> = shelf.iter().filter(|b| query.matches(b)).cloned().collect();
        hits.sort_by(|a, b| query.sort.compare(a, b));
        let hits = match query.range {
            Some(range) => range.slice(hits),
            None => hits,
        };
        hits.iter().map(|b| b.id().get()).collect()
    }

    #[rstest]
    fn title_filter_is_case_insensitive(shelf: Vec<Book>) {
        let query = BookQuery::all().with_title_contains("MOON");
        assert_eq!(run(&query, &shelf), vec![2, 1, 4]);
    }

    #[rstest]
    fn available_only_skips_loaned_books(shelf: Vec<Book>) {
        let query = BookQuery::all().available_only().with_title_contains("moon");
        assert_eq!(run(&query, &shelf), vec![1, 4]);
    }

    #[rstest]
    #[case(SortKey::Title, SortDirection::Ascending, vec![2, 3, 1, 4])]
    #[case(SortKey::Title, SortDirection::Descending, vec![1, 4, 3, 2])]
    #[case(SortKey::Author, SortDirection::Ascending, vec![2, 4, 3, 1])]
    #[case(SortKey::Author, SortDirection::Descending, vec![1, 3, 4, 2])]
    fn sorting_breaks_ties_by_id(
        shelf: Vec<Book>,
        #[case] key: SortKey,
        #[case] direction: SortDirection,
        #[case] expected: Vec<u64>,
    ) {
        let query = BookQuery::all().sorted_by(key, direction);
        assert_eq!(run(&query, &shelf), expected);
    }

    #[rstest]
    fn empty_filter_matches_everything(shelf: Vec<Book>) {
        let query = BookQuery::all().with_title_contains("");
        assert!(query.title_contains.is_none());
        assert_eq!(run(&query, &shelf).len(), shelf.len());
    }

    #[rstest]
    fn whitespace_filter_is_matched_literally(shelf: Vec<Book>) {
        let query = BookQuery::all().with_title_contains(" ");
        assert_eq!(query.title_contains.as_deref(), Some(" "));
        assert!(run(&query, &shelf).is_empty());

        let spaced = book(5, "Night on the Galactic Railroad", "Miyazawa", true);
        let mut shelf = shelf;
        shelf.push(spaced);
        assert_eq!(run(&query, &shelf), vec![5]);
    }

    #[rstest]
    #[case(SortKey::Title, SortDirection::Ascending, 3, vec![1, 4])]
    #[case(SortKey::Title, SortDirection::Ascending, 1, vec![4])]
    #[case(SortKey::Title, SortDirection::Descending, 4, vec![3, 2])]
    #[case(SortKey::Author, SortDirection::Ascending, 4, vec![3, 1])]
    fn keyset_bound_resumes_after_the_cursor(
        shelf: Vec<Book>,
        #[case] key: SortKey,
        #[case] direction: SortDirection,
        #[case] last_seen: u64,
        #[case] expected: Vec<u64>,
    ) {
        let sort = BookSort::new(key, direction);
        let last = shelf
            .iter()
            .find(|b| b.id().get() == last_seen)
            .expect("book on shelf");
        let query = BookQuery::all()
            .sorted_by(key, direction)
            .starting_after(sort.cursor_for(last));
        assert_eq!(run(&query, &shelf), expected);
    }

    #[rstest]
    fn keyset_bound_ignores_rows_that_left_the_filter(mut shelf: Vec<Book>) {
        let query = BookQuery::all().available_only();
        let kokoro = &shelf[2];
        let cursor = query.sort.cursor_for(kokoro);
        shelf[2] = book(3, "Kokoro", "Natsume", false);

        let query = query.starting_after(cursor);
        assert_eq!(run(&query, &shelf), vec![1, 4]);
    }

    #[rstest]
    fn range_windows_the_ordered_result(shelf: Vec<Book>) {
        let query = BookQuery::all().with_range(QueryRange::new(1, 2));
        assert_eq!(run(&query, &shelf), vec![3, 1]);
        assert!(query.unranged().range.is_none());
    }

    #[rstest]
    fn page_requests_convert_to_ranges() {
        let request = PageRequest::new(3, 5).expect("valid page");
        assert_eq!(QueryRange::from(request), QueryRange::new(10, 5));
    }

    #[rstest]
    fn loan_queries_filter_and_order() {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let make = |id: u64, user: &str, book: u64, offset_days: i64| {
            Loan::new(
                LoanId::new(id),
                NewLoan::open(
                    UserId::new(user).expect("valid user"),
                    BookId::new(book),
                    BookTitle::new("Moon").expect("valid title"),
                    start + Duration::days(offset_days),
                    LoanPeriod::default(),
                ),
            )
        };
        let first = make(1, "u1", 1, 0).closed_at(start + Duration::days(1));
        let second = make(2, "u1", 2, 2);
        let other = make(3, "u2", 1, 3);

        let query = LoanQuery::for_user(UserId::new("u1").expect("valid user"));
        let mut hits: Vec<&Loan> = [&first, &second, &other]
            .into_iter()
            .filter(|loan| query.matches(loan))
            .collect();
        hits.sort_by(|a, b| query.order.compare(a, b));
        let ids: Vec<u64> = hits.iter().map(|loan| loan.id().get()).collect();
        assert_eq!(ids, vec![2, 1]);

        let active = LoanQuery::active_for_book(BookId::new(1));
        assert!(!active.matches(&first));
        assert!(active.matches(&other));
    }
}
