//! Tests for catalogue curation.

use std::sync::Arc;

use mockall::predicate::eq;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{LoanStoreError, MockCatalogueStore, MockLoanStore};
use crate::domain::{
    ErrorCode, Loan, LoanId, LoanPeriod, NewLoan, SortDirection, SortKey, UserId,
};
use crate::test_support::fixture_timestamp;

#[fixture]
fn admin() -> CurrentUser {
    CurrentUser::try_from_strings("a1", "admin").expect("valid admin")
}

#[fixture]
fn draft() -> BookDraft {
    BookDraft::try_from_strings("Kokoro", "Natsume Soseki").expect("valid draft")
}

fn book(id: u64, available: bool) -> Book {
    Book::new(
        BookId::new(id),
        BookDraft::try_from_strings(format!("Book {id}"), "Author").expect("valid draft"),
        available,
    )
}

fn service(catalogue: MockCatalogueStore, loans: MockLoanStore) -> CatalogueService {
    CatalogueService::new(
        Arc::new(catalogue),
        Arc::new(loans),
        CatalogueConfig::default(),
    )
}

#[rstest]
#[tokio::test]
async fn patrons_cannot_curate(draft: BookDraft) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue.expect_insert().times(0);
    let patron = CurrentUser::try_from_strings("u1", "user").expect("valid patron");

    let err = service(catalogue, MockLoanStore::new())
        .create_book(&patron, &draft)
        .await
        .expect_err("patron is not admin");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn create_inserts_available_book(admin: CurrentUser, draft: BookDraft) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue
        .expect_insert()
        .withf(|draft| draft.title().as_ref() == "Kokoro")
        .times(1)
        .returning(|draft| Ok(Book::new(BookId::new(3), draft.clone(), true)));

    let book = service(catalogue, MockLoanStore::new())
        .create_book(&admin, &draft)
        .await
        .expect("create succeeds");

    assert_eq!(book.id(), BookId::new(3));
    assert!(book.is_available());
}

#[rstest]
#[tokio::test]
async fn update_of_missing_book_is_not_found(admin: CurrentUser, draft: BookDraft) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue
        .expect_update_details()
        .with(eq(BookId::new(9)), eq(draft.clone()))
        .return_once(|_, _| Err(CatalogueStoreError::not_found(9_u64)));
    catalogue.expect_compare_and_set_availability().times(0);

    let err = service(catalogue, MockLoanStore::new())
        .update_book(&admin, BookId::new(9), &draft)
        .await
        .expect_err("book missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn update_keeps_availability(admin: CurrentUser, draft: BookDraft) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue
        .expect_update_details()
        .return_once(|id, draft| Ok(book(id.get(), false).with_details(draft)));
    catalogue.expect_compare_and_set_availability().times(0);

    let updated = service(catalogue, MockLoanStore::new())
        .update_book(&admin, BookId::new(1), &draft)
        .await
        .expect("update succeeds");

    assert_eq!(updated.title().as_ref(), "Kokoro");
    assert!(!updated.is_available());
}

#[rstest]
#[tokio::test]
async fn delete_refuses_books_on_loan(admin: CurrentUser) {
    let mut loans = MockLoanStore::new();
    loans
        .expect_find()
        .withf(|query| query.book_id == Some(BookId::new(1)) && query.active_only)
        .return_once(|_| {
            Ok(vec![Loan::new(
                LoanId::new(1),
                NewLoan::open(
                    UserId::new("u1").expect("valid user"),
                    BookId::new(1),
                    book(1, false).title().clone(),
                    fixture_timestamp(),
                    LoanPeriod::default(),
                ),
            )])
        });
    let mut catalogue = MockCatalogueStore::new();
    catalogue.expect_delete().times(0);

    let err = service(catalogue, loans)
        .delete_book(&admin, BookId::new(1))
        .await
        .expect_err("book on loan");

    assert_eq!(err.code(), ErrorCode::BookUnavailable);
}

#[rstest]
#[tokio::test]
async fn delete_maps_store_side_conflict_to_unavailable(admin: CurrentUser) {
    let mut loans = MockLoanStore::new();
    loans.expect_find().return_once(|_| Ok(Vec::new()));
    let mut catalogue = MockCatalogueStore::new();
    catalogue
        .expect_delete()
        .return_once(|_| Err(CatalogueStoreError::availability_conflict(1_u64, false)));

    let err = service(catalogue, loans)
        .delete_book(&admin, BookId::new(1))
        .await
        .expect_err("claimed concurrently");

    assert_eq!(err.code(), ErrorCode::BookUnavailable);
}

#[rstest]
#[case(Ok(true), None)]
#[case(Ok(false), Some(ErrorCode::NotFound))]
#[case(Err(CatalogueStoreError::query("locked")), Some(ErrorCode::StoreFailure))]
#[tokio::test]
async fn delete_outcomes(
    admin: CurrentUser,
    #[case] result: Result<bool, CatalogueStoreError>,
    #[case] expected: Option<ErrorCode>,
) {
    let mut loans = MockLoanStore::new();
    loans.expect_find().return_once(|_| Ok(Vec::new()));
    let mut catalogue = MockCatalogueStore::new();
    catalogue.expect_delete().times(1).return_once(move |_| result);

    let outcome = service(catalogue, loans)
        .delete_book(&admin, BookId::new(1))
        .await;

    assert_eq!(outcome.err().map(|err| err.code()), expected);
}

#[rstest]
#[tokio::test]
async fn delete_surfaces_ledger_failures(admin: CurrentUser) {
    let mut loans = MockLoanStore::new();
    loans
        .expect_find()
        .return_once(|_| Err(LoanStoreError::connection("refused")));
    let mut catalogue = MockCatalogueStore::new();
    catalogue.expect_delete().times(0);

    let err = service(catalogue, loans)
        .delete_book(&admin, BookId::new(1))
        .await
        .expect_err("ledger down");

    assert_eq!(err.code(), ErrorCode::StoreFailure);
}

#[rstest]
#[tokio::test]
async fn listing_pages_filters_and_sorts(admin: CurrentUser) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue
        .expect_count()
        .withf(|query| query.range.is_none() && query.title_contains.as_deref() == Some("book"))
        .times(1)
        .return_once(|_| Ok(12));
    catalogue
        .expect_find()
        .withf(|query| {
            query.range == Some(QueryRange::new(5, 5))
                && query.sort == BookSort::new(SortKey::Author, SortDirection::Descending)
                && query.available.is_none()
        })
        .times(1)
        .return_once(|_| Ok((6..=10).map(|id| book(id, true)).collect()));
    let listing = CatalogueListing {
        title_filter: Some("BOOK".to_owned()),
        sort: BookSort::new(SortKey::Author, SortDirection::Descending),
        page: 2,
    };

    let page = service(catalogue, MockLoanStore::new())
        .list_books(&admin, &listing)
        .await
        .expect("listing succeeds");

    assert_eq!(page.items().len(), 5);
    assert_eq!(page.page(), 2);
    assert_eq!(page.page_size(), 5);
    assert_eq!(page.total_count(), 12);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());
}

#[rstest]
#[tokio::test]
async fn page_zero_is_invalid(admin: CurrentUser) {
    let mut catalogue = MockCatalogueStore::new();
    catalogue.expect_count().times(0);
    let listing = CatalogueListing {
        page: 0,
        ..CatalogueListing::default()
    };

    let err = service(catalogue, MockLoanStore::new())
        .list_books(&admin, &listing)
        .await
        .expect_err("pages are 1-based");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
